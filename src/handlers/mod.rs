//! Handler modules

pub mod connection;
pub mod health;
pub mod room;
pub mod signaling;

pub use connection::*;
pub use health::*;
