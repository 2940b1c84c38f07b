//! Roomrelay: room-based WebRTC signaling relay
//!
//! Clients connect over WebSocket with a room id and a client id, get told
//! about the other members of their room, and exchange offers, answers and
//! ICE candidates through the server without it looking inside them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod state;
pub mod transport;

use axum::{routing::get, Router};
use state::AppState;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub use config::Config;
pub use error::{SignalingError, TransportError};
pub use protocol::{Message, MessageKind};
pub use state::{Client, Registry};

/// Build the HTTP router: signaling socket, health check and static files
pub fn app(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();

    // Any origin may connect
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(handlers::ws_handler))
        .route("/health", get(handlers::health_handler))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir.join("static")))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
