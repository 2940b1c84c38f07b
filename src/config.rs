//! Environment-based configuration

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    /// Directory holding `index.html` and the `static/` tree
    pub static_dir: PathBuf,
    pub log_level: String,
    /// Messages queued per client before further ones are dropped
    pub outbound_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            static_dir: PathBuf::from("."),
            log_level: "info".to_string(),
            outbound_capacity: crate::state::DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from the environment (and `.env`, if present)
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            port: env_or("PORT", defaults.port),
            host: env::var("HOST").unwrap_or(defaults.host),
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            outbound_capacity: env_or("OUTBOUND_QUEUE_SIZE", defaults.outbound_capacity),
        }
    }

    /// `host:port` for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse `key` from the environment, falling back on absence or parse failure
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
