use std::net::SocketAddr;
use std::time::Duration;

use crate::application::DEFAULT_OPERATION_TIMEOUT;

pub const DEFAULT_DATABASE: &str = "tellerbook.db";
/// The dashboard UI talks to port 5000 by default.
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Everything the HTTP server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database: String,
    pub bind: SocketAddr,
    pub operation_timeout: Duration,
}

impl ServerConfig {
    pub fn new(database: impl Into<String>, bind: SocketAddr) -> Self {
        Self {
            database: database.into(),
            bind,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let bind: SocketAddr = DEFAULT_BIND.parse().unwrap();
        let config = ServerConfig::new(DEFAULT_DATABASE, bind);

        assert_eq!(config.bind.port(), 5000);
        assert_eq!(config.database, "tellerbook.db");
        assert_eq!(config.operation_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_timeout_override() {
        let config = ServerConfig::new("x.db", DEFAULT_BIND.parse().unwrap())
            .with_operation_timeout(Duration::from_millis(250));
        assert_eq!(config.operation_timeout, Duration::from_millis(250));
    }
}
