// src/error.rs
//! Error types for the telemetry relay

use std::fmt;
use tokio_tungstenite::tungstenite;

pub type Result<T> = std::result::Result<T, TelemetryError>;

#[derive(Debug)]
pub enum TelemetryError {
    Io(std::io::Error),
    Json(serde_json::Error),
    WebSocket(tungstenite::Error),
    /// A vehicle source could not bind one of its sockets.
    Bind {
        source: String,
        addr: String,
        error: std::io::Error,
    },
    Config(String),
}

impl TelemetryError {
    pub fn bind(source: &str, addr: impl fmt::Display, error: std::io::Error) -> Self {
        TelemetryError::Bind {
            source: source.to_string(),
            addr: addr.to_string(),
            error,
        }
    }

    /// Source label the error belongs to, if any
    pub fn source_label(&self) -> Option<&str> {
        match self {
            TelemetryError::Bind { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Io(e) => write!(f, "IO error: {}", e),
            TelemetryError::Json(e) => write!(f, "JSON error: {}", e),
            TelemetryError::WebSocket(e) => write!(f, "WebSocket error: {}", e),
            TelemetryError::Bind { source, addr, error } => {
                write!(f, "[{}] failed to bind {}: {}", source.to_uppercase(), addr, error)
            }
            TelemetryError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::Io(e) => Some(e),
            TelemetryError::Json(e) => Some(e),
            TelemetryError::WebSocket(e) => Some(e),
            TelemetryError::Bind { error, .. } => Some(error),
            TelemetryError::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(error: std::io::Error) -> Self {
        TelemetryError::Io(error)
    }
}

impl From<serde_json::Error> for TelemetryError {
    fn from(error: serde_json::Error) -> Self {
        TelemetryError::Json(error)
    }
}

impl From<tungstenite::Error> for TelemetryError {
    fn from(error: tungstenite::Error) -> Self {
        TelemetryError::WebSocket(error)
    }
}
