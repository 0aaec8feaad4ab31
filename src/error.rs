//! Error types for the LTI/bus bridge

use thiserror::Error;

/// Errors that can occur in the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration file missing, unreadable, or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Subscription persistence I/O failure
    #[error("Subscription store error: {0}")]
    Persistence(String),

    /// Bus adapter failure (publish/subscribe/unsubscribe)
    #[error("Bus error: {0}")]
    Bus(String),

    /// TLS material missing or invalid
    #[error("TLS error: {0}")]
    Tls(String),

    /// Port bind failure
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
