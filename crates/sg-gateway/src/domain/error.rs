//! Gateway error types.

use sg_admission::SourceError;

use super::config::ConfigError;

/// Errors raised while bringing the gateway up or serving.
///
/// Per-request failures never surface here: they become status codes
/// (403, 500, 502) with empty bodies.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server socket bind error
    #[error("server bind error on {addr}: {reason}")]
    Bind { addr: std::net::SocketAddr, reason: String },

    /// The pinned listing could not be read at startup
    #[error("failed to load pinned set: {0}")]
    PinnedListing(#[source] SourceError),

    /// An HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}
