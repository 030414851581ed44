//! # Domain Errors
//!
//! Error types for admission control.
//!
//! Exceeding the quota is not an error: it is a `Deny` decision and gets
//! cached. Only failures to *reach* a decision live here, and none of them
//! are cached.
//!
//! All errors are `Clone` so a single traversal outcome can be handed to every
//! request waiting on it.

use std::time::Duration;
use thiserror::Error;

use super::cid::Cid;

/// Failure reported by the external graph data source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The source could not be reached or answered with a failure status.
    #[error("graph source unavailable: {0}")]
    Unavailable(String),

    /// The source answered but the payload could not be decoded.
    #[error("malformed graph source response: {0}")]
    Malformed(String),

    /// The source does not know the identifier.
    #[error("block not found: {0}")]
    NotFound(Cid),
}

/// Failure of a graph size traversal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// A lookup for `cid` failed; the partial traversal was discarded.
    #[error("lookup for {cid} failed: {source}")]
    Source {
        cid: Cid,
        #[source]
        source: SourceError,
    },

    /// The traversal did not finish before its deadline.
    #[error("traversal exceeded {}ms deadline", .0.as_millis())]
    Timeout(Duration),
}

/// Failure to reach an admission decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// The request did not carry a usable identifier.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The graph size could not be computed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
