//! Content identifiers and the link records returned by a graph source.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::AdmissionError;

/// Opaque content address naming one block or one subgraph root.
///
/// No codec or multihash validation happens here; two identifiers are equal
/// exactly when their strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cid(String);

impl Cid {
    /// Parse an identifier taken from a request path.
    pub fn parse(s: &str) -> Result<Self, AdmissionError> {
        if s.is_empty() {
            return Err(AdmissionError::InvalidIdentifier(
                "identifier is empty".into(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Cid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Cid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A direct child of a node, as listed by the graph source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    /// Identifier of the child
    pub cid: Cid,
    /// Byte size of the child. Only meaningful for leaves.
    pub size: u64,
    /// Whether the child links to further blocks and must be expanded
    pub is_branch: bool,
}

impl BlockRef {
    /// A leaf child carrying its own byte size.
    pub fn leaf(cid: impl Into<Cid>, size: u64) -> Self {
        Self {
            cid: cid.into(),
            size,
            is_branch: false,
        }
    }

    /// A branch child; its size comes from expanding it.
    pub fn branch(cid: impl Into<Cid>) -> Self {
        Self {
            cid: cid.into(),
            size: 0,
            is_branch: true,
        }
    }
}
