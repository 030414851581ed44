//! Admission decisions and the size quota they are measured against.

use serde::Serialize;
use std::fmt;

use super::errors::AdmissionError;
use crate::BYTES_PER_MB;

/// Maximum cumulative byte size admissible for one root's graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Quota(u64);

impl Quota {
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Quota of `mb` × 1,048,576 bytes. `None` on overflow.
    pub fn from_megabytes(mb: u64) -> Option<Self> {
        mb.checked_mul(BYTES_PER_MB).map(Self)
    }

    pub const fn bytes(&self) -> u64 {
        self.0
    }

    /// Sizes equal to the quota are admitted.
    pub fn admits(&self, total_size: u64) -> bool {
        total_size <= self.0
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

/// Why a request was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowReason {
    /// Member of the permanent allow set
    Pinned,
    /// An earlier traversal admitted this identifier
    Cached,
    /// Fresh traversal came in at or under the quota
    WithinQuota { total_size: u64 },
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// An earlier traversal refused this identifier
    Cached,
    /// Fresh traversal exceeded the quota
    QuotaExceeded { total_size: u64, quota: u64 },
}

/// Outcome of one admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(AllowReason),
    Deny(DenyReason),
    Error(AdmissionError),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Decision::Deny(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Decision::Error(_))
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow(AllowReason::Pinned) => write!(f, "allow (pinned)"),
            Decision::Allow(AllowReason::Cached) => write!(f, "allow (cached)"),
            Decision::Allow(AllowReason::WithinQuota { total_size }) => {
                write!(f, "allow ({total_size} bytes)")
            }
            Decision::Deny(DenyReason::Cached) => write!(f, "deny (cached)"),
            Decision::Deny(DenyReason::QuotaExceeded { total_size, quota }) => {
                write!(f, "deny ({total_size} > {quota} bytes)")
            }
            Decision::Error(e) => write!(f, "error ({e})"),
        }
    }
}
