//! # Size-Gated Admission
//!
//! Decides whether a request for content-addressed data may be served, based
//! on the cumulative byte size of everything reachable from the requested
//! root.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       AdmissionGate                          │
//! │                                                              │
//! │   1. PermanentAllowSet ── member? ──────────────► Allow      │
//! │   2. DecisionCache ────── cached? ──────────────► Allow/Deny │
//! │   3. InFlight ─────────── already walking? ─────► wait       │
//! │   4. GraphSizeResolver ── walk + sum ──► quota ─► Allow/Deny │
//! │                              │                               │
//! │                              ▼                               │
//! │                    GraphSource (port)                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `domain/` - identifiers, decision cache, allow set, decisions, errors
//! - `ports/` - the graph data source the host must provide
//! - `service/` - the resolver, the gate and single-flight coalescing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sg_admission::{AdmissionGate, DecisionCache, GateConfig, PermanentAllowSet, Quota};
//!
//! let pinned = PermanentAllowSet::load(source.as_ref()).await?;
//! let cache = DecisionCache::new(10_000);
//! let gate = AdmissionGate::new(source, pinned, cache, GateConfig::new(Quota::from_megabytes(100)?));
//!
//! if gate.decide(&cid).await.is_allowed() {
//!     // forward the request
//! }
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use domain::allow_set::PermanentAllowSet;
pub use domain::cache::{CacheStats, DecisionCache};
pub use domain::cid::{BlockRef, Cid};
pub use domain::decision::{AllowReason, Decision, DenyReason, Quota};
pub use domain::errors::{AdmissionError, ResolveError, SourceError};
pub use ports::outbound::GraphSource;
pub use service::gate::{AdmissionGate, GateConfig, GateStats, GateStatsSnapshot};
pub use service::resolver::{FailurePolicy, GraphSizeResolver, TraversalResult};

/// Bytes per configured megabyte of quota.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Default number of decisions remembered by the cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;
