//! Domain types for admission control.
//!
//! Pure data structures and policies; no I/O happens here.

pub mod allow_set;
pub mod cache;
pub mod cid;
pub mod decision;
pub mod errors;

pub use allow_set::PermanentAllowSet;
pub use cache::{CacheStats, DecisionCache};
pub use cid::{BlockRef, Cid};
pub use decision::{AllowReason, Decision, DenyReason, Quota};
pub use errors::{AdmissionError, ResolveError, SourceError};
