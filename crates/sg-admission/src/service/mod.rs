//! Application services: graph traversal and the admission decision flow.

pub mod gate;
pub(crate) mod inflight;
pub mod resolver;

pub use gate::{AdmissionGate, GateConfig, GateStats, GateStatsSnapshot};
pub use resolver::{FailurePolicy, GraphSizeResolver, TraversalResult};
