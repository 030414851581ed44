//! Middleware stack for the proxy.
//!
//! Layer order: Request → Tracing → Admission → Forward

pub mod admission;
pub mod metrics;
pub mod tracing;

pub use admission::{AdmissionLayer, AdmissionService};
pub use metrics::{GatewayMetrics, RequestTimer};
pub use self::tracing::{TracingLayer, REQUEST_ID_HEADER};
