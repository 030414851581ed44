//! Adapters to the outside world: the Kubo RPC API and the upstream backend.

pub mod forwarder;
pub mod kubo;

pub use forwarder::UpstreamForwarder;
pub use kubo::KuboGraphSource;
