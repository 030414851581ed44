//! Size Gate - HTTP admission proxy in front of an IPFS gateway.
//!
//! Requests for `/ipfs/<cid>/...` are forwarded only when the total size of
//! the DAG under `<cid>` fits the configured quota. Everything else is
//! forwarded untouched.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        SIZE GATE                              │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐                          ┌─────────────┐     │
//! │  │    Proxy    │                          │    Admin    │     │
//! │  │  Port 8080  │                          │  Port 9090  │     │
//! │  └──────┬──────┘                          └─────────────┘     │
//! │         │                                                     │
//! │  ┌──────┴─────────────────────────────────┐                   │
//! │  │  Middleware: Tracing → Admission       │──► 403 / 500      │
//! │  └──────┬─────────────────────────────────┘                   │
//! │         │ allowed or no cid                                   │
//! │  ┌──────┴─────────────────────────────────┐                   │
//! │  │  UpstreamForwarder                     │──► 502            │
//! │  └──────┬─────────────────────────────────┘                   │
//! └─────────┼─────────────────────────────────────────────────────┘
//!           ▼                         ▲
//!     Upstream gateway          Kubo RPC API (ls, block/stat, pin/ls)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use sg_gateway::{GatewayConfig, SizeGateService};
//!
//! let config = GatewayConfig::from_env()?;
//! let mut service = SizeGateService::connect(config).await?;
//! service.start().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod middleware;
pub mod router;
pub mod service;

// Re-exports for public API
pub use adapters::{KuboGraphSource, UpstreamForwarder};
pub use domain::config::GatewayConfig;
pub use domain::error::GatewayError;
pub use domain::ConfigError;
pub use middleware::GatewayMetrics;
pub use router::{build_proxy_router, extract_cid};
pub use service::SizeGateService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
