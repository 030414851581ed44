//! Gateway domain: configuration and errors.

pub mod config;
pub mod error;

pub use config::{AdminConfig, AdmissionConfig, ConfigError, GatewayConfig, IpfsConfig};
pub use error::GatewayError;
