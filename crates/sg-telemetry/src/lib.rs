//! # Size Gate Telemetry
//!
//! Installs the process-wide `tracing` subscriber.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sg_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).await?;
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SG_LOG_LEVEL` / `RUST_LOG` | `info` | Filter directives |
//! | `SG_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | unset | Collector for span export (`otlp` feature) |
//! | `OTEL_SERVICE_NAME` | `size-gate` | Service name in traces |

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod config;
mod tracing_setup;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize OpenTelemetry tracer: {0}")]
    TracerInit(String),

    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and, when configured, span export.
///
/// Returns a guard that must be held for the lifetime of the application.
/// Dropping it flushes pending spans.
pub async fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let tracing_guard = tracing_setup::init_tracing(&config).await?;

    tracing::debug!(
        service = %config.service_name,
        json = config.json_logs,
        filter = %config.log_level,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard {
        tracing_guard,
    })
}

/// Guard that keeps telemetry active. Drop to flush and shutdown.
pub struct TelemetryGuard {
    tracing_guard: TracingGuard,
}

impl TelemetryGuard {
    pub fn exporting(&self) -> bool {
        self.tracing_guard.exporting()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
