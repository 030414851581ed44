//! Telemetry configuration from environment variables.

use std::env;

/// Default service name reported in traces.
pub const DEFAULT_SERVICE_NAME: &str = "size-gate";

/// Configuration for logging and trace export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name for traces and logs
    pub service_name: String,

    /// Filter directives (`info`, `sg_gateway=debug,info`, ...)
    pub log_level: String,

    /// Emit one JSON object per line instead of human-readable output
    pub json_logs: bool,

    /// OTLP collector endpoint; span export is off when unset
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            otlp_endpoint: None,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: size-gate)
    /// - `SG_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `SG_JSON_LOGS`: JSON logs (default: true inside containers)
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT`: Collector endpoint (default: unset)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("OTEL_SERVICE_NAME")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),

            log_level: lookup("SG_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "info".to_string()),

            json_logs: lookup("SG_JSON_LOGS")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(is_container),

            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.is_empty()),
        }
    }
}
