//! Subscriber setup: env filter, console output, optional OTLP span export.

use tracing::Subscriber;
use tracing_subscriber::{
    layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::{TelemetryConfig, TelemetryError};

/// Guard that flushes exported spans on drop.
pub struct TracingGuard {
    #[cfg(feature = "otlp")]
    provider: Option<opentelemetry_sdk::trace::TracerProvider>,
}

impl TracingGuard {
    /// Whether spans are being exported to a collector.
    pub fn exporting(&self) -> bool {
        #[cfg(feature = "otlp")]
        {
            self.provider.is_some()
        }
        #[cfg(not(feature = "otlp"))]
        {
            false
        }
    }
}

#[cfg(feature = "otlp")]
impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down tracer provider: {:?}", e);
            }
        }
    }
}

/// Filter built from the configured directives.
pub(crate) fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log filter '{}': {e}", config.log_level)))
}

/// Console layer: JSON lines for containers, pretty output for development.
pub(crate) fn console_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    }
}

/// Install the global subscriber.
#[cfg(feature = "otlp")]
pub async fn init_tracing(config: &TelemetryConfig) -> Result<TracingGuard, TelemetryError> {
    use opentelemetry::trace::TracerProvider as _;

    let filter = env_filter(config)?;

    let provider = match &config.otlp_endpoint {
        Some(endpoint) => Some(otlp::provider(config, endpoint)?),
        None => None,
    };
    let otel_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(config.service_name.clone()))
    });

    tracing_subscriber::registry()
        .with(console_layer(config.json_logs))
        .with(otel_layer)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))?;

    if let Some(endpoint) = &config.otlp_endpoint {
        tracing::info!(
            service = %config.service_name,
            otlp_endpoint = %endpoint,
            "OpenTelemetry span export enabled"
        );
    }

    Ok(TracingGuard { provider })
}

/// Install the global subscriber.
#[cfg(not(feature = "otlp"))]
pub async fn init_tracing(config: &TelemetryConfig) -> Result<TracingGuard, TelemetryError> {
    let filter = env_filter(config)?;

    tracing_subscriber::registry()
        .with(console_layer(config.json_logs))
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))?;

    if config.otlp_endpoint.is_some() {
        tracing::warn!("OTLP endpoint configured but span export was not compiled in");
    }

    Ok(TracingGuard {})
}

#[cfg(feature = "otlp")]
mod otlp {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{
        runtime,
        trace::{self, RandomIdGenerator, Sampler, TracerProvider},
        Resource,
    };

    use crate::{TelemetryConfig, TelemetryError};

    /// Batch exporter to the collector at `endpoint`.
    pub(super) fn provider(
        config: &TelemetryConfig,
        endpoint: &str,
    ) -> Result<TracerProvider, TelemetryError> {
        let exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(endpoint);

        opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(
                trace::Config::default()
                    .with_sampler(Sampler::AlwaysOn)
                    .with_id_generator(RandomIdGenerator::default())
                    .with_resource(Resource::new(vec![
                        KeyValue::new("service.name", config.service_name.clone()),
                        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    ])),
            )
            .install_batch(runtime::Tokio)
            .map_err(|e| TelemetryError::TracerInit(e.to_string()))
    }
}
