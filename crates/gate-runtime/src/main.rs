//! # Size Gate
//!
//! Admission-control proxy for an IPFS gateway.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment (`MAX_SIZE_MB` and `BACKEND`
//!    are required)
//! 2. Install logging
//! 3. Read the pinned listing from the IPFS node
//! 4. Start the proxy and admin servers
//! 5. Serve until Ctrl+C, then drain in-flight requests

use anyhow::{Context, Result};
use tracing::info;

use sg_gateway::{GatewayConfig, SizeGateService};
use sg_telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration errors are reported before logging exists
    let config = GatewayConfig::from_env().context("invalid configuration")?;

    let _telemetry = init_telemetry(TelemetryConfig::from_env())
        .await
        .context("failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Size Gate v{}", sg_gateway::VERSION);
    info!("===========================================");
    info!(
        upstream = %config.upstream.url,
        ipfs_api = %config.ipfs.api_url,
        max_size_mb = config.admission.quota_mb,
        cache_capacity = config.admission.cache_capacity,
        "Configuration loaded"
    );

    let mut service = SizeGateService::connect(config)
        .await
        .context("failed to initialize size gate")?;
    service.start().await.context("failed to start size gate")?;

    info!("Size gate is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received");
    service.shutdown().await;

    Ok(())
}
