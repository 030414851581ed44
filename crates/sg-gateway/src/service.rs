//! Size gate service: wires the admission gate to the proxy and admin servers.
//!
//! ## Startup
//!
//! 1. Validate configuration
//! 2. Read the pinned listing once (failure is fatal)
//! 3. Build the decision cache and admission gate
//! 4. Bind the proxy listener, and the admin listener when enabled
//!
//! Both servers run on background tasks until [`SizeGateService::shutdown`].

use crate::adapters::{KuboGraphSource, UpstreamForwarder};
use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::middleware::GatewayMetrics;
use crate::router::build_proxy_router;
use axum::{routing::get, Json, Router};
use sg_admission::{AdmissionGate, DecisionCache, GraphSource, PermanentAllowSet};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

type ServerHandle = JoinHandle<std::io::Result<()>>;

/// Size gate service state
pub struct SizeGateService {
    config: GatewayConfig,
    gate: Arc<AdmissionGate>,
    forwarder: Arc<UpstreamForwarder>,
    metrics: Arc<GatewayMetrics>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    proxy_handle: Option<ServerHandle>,
    admin_handle: Option<ServerHandle>,
    local_addr: Option<SocketAddr>,
    admin_addr: Option<SocketAddr>,
}

impl SizeGateService {
    /// Connect to the Kubo RPC API named in `config` and build the service.
    pub async fn connect(config: GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        let source = KuboGraphSource::new(&config.ipfs.api_url, config.ipfs.request_timeout)?;
        info!(api = %source.base_url(), "Using Kubo RPC API");
        Self::new(config, Arc::new(source)).await
    }

    /// Build the service on top of any graph source.
    pub async fn new(
        config: GatewayConfig,
        source: Arc<dyn GraphSource>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        let gate_config = config.gate_config()?;

        let pinned = PermanentAllowSet::load(source.as_ref())
            .await
            .map_err(GatewayError::PinnedListing)?;

        let cache = DecisionCache::new(config.admission.cache_capacity);
        let gate = Arc::new(AdmissionGate::new(source, pinned, cache, gate_config));

        let forwarder = Arc::new(UpstreamForwarder::new(
            &config.upstream.url,
            config.upstream.connect_timeout,
        )?);

        Ok(Self {
            config,
            gate,
            forwarder,
            metrics: Arc::new(GatewayMetrics::new()),
            shutdown_tx: None,
            proxy_handle: None,
            admin_handle: None,
            local_addr: None,
            admin_addr: None,
        })
    }

    /// Bind the listeners and start serving. Returns the proxy address.
    pub async fn start(&mut self) -> Result<SocketAddr, GatewayError> {
        info!("Starting size gate...");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        // Start Admin server
        if self.config.admin.enabled {
            let listener = bind(self.config.admin_addr()).await?;
            let addr = local_addr(&listener)?;
            info!(addr = %addr, "Starting Admin server");
            let router = self.build_admin_router();
            self.admin_addr = Some(addr);
            self.admin_handle = Some(tokio::spawn(async move {
                axum::serve(listener, router).await
            }));
        }

        // Start proxy server
        let listener = bind(self.config.listen_addr()).await?;
        let addr = local_addr(&listener)?;
        info!(
            addr = %addr,
            upstream = %self.forwarder.upstream(),
            quota_bytes = self.gate.config().quota.bytes(),
            "Proxy server listening"
        );
        let router = self.build_proxy_router();
        self.local_addr = Some(addr);
        self.proxy_handle = Some(tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        }));

        info!("Size gate started successfully");
        Ok(addr)
    }

    /// Trigger graceful shutdown and wait for in-flight requests to finish
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.proxy_handle.take() {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Proxy server error"),
                Err(e) => error!(error = %e, "Proxy server task failed"),
            }
        }

        if let Some(handle) = self.admin_handle.take() {
            handle.abort();
        }

        info!("Size gate stopped");
    }

    /// Proxy address once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Admin address once started, if enabled
    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin_addr
    }

    /// Get metrics
    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Get the admission gate
    pub fn gate(&self) -> Arc<AdmissionGate> {
        Arc::clone(&self.gate)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the public proxy router
    pub fn build_proxy_router(&self) -> Router {
        build_proxy_router(
            Arc::clone(&self.gate),
            Arc::clone(&self.forwarder),
            Arc::clone(&self.metrics),
        )
    }

    /// Build Admin router
    pub fn build_admin_router(&self) -> Router {
        let metrics = Arc::clone(&self.metrics);
        let gate_for_metrics = Arc::clone(&self.gate);
        let gate_for_cache = Arc::clone(&self.gate);

        Router::new()
            .route("/health", get(health_check))
            .route(
                "/metrics",
                get(move || {
                    let metrics = Arc::clone(&metrics);
                    let gate = Arc::clone(&gate_for_metrics);
                    async move {
                        let mut json = metrics.to_json();
                        json["gate"] = serde_json::json!(gate.stats().snapshot());
                        json["gate"]["in_flight"] = serde_json::json!(gate.in_flight());
                        Json(json)
                    }
                }),
            )
            .route(
                "/cache",
                get(move || {
                    let gate = Arc::clone(&gate_for_cache);
                    async move {
                        Json(serde_json::json!({
                            "cache": gate.cache().stats(),
                            "pinned": gate.pinned().len(),
                        }))
                    }
                }),
            )
            .layer(TraceLayer::new_for_http())
    }
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, GatewayError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| GatewayError::Bind {
            addr,
            reason: e.to_string(),
        })
}

fn local_addr(listener: &TcpListener) -> Result<SocketAddr, GatewayError> {
    listener
        .local_addr()
        .map_err(|e| GatewayError::Internal(e.to_string()))
}
