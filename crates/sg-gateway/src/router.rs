//! Request routing: which paths are content requests, and the proxy router.
//!
//! Every path is forwarded. Only `/ipfs/<cid>` and `/ipfs/<cid>/...` carry a
//! root identifier and go through the admission gate first; everything else
//! passes straight to the upstream.

use axum::{body::Body, extract::State, http::Request, response::Response, Router};
use sg_admission::{AdmissionGate, Cid};
use std::sync::Arc;
use tower::ServiceBuilder;

use crate::adapters::forwarder::UpstreamForwarder;
use crate::middleware::{AdmissionLayer, GatewayMetrics, TracingLayer};

const CONTENT_PREFIX: &str = "/ipfs/";

/// Root identifier of a content request, if `path` is one.
///
/// The identifier is the first segment after `/ipfs/`. `/ipfs`, `/ipfs/`
/// and every other path yield `None`.
pub fn extract_cid(path: &str) -> Option<Cid> {
    let rest = path.strip_prefix(CONTENT_PREFIX)?;
    let id = rest.split('/').next().unwrap_or_default();
    Cid::parse(id).ok()
}

/// State shared by the forwarding handler
#[derive(Clone)]
pub struct ProxyState {
    pub forwarder: Arc<UpstreamForwarder>,
    pub metrics: Arc<GatewayMetrics>,
}

/// Build the public proxy router.
///
/// Layer order: Request → Tracing → Admission → Forward
pub fn build_proxy_router(
    gate: Arc<AdmissionGate>,
    forwarder: Arc<UpstreamForwarder>,
    metrics: Arc<GatewayMetrics>,
) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TracingLayer::new())
        .layer(AdmissionLayer::new(gate, Arc::clone(&metrics)));

    Router::new()
        .fallback(forward_request)
        .layer(middleware)
        .with_state(ProxyState { forwarder, metrics })
}

async fn forward_request(State(state): State<ProxyState>, req: Request<Body>) -> Response {
    state.forwarder.forward(req, &state.metrics).await
}
