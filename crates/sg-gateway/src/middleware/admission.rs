//! Size admission enforcement middleware.
//!
//! Rejects oversized content at the gate so the upstream never starts
//! streaming it. Requests without a root identifier go straight through.
//!
//! | Decision | Response                         |
//! |----------|----------------------------------|
//! | Allow    | whatever the inner service gives |
//! | Deny     | 403, empty body                  |
//! | Error    | 500, empty body                  |

use crate::middleware::metrics::{GatewayMetrics, RequestTimer};
use crate::router::extract_cid;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use sg_admission::{AdmissionGate, Decision};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::{info, warn, Span};

/// Admission enforcement layer
#[derive(Clone)]
pub struct AdmissionLayer {
    gate: Arc<AdmissionGate>,
    metrics: Arc<GatewayMetrics>,
}

impl AdmissionLayer {
    pub fn new(gate: Arc<AdmissionGate>, metrics: Arc<GatewayMetrics>) -> Self {
        Self { gate, metrics }
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = AdmissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdmissionService {
            inner,
            gate: Arc::clone(&self.gate),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Admission enforcement service
#[derive(Clone)]
pub struct AdmissionService<S> {
    inner: S,
    gate: Arc<AdmissionGate>,
    metrics: Arc<GatewayMetrics>,
}

impl<S> Service<Request<Body>> for AdmissionService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let gate = Arc::clone(&self.gate);
        let metrics = Arc::clone(&self.metrics);
        // Take the service that was driven to readiness, leave a fresh clone
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let timer = RequestTimer::new(Arc::clone(&metrics));

            let Some(cid) = extract_cid(req.uri().path()) else {
                metrics.record_passthrough();
                let result = inner.call(req).await;
                timer.finish();
                return result;
            };

            Span::current().record("cid", cid.as_str());
            let decision = gate.decide(&cid).await;
            metrics.record_decision(&decision);

            let result = match &decision {
                Decision::Allow(_) => {
                    info!(cid = %cid, path = %req.uri().path(), %decision, "Admitted");
                    inner.call(req).await
                }
                Decision::Deny(_) => {
                    info!(cid = %cid, %decision, "Total size exceeded, rejecting");
                    Ok(empty_response(StatusCode::FORBIDDEN))
                }
                Decision::Error(e) => {
                    warn!(cid = %cid, error = %e, "Admission failed");
                    Ok(empty_response(StatusCode::INTERNAL_SERVER_ERROR))
                }
            };

            timer.finish();
            result
        })
    }
}

/// Status-only response with an empty body.
pub(crate) fn empty_response(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
