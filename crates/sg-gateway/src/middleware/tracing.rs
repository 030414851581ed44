//! Tracing middleware: one span per proxied request.
//!
//! Every log line emitted while a request is being admitted or forwarded
//! carries its request id, method, path and, for content requests, the root
//! identifier.

use crate::router::extract_cid;
use axum::{body::Body, http::Request, response::Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{field, info_span, Instrument, Span};
use uuid::Uuid;

/// Header carrying the request id back to the client
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tracing layer that creates spans for each request
#[derive(Clone, Default)]
pub struct TracingLayer;

impl TracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

/// Tracing service
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for TracingService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let request_id = request_id(&req);
        let span = info_span!(
            "gateway_request",
            request_id = %request_id,
            http.method = %req.method(),
            http.target = %req.uri().path(),
            cid = field::Empty,
            http.status_code = field::Empty,
        );
        if let Some(cid) = extract_cid(req.uri().path()) {
            span.record("cid", cid.as_str());
        }

        Box::pin(
            async move {
                let mut result = inner.call(req).await;

                if let Ok(response) = &mut result {
                    Span::current().record("http.status_code", response.status().as_u16());
                    if let Ok(value) = request_id.parse() {
                        response.headers_mut().insert(REQUEST_ID_HEADER, value);
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

/// Reuse the caller's request id when it sent one, otherwise mint a v7 UUID.
fn request_id<B>(req: &Request<B>) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::now_v7().to_string())
}
