//! Reverse proxy to the fixed upstream.
//!
//! Method, path, query, headers and body go out unchanged apart from
//! hop-by-hop headers; the upstream's status, headers and streamed body come
//! back the same way. Redirects are relayed, never followed. A request that
//! cannot be delivered becomes a 502 with an empty body.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, Request, StatusCode},
    response::Response,
};
use reqwest::{redirect, Client, Url};
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::error::GatewayError;
use crate::middleware::admission::empty_response;
use crate::middleware::GatewayMetrics;

/// Largest request body buffered for forwarding
pub const MAX_FORWARD_BODY: usize = 16 * 1024 * 1024;

/// Headers that describe one connection and must not be relayed
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Forwards admitted requests to the upstream.
pub struct UpstreamForwarder {
    client: Client,
    base: Url,
}

impl UpstreamForwarder {
    pub fn new(upstream: &str, connect_timeout: Duration) -> Result<Self, GatewayError> {
        let base = Url::parse(upstream)
            .map_err(|e| GatewayError::Client(format!("upstream '{upstream}': {e}")))?;

        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self { client, base })
    }

    pub fn upstream(&self) -> &Url {
        &self.base
    }

    /// Target URL: upstream base path joined with the request path and query.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.base.clone();
        let base_path = self.base.path().trim_end_matches('/');
        url.set_path(&format!("{base_path}{path}"));
        url.set_query(query);
        url
    }

    /// Deliver `req` upstream and relay the answer.
    pub async fn forward(&self, req: Request<Body>, metrics: &GatewayMetrics) -> Response {
        let (parts, body) = req.into_parts();
        let url = self.target_url(parts.uri.path(), parts.uri.query());

        let body = match axum::body::to_bytes(body, MAX_FORWARD_BODY).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to read request body for forwarding");
                return empty_response(StatusCode::PAYLOAD_TOO_LARGE);
            }
        };

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);

        debug!(method = %parts.method, url = %url, "Forwarding upstream");

        let upstream = match self
            .client
            .request(parts.method, url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                metrics.record_upstream_error();
                warn!(url = %url, error = %e, "Upstream request failed");
                return empty_response(StatusCode::BAD_GATEWAY);
            }
        };

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in Connection are hop-by-hop as well
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in HOP_BY_HOP.iter().chain(named.iter()) {
        headers.remove(name);
    }
}
