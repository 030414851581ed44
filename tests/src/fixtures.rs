//! Shared fixtures: stub servers, test graphs and a running gate.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use sg_admission::test_utils::InMemoryGraphSource;
use sg_admission::{BlockRef, GraphSource};
use sg_gateway::{GatewayConfig, SizeGateService};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

/// Quota used by every fixture gate: 1 MB = 1,048,576 bytes.
pub const QUOTA_MB: u64 = 1;

/// Header the stub upstream puts on every response it produces.
pub const UPSTREAM_MARKER: &str = "x-upstream";

/// Serve `router` on an ephemeral loopback port.
pub async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub server");
    let addr = listener.local_addr().expect("stub server address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Upstream that echoes what it received.
///
/// - `/redirect` answers 302 to `/elsewhere`
/// - `.../missing` answers 404
/// - anything else answers 200 with `"<METHOD> <path?query>\n<body>"`, and
///   copies the `x-client` request header back as `x-seen-client`
pub async fn spawn_upstream() -> SocketAddr {
    spawn(Router::new().fallback(echo)).await
}

async fn echo(req: Request<Body>) -> Response {
    let (parts, body) = req.into_parts();
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();

    if parts.uri.path() == "/redirect" {
        return (
            StatusCode::FOUND,
            [(header::LOCATION, "/elsewhere"), (header::HeaderName::from_static(UPSTREAM_MARKER), "1")],
        )
            .into_response();
    }
    if parts.uri.path().ends_with("/missing") {
        return (
            StatusCode::NOT_FOUND,
            [(header::HeaderName::from_static(UPSTREAM_MARKER), "1")],
            "not here",
        )
            .into_response();
    }

    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default();

    let mut response = format!("{} {}\n{}", parts.method, target, body).into_response();
    response
        .headers_mut()
        .insert(UPSTREAM_MARKER, header::HeaderValue::from_static("1"));
    if let Some(client) = parts.headers.get("x-client") {
        response.headers_mut().insert("x-seen-client", client.clone());
    }
    response
}

/// Graph used by the HTTP tests.
///
/// | Root        | Shape                                  | Total      |
/// |-------------|----------------------------------------|------------|
/// | `QmHuge`    | leaf 600,000 + dir `QmHugeDir` → 600,000 | 1,200,000 |
/// | `QmSmall`   | two leaves, 1,000 and 2,000            | 3,000      |
/// | `QmRaw`     | single block of 512 bytes              | 512        |
/// | `QmBroken`  | every lookup fails                     | -          |
/// | `QmPinned`  | pinned, unknown to the graph           | -          |
pub fn content_graph() -> InMemoryGraphSource {
    InMemoryGraphSource::new()
        .with_node(
            "QmHuge",
            vec![
                BlockRef::leaf("QmHugeA", 600_000),
                BlockRef::branch("QmHugeDir"),
            ],
        )
        .with_node("QmHugeDir", vec![BlockRef::leaf("QmHugeB", 600_000)])
        .with_node(
            "QmSmall",
            vec![
                BlockRef::leaf("QmSmallA", 1_000),
                BlockRef::leaf("QmSmallB", 2_000),
            ],
        )
        .with_block("QmRaw", 512)
        .failing("QmBroken")
        .with_pinned(["QmPinned"])
}

/// Gate configuration pointing at `upstream`, listening on ephemeral ports.
pub fn gate_config(upstream: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listen.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.listen.port = 0;
    config.admin.port = 0;
    config.upstream.url = format!("http://{upstream}");
    config.admission.quota_mb = QUOTA_MB;
    config
}

/// A started gate and a client that does not follow redirects.
pub struct RunningGate {
    service: SizeGateService,
    base: String,
    admin: Option<String>,
    pub client: reqwest::Client,
}

impl RunningGate {
    /// Build and start a gate over `source`.
    pub async fn start(config: GatewayConfig, source: Arc<dyn GraphSource>) -> Self {
        let service = SizeGateService::new(config, source)
            .await
            .expect("gate builds");
        Self::run(service).await
    }

    /// Start an already built service.
    pub async fn run(mut service: SizeGateService) -> Self {
        let addr = service.start().await.expect("gate starts");
        let admin = service.admin_addr().map(|a| format!("http://{a}"));
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("client builds");

        Self {
            service,
            base: format!("http://{addr}"),
            admin,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn admin_url(&self, path: &str) -> String {
        let admin = self.admin.as_deref().expect("admin server enabled");
        format!("{admin}{path}")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("request reaches the gate")
    }

    pub async fn admin_json(&self, path: &str) -> serde_json::Value {
        self.client
            .get(self.admin_url(path))
            .send()
            .await
            .expect("admin request")
            .json()
            .await
            .expect("admin json")
    }

    pub fn service(&self) -> &SizeGateService {
        &self.service
    }

    pub async fn stop(mut self) {
        self.service.shutdown().await;
    }
}

/// Gate over [`content_graph`] in front of a fresh echo upstream.
///
/// Returns the source too so tests can count lookups.
pub async fn content_gate() -> (RunningGate, Arc<InMemoryGraphSource>) {
    let upstream = spawn_upstream().await;
    let source = Arc::new(content_graph());
    let gate = RunningGate::start(gate_config(upstream), source.clone()).await;
    (gate, source)
}
