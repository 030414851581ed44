//! # Full Stack Against a Kubo RPC Stub
//!
//! The gate built by [`SizeGateService::connect`], talking HTTP to a stub
//! of the Kubo RPC API.

#[cfg(test)]
mod tests {
    use crate::fixtures::{gate_config, spawn, spawn_upstream, RunningGate};
    use axum::{
        extract::Query,
        http::StatusCode as AxumStatus,
        response::{IntoResponse, Response},
        routing::post,
        Json, Router,
    };
    use reqwest::StatusCode;
    use serde_json::json;
    use sg_gateway::{GatewayError, SizeGateService};
    use std::collections::HashMap;
    use std::net::SocketAddr;

    type Params = Query<HashMap<String, String>>;

    async fn ls(Query(q): Params) -> Response {
        let links = match q.get("arg").map(String::as_str) {
            Some("QmSite") => json!([
                {"Name": "index.html", "Hash": "QmIndex", "Size": 2048, "Type": 2},
                {"Name": "assets", "Hash": "QmAssets", "Size": 0, "Type": 1}
            ]),
            Some("QmAssets") => json!([
                {"Name": "logo.png", "Hash": "QmLogo", "Size": 10240, "Type": 2}
            ]),
            Some("QmArchive") => json!([
                {"Name": "part1", "Hash": "QmPart1", "Size": 900000, "Type": 2},
                {"Name": "shard", "Hash": "QmShard", "Size": 0, "Type": 5}
            ]),
            Some("QmShard") => json!([
                {"Name": "part2", "Hash": "QmPart2", "Size": 900000, "Type": 2}
            ]),
            Some("bafkraw") => json!(null),
            _ => {
                return (
                    AxumStatus::INTERNAL_SERVER_ERROR,
                    Json(json!({"Message": "merkledag: not found", "Code": 0, "Type": "error"})),
                )
                    .into_response()
            }
        };
        let arg = q.get("arg").cloned().unwrap_or_default();
        Json(json!({"Objects": [{"Hash": arg, "Links": links}]})).into_response()
    }

    async fn block_stat(Query(q): Params) -> Response {
        match q.get("arg").map(String::as_str) {
            Some("bafkraw") => Json(json!({"Key": "bafkraw", "Size": 262144})).into_response(),
            _ => AxumStatus::INTERNAL_SERVER_ERROR.into_response(),
        }
    }

    async fn pin_ls() -> Json<serde_json::Value> {
        Json(json!({"Keys": {"QmPinnedHuge": {"Type": "recursive"}}}))
    }

    async fn spawn_kubo(pins_fail: bool) -> SocketAddr {
        let router = Router::new()
            .route("/api/v0/ls", post(ls))
            .route("/api/v0/block/stat", post(block_stat));
        let router = if pins_fail {
            router.route(
                "/api/v0/pin/ls",
                post(|| async { AxumStatus::SERVICE_UNAVAILABLE }),
            )
        } else {
            router.route("/api/v0/pin/ls", post(pin_ls))
        };
        spawn(router).await
    }

    async fn kubo_gate() -> RunningGate {
        let kubo = spawn_kubo(false).await;
        let upstream = spawn_upstream().await;
        let mut config = gate_config(upstream);
        config.ipfs.api_url = format!("http://{kubo}");

        let service = SizeGateService::connect(config).await.unwrap();
        RunningGate::run(service).await
    }

    #[tokio::test]
    async fn test_site_within_quota_forwarded() {
        let gate = kubo_gate().await;

        let response = gate.get("/ipfs/QmSite/index.html").await;
        assert_eq!(response.status(), StatusCode::OK);

        // Directory listing below the root was followed
        assert!(gate.service().gate().cache().contains(&"QmLogo".into()));

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_sharded_archive_over_quota_denied() {
        let gate = kubo_gate().await;

        let response = gate.get("/ipfs/QmArchive").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(gate.service().gate().cache().contains(&"QmPart2".into()));

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_raw_block_root_sized_by_block_stat() {
        let gate = kubo_gate().await;
        assert_eq!(gate.get("/ipfs/bafkraw").await.status(), StatusCode::OK);
        gate.stop().await;
    }

    #[tokio::test]
    async fn test_unknown_root_is_internal_error() {
        let gate = kubo_gate().await;
        assert_eq!(
            gate.get("/ipfs/QmNowhere").await.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        gate.stop().await;
    }

    #[tokio::test]
    async fn test_pinned_listing_bypasses_size_check() {
        let gate = kubo_gate().await;

        // Unknown to `ls`, so anything but the allow set would answer 500
        assert_eq!(gate.get("/ipfs/QmPinnedHuge").await.status(), StatusCode::OK);

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_failed_pinned_listing_prevents_startup() {
        let kubo = spawn_kubo(true).await;
        let upstream = spawn_upstream().await;
        let mut config = gate_config(upstream);
        config.ipfs.api_url = format!("http://{kubo}");

        let result = SizeGateService::connect(config).await;
        assert!(matches!(result, Err(GatewayError::PinnedListing(_))));
    }
}
