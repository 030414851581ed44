//! # Forwarding
//!
//! What an admitted or ungated request looks like at the upstream, and what
//! the client gets back.

#[cfg(test)]
mod tests {
    use crate::fixtures::{content_gate, content_graph, gate_config, RunningGate, UPSTREAM_MARKER};
    use reqwest::StatusCode;
    use std::net::TcpListener;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_non_content_paths_pass_through_ungated() {
        let (gate, source) = content_gate().await;

        for path in ["/", "/ipns/example.org", "/ipfs", "/ipfs/", "/api/v0/version"] {
            let response = gate.get(path).await;
            assert_eq!(response.status(), StatusCode::OK, "{path}");
            assert_eq!(response.headers()[UPSTREAM_MARKER], "1", "{path}");
        }
        assert_eq!(source.total_calls(), 0);

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_method_query_body_and_headers_relayed() {
        let (gate, _) = content_gate().await;

        let response = gate
            .client
            .post(gate.url("/ipfs/QmSmall/upload?format=car&dag-scope=entity"))
            .header("x-client", "tests")
            .body("payload")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-seen-client"], "tests");
        assert_eq!(
            response.text().await.unwrap(),
            "POST /ipfs/QmSmall/upload?format=car&dag-scope=entity\npayload"
        );

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_upstream_status_relayed() {
        let (gate, _) = content_gate().await;

        let response = gate.get("/ipfs/QmSmall/missing").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.text().await.unwrap(), "not here");

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_redirects_relayed_not_followed() {
        let (gate, _) = content_gate().await;

        let response = gate.get("/redirect").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["location"], "/elsewhere");

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_response_carries_request_id() {
        let (gate, _) = content_gate().await;

        let response = gate
            .client
            .get(gate.url("/ipfs/QmHuge"))
            .header("x-request-id", "trace-42")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers()["x-request-id"], "trace-42");

        let response = gate.get("/ipfs/QmSmall").await;
        assert!(response.headers().contains_key("x-request-id"));

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let dead = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let source = Arc::new(content_graph());
        let gate = RunningGate::start(gate_config(dead), source).await;

        let response = gate.get("/ipfs/QmSmall").await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.bytes().await.unwrap().is_empty());

        // A denial never reaches the upstream, dead or not
        assert_eq!(gate.get("/ipfs/QmHuge").await.status(), StatusCode::FORBIDDEN);

        let metrics = gate.admin_json("/metrics").await;
        assert_eq!(metrics["upstream"]["errors"], 1);

        gate.stop().await;
    }
}
