//! # Admission Over HTTP
//!
//! Each decision the gate can reach, observed from a real client:
//!
//! - over quota → 403, empty body, upstream never contacted
//! - within quota → the upstream's answer
//! - lookup failure → 500, empty body, nothing cached
//! - pinned → forwarded without a single lookup

#[cfg(test)]
mod tests {
    use crate::fixtures::{content_gate, gate_config, spawn_upstream, RunningGate, UPSTREAM_MARKER};
    use reqwest::StatusCode;
    use sg_admission::test_utils::InMemoryGraphSource;
    use sg_admission::{BlockRef, FailurePolicy};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_over_quota_is_forbidden_with_empty_body() {
        let (gate, source) = content_gate().await;

        let response = gate.get("/ipfs/QmHuge").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(UPSTREAM_MARKER).is_none());
        assert!(response.bytes().await.unwrap().is_empty());

        // Second request is answered from the cache
        let calls = source.total_calls();
        let response = gate.get("/ipfs/QmHuge/some/file.txt").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(source.total_calls(), calls);

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_descendant_of_denied_root_is_denied_from_cache() {
        let (gate, source) = content_gate().await;

        assert_eq!(gate.get("/ipfs/QmHuge").await.status(), StatusCode::FORBIDDEN);
        assert_eq!(source.calls_for("QmHugeDir"), 1);

        // QmHugeDir alone is 600,000 bytes, but it was visited under a denied root
        let response = gate.get("/ipfs/QmHugeDir").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(source.calls_for("QmHugeDir"), 1);

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_within_quota_is_forwarded() {
        let (gate, _) = content_gate().await;

        let response = gate.get("/ipfs/QmSmall/readme.md").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[UPSTREAM_MARKER], "1");
        assert_eq!(response.text().await.unwrap(), "GET /ipfs/QmSmall/readme.md\n");

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_single_block_root_sized_by_block_stat() {
        let (gate, source) = content_gate().await;

        assert_eq!(gate.get("/ipfs/QmRaw").await.status(), StatusCode::OK);
        assert_eq!(source.block_stat_calls(), 1);

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_lookup_failure_is_internal_error_and_not_cached() {
        let (gate, source) = content_gate().await;

        let response = gate.get("/ipfs/QmBroken").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(UPSTREAM_MARKER).is_none());
        assert!(response.bytes().await.unwrap().is_empty());

        // Retried on the next request
        assert_eq!(gate.get("/ipfs/QmBroken").await.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(source.calls_for("QmBroken"), 2);
        assert!(!gate.service().gate().cache().contains(&"QmBroken".into()));

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_pinned_root_skips_lookups() {
        let (gate, source) = content_gate().await;

        let response = gate.get("/ipfs/QmPinned/video.mp4").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[UPSTREAM_MARKER], "1");
        assert_eq!(source.total_calls(), 0);

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_quota_boundary_is_inclusive() {
        let upstream = spawn_upstream().await;
        let source = Arc::new(
            InMemoryGraphSource::new()
                .with_node("QmExact", vec![BlockRef::leaf("a", 1_048_576)])
                .with_node("QmOver", vec![BlockRef::leaf("b", 1_048_577)]),
        );
        let gate = RunningGate::start(gate_config(upstream), source).await;

        assert_eq!(gate.get("/ipfs/QmExact").await.status(), StatusCode::OK);
        assert_eq!(gate.get("/ipfs/QmOver").await.status(), StatusCode::FORBIDDEN);

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_skip_policy_admits_partial_graph() {
        let upstream = spawn_upstream().await;
        let source = Arc::new(
            InMemoryGraphSource::new()
                .with_node(
                    "QmPartial",
                    vec![BlockRef::leaf("ok", 1_000), BlockRef::branch("gone")],
                )
                .failing("gone"),
        );

        let mut config = gate_config(upstream);
        config.admission.failure_policy = FailurePolicy::SkipUnavailable;
        let gate = RunningGate::start(config, source.clone()).await;
        assert_eq!(gate.get("/ipfs/QmPartial").await.status(), StatusCode::OK);
        assert_eq!(gate.admin_json("/metrics").await["gate"]["skipped"], 1);
        gate.stop().await;

        // Same graph, fail-closed
        let upstream = spawn_upstream().await;
        let gate = RunningGate::start(gate_config(upstream), source).await;
        assert_eq!(
            gate.get("/ipfs/QmPartial").await.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        gate.stop().await;
    }

    #[tokio::test]
    async fn test_admin_endpoints_report_decisions() {
        let (gate, _) = content_gate().await;

        gate.get("/ipfs/QmHuge").await;
        gate.get("/ipfs/QmHuge").await;
        gate.get("/ipfs/QmSmall").await;
        gate.get("/ipfs/QmBroken").await;
        gate.get("/status").await;

        let health = gate.admin_json("/health").await;
        assert_eq!(health["status"], "ok");

        let metrics = gate.admin_json("/metrics").await;
        assert_eq!(metrics["requests"]["total"], 5);
        assert_eq!(metrics["requests"]["passthrough"], 1);
        assert_eq!(metrics["admission"]["denied"], 2);
        assert_eq!(metrics["admission"]["allowed"], 1);
        assert_eq!(metrics["admission"]["errors"], 1);
        assert_eq!(metrics["gate"]["traversals"], 3);
        assert_eq!(metrics["gate"]["cache_hits"], 1);

        let cache = gate.admin_json("/cache").await;
        // QmHuge, QmHugeA, QmHugeDir, QmHugeB, QmSmall, QmSmallA, QmSmallB
        assert_eq!(cache["cache"]["entries"], 7);
        assert_eq!(cache["pinned"], 1);

        gate.stop().await;
    }
}
