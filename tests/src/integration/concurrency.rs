//! # Concurrent Requests
//!
//! Many clients asking for the same uncached root at once.

#[cfg(test)]
mod tests {
    use crate::fixtures::{gate_config, spawn_upstream, RunningGate};
    use futures::future::join_all;
    use reqwest::StatusCode;
    use sg_admission::test_utils::InMemoryGraphSource;
    use sg_admission::BlockRef;
    use std::sync::Arc;
    use std::time::Duration;

    const CLIENTS: usize = 8;

    fn slow_graph() -> InMemoryGraphSource {
        InMemoryGraphSource::new()
            .with_node(
                "QmHot",
                vec![BlockRef::leaf("QmHotA", 4_096), BlockRef::branch("QmHotDir")],
            )
            .with_node("QmHotDir", vec![BlockRef::leaf("QmHotB", 4_096)])
            .with_node("QmBig", vec![BlockRef::leaf("QmBigA", 2_000_000)])
            .with_delay(Duration::from_millis(200))
    }

    async fn burst(gate: &RunningGate, path: &str) -> Vec<StatusCode> {
        let requests = (0..CLIENTS).map(|_| gate.get(path));
        join_all(requests)
            .await
            .into_iter()
            .map(|r| r.status())
            .collect()
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_traversal() {
        let upstream = spawn_upstream().await;
        let source = Arc::new(slow_graph());
        let gate = RunningGate::start(gate_config(upstream), source.clone()).await;

        let statuses = burst(&gate, "/ipfs/QmHot/index.html").await;
        assert!(statuses.iter().all(|s| *s == StatusCode::OK), "{statuses:?}");
        assert_eq!(source.calls_for("QmHot"), 1);
        assert_eq!(source.calls_for("QmHotDir"), 1);

        let statuses = burst(&gate, "/ipfs/QmBig").await;
        assert!(statuses.iter().all(|s| *s == StatusCode::FORBIDDEN), "{statuses:?}");
        assert_eq!(source.calls_for("QmBig"), 1);

        let stats = gate.service().gate().stats().snapshot();
        assert_eq!(stats.traversals, 2);
        assert_eq!(stats.allowed, CLIENTS as u64);
        assert_eq!(stats.denied, CLIENTS as u64);

        gate.stop().await;
    }

    #[tokio::test]
    async fn test_racing_traversals_agree() {
        let upstream = spawn_upstream().await;
        let source = Arc::new(slow_graph());
        let mut config = gate_config(upstream);
        config.admission.coalesce = false;
        let gate = RunningGate::start(config, source.clone()).await;

        let statuses = burst(&gate, "/ipfs/QmBig").await;
        assert!(statuses.iter().all(|s| *s == StatusCode::FORBIDDEN), "{statuses:?}");

        // Each racer walked on its own; the cache still holds one entry per node
        assert!(source.calls_for("QmBig") > 1);
        assert_eq!(gate.service().gate().cache().len(), 2);

        gate.stop().await;
    }
}
