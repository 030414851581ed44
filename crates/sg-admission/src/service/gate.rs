//! # Admission Gate
//!
//! Decides allow / deny / error for one root identifier.
//!
//! ## Decision Order (first decisive step wins)
//!
//! 1. Permanent allow set: allow, no cache read or write, no traversal.
//! 2. Decision cache: the cached outcome, no traversal.
//! 3. Traversal: compare the total size to the quota, then cache the outcome
//!    for *every* visited identifier so later requests for inner nodes are
//!    answered from the cache.
//!
//! A failed traversal yields `Decision::Error` and caches nothing.
//!
//! ## Per-identifier lifecycle
//!
//! ```text
//!              startup                 traversal
//!   Unknown ───────────► Permanent    Unknown ────► Allowed | Denied
//!                       (never left)     ▲                 │
//!                                        └──── eviction ───┘
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::inflight::{InFlight, Role};
use super::resolver::{FailurePolicy, GraphSizeResolver};
use crate::domain::allow_set::PermanentAllowSet;
use crate::domain::cache::DecisionCache;
use crate::domain::cid::Cid;
use crate::domain::decision::{AllowReason, Decision, DenyReason, Quota};
use crate::domain::errors::AdmissionError;
use crate::ports::outbound::GraphSource;

/// Admission policy knobs.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Largest admissible graph size
    pub quota: Quota,
    /// Upper bound on a single traversal
    pub traversal_timeout: Option<Duration>,
    /// Behaviour when a lookup below the root fails
    pub failure_policy: FailurePolicy,
    /// Share one traversal between concurrent requests for the same identifier
    pub coalesce: bool,
}

impl GateConfig {
    pub fn new(quota: Quota) -> Self {
        Self {
            quota,
            traversal_timeout: None,
            failure_policy: FailurePolicy::FailClosed,
            coalesce: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.traversal_timeout = Some(timeout);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_coalescing(mut self, coalesce: bool) -> Self {
        self.coalesce = coalesce;
        self
    }
}

/// Counters for the admin endpoint.
#[derive(Debug, Default)]
pub struct GateStats {
    pub pinned_hits: AtomicU64,
    pub cache_hits: AtomicU64,
    pub traversals: AtomicU64,
    pub coalesced: AtomicU64,
    pub allowed: AtomicU64,
    pub denied: AtomicU64,
    pub errors: AtomicU64,
    /// Nodes counted as zero bytes under `SkipUnavailable`
    pub skipped: AtomicU64,
}

/// Point-in-time copy of [`GateStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GateStatsSnapshot {
    pub pinned_hits: u64,
    pub cache_hits: u64,
    pub traversals: u64,
    pub coalesced: u64,
    pub allowed: u64,
    pub denied: u64,
    pub errors: u64,
    pub skipped: u64,
}

impl GateStats {
    pub fn snapshot(&self) -> GateStatsSnapshot {
        GateStatsSnapshot {
            pinned_hits: self.pinned_hits.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            traversals: self.traversals.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            allowed: self.allowed.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    fn record(&self, decision: &Decision) {
        let counter = match decision {
            Decision::Allow(_) => &self.allowed,
            Decision::Deny(_) => &self.denied,
            Decision::Error(_) => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Orchestrates allow set, cache and resolver.
pub struct AdmissionGate {
    resolver: GraphSizeResolver,
    pinned: PermanentAllowSet,
    cache: DecisionCache,
    inflight: InFlight,
    config: GateConfig,
    stats: Arc<GateStats>,
}

impl AdmissionGate {
    pub fn new(
        source: Arc<dyn GraphSource>,
        pinned: PermanentAllowSet,
        cache: DecisionCache,
        config: GateConfig,
    ) -> Self {
        let mut resolver = GraphSizeResolver::new(source).with_policy(config.failure_policy);
        if let Some(timeout) = config.traversal_timeout {
            resolver = resolver.with_deadline(timeout);
        }

        info!(
            quota_bytes = config.quota.bytes(),
            cache_capacity = cache.capacity(),
            pinned = pinned.len(),
            failure_policy = ?config.failure_policy,
            coalesce = config.coalesce,
            "Admission gate ready"
        );

        Self {
            resolver,
            pinned,
            cache,
            inflight: InFlight::default(),
            config,
            stats: Arc::new(GateStats::default()),
        }
    }

    /// Decide whether the graph rooted at `cid` may be served.
    pub async fn decide(&self, cid: &Cid) -> Decision {
        let decision = self.decide_inner(cid).await;
        self.stats.record(&decision);
        decision
    }

    async fn decide_inner(&self, cid: &Cid) -> Decision {
        if self.pinned.contains(cid) {
            self.stats.pinned_hits.fetch_add(1, Ordering::Relaxed);
            debug!(cid = %cid, "Pinned, admitted");
            return Decision::Allow(AllowReason::Pinned);
        }

        loop {
            if let Some(allowed) = self.cache.lookup(cid) {
                return self.cached(cid, allowed);
            }

            if !self.config.coalesce {
                return self.traverse(cid).await;
            }

            match self.inflight.join(cid) {
                Role::Leader(guard) => {
                    // A walk may have finished between the lookup and join
                    let decision = match self.cache.peek(cid) {
                        Some(allowed) => self.cached(cid, allowed),
                        None => self.traverse(cid).await,
                    };
                    guard.complete(&decision);
                    return decision;
                }
                Role::Follower(mut rx) => {
                    self.stats.coalesced.fetch_add(1, Ordering::Relaxed);
                    debug!(cid = %cid, "Waiting on in-flight traversal");
                    match rx.recv().await {
                        Ok(decision) => return decision,
                        // Leader was cancelled; start over
                        Err(_) => continue,
                    }
                }
            }
        }
    }

    fn cached(&self, cid: &Cid, allowed: bool) -> Decision {
        self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
        debug!(cid = %cid, allowed, "Decision cache hit");
        if allowed {
            Decision::Allow(AllowReason::Cached)
        } else {
            Decision::Deny(DenyReason::Cached)
        }
    }

    async fn traverse(&self, cid: &Cid) -> Decision {
        self.stats.traversals.fetch_add(1, Ordering::Relaxed);

        let result = match self.resolver.resolve(cid).await {
            Ok(result) => result,
            Err(e) => {
                warn!(cid = %cid, error = %e, "Traversal failed, nothing cached");
                return Decision::Error(AdmissionError::Resolve(e));
            }
        };

        let total_size = result.total_size;
        let quota = self.config.quota;
        let allowed = quota.admits(total_size);
        let visited = result.visited.len();
        let skipped = result.skipped.len();
        self.stats
            .skipped
            .fetch_add(skipped as u64, Ordering::Relaxed);

        // Root goes in last so a batch larger than the cache never evicts it
        let mut order = result.order;
        order.rotate_left(1);
        let cached = self.cache.insert_many(order, allowed);

        if allowed {
            info!(
                cid = %cid,
                total_size,
                quota = quota.bytes(),
                visited,
                cached,
                skipped,
                lookups = result.lookups,
                "Within quota"
            );
            Decision::Allow(AllowReason::WithinQuota { total_size })
        } else {
            info!(
                cid = %cid,
                total_size,
                quota = quota.bytes(),
                visited,
                cached,
                skipped,
                lookups = result.lookups,
                "Total size exceeded quota"
            );
            Decision::Deny(DenyReason::QuotaExceeded {
                total_size,
                quota: quota.bytes(),
            })
        }
    }

    pub fn cache(&self) -> &DecisionCache {
        &self.cache
    }

    pub fn pinned(&self) -> &PermanentAllowSet {
        &self.pinned
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<GateStats> {
        Arc::clone(&self.stats)
    }

    /// Traversals currently running under coalescing.
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }
}
