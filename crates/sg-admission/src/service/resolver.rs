//! # Graph Size Resolver
//!
//! Walks every block reachable from a root and sums the leaf sizes.
//!
//! ## Algorithm: Work Stack + Visited Set
//!
//! 1. List the root's links. A root without links is itself a leaf block and
//!    its size comes from `block_stat`.
//! 2. Pop a child. Seen before? Skip it, so shared substructure is counted
//!    once and a malformed cyclic graph still terminates.
//! 3. Leaf: add its declared size. Branch: list its links and push them.
//!
//! Recursion depth never grows with graph depth; the stack lives on the heap.
//!
//! ## Failure Policy
//!
//! - `FailClosed` (default): the first failed lookup aborts the walk and the
//!   partial sum is discarded.
//! - `SkipUnavailable`: a failed branch lookup is logged and counted as zero
//!   bytes. The failed node is left out of the visited set so it is never
//!   cached. Failures on the root itself are always fatal.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::cid::{BlockRef, Cid};
use crate::domain::errors::{ResolveError, SourceError};
use crate::ports::outbound::GraphSource;

/// What to do when a lookup below the root fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the whole traversal
    #[default]
    FailClosed,
    /// Count the failed node as zero bytes and continue
    #[serde(alias = "skip")]
    SkipUnavailable,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-closed" | "fail_closed" | "closed" => Ok(FailurePolicy::FailClosed),
            "skip" | "skip-unavailable" | "skip_unavailable" => {
                Ok(FailurePolicy::SkipUnavailable)
            }
            other => Err(format!("unknown failure policy '{other}'")),
        }
    }
}

/// Closure of a root's graph and its cumulative size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalResult {
    /// Every identifier reached, root included
    pub visited: HashSet<Cid>,
    /// The same identifiers in the order they were first reached, root first
    pub order: Vec<Cid>,
    /// Sum of leaf sizes, each distinct leaf counted once
    pub total_size: u64,
    /// Data-source calls made
    pub lookups: usize,
    /// Nodes whose lookup failed under `SkipUnavailable`
    pub skipped: Vec<Cid>,
}

/// Computes reachable sets and cumulative sizes against a graph source.
#[derive(Clone)]
pub struct GraphSizeResolver {
    source: Arc<dyn GraphSource>,
    policy: FailurePolicy,
    deadline: Option<Duration>,
}

impl GraphSizeResolver {
    pub fn new(source: Arc<dyn GraphSource>) -> Self {
        Self {
            source,
            policy: FailurePolicy::default(),
            deadline: None,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound each traversal; expiry yields `ResolveError::Timeout`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Resolve the reachable set and total size of `root`.
    pub async fn resolve(&self, root: &Cid) -> Result<TraversalResult, ResolveError> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.walk(root))
                .await
                .map_err(|_| {
                    warn!(cid = %root, deadline_ms = deadline.as_millis(), "Traversal timed out");
                    ResolveError::Timeout(deadline)
                })?,
            None => self.walk(root).await,
        }
    }

    async fn walk(&self, root: &Cid) -> Result<TraversalResult, ResolveError> {
        let mut result = TraversalResult {
            visited: HashSet::from([root.clone()]),
            order: vec![root.clone()],
            total_size: 0,
            lookups: 1,
            skipped: Vec::new(),
        };

        let mut stack: Vec<BlockRef> = self
            .source
            .list_links(root)
            .await
            .map_err(|source| source_failure(root, source))?;

        if stack.is_empty() {
            result.lookups += 1;
            result.total_size = self
                .source
                .block_stat(root)
                .await
                .map_err(|source| source_failure(root, source))?;
            debug!(cid = %root, size = result.total_size, "Root is a single block");
            return Ok(result);
        }

        while let Some(child) = stack.pop() {
            if !result.visited.insert(child.cid.clone()) {
                continue;
            }
            result.order.push(child.cid.clone());

            if !child.is_branch {
                result.total_size = result.total_size.saturating_add(child.size);
                continue;
            }

            result.lookups += 1;
            match self.source.list_links(&child.cid).await {
                Ok(links) => stack.extend(links),
                Err(source) => match self.policy {
                    FailurePolicy::FailClosed => {
                        return Err(source_failure(&child.cid, source));
                    }
                    FailurePolicy::SkipUnavailable => {
                        warn!(
                            root = %root,
                            cid = %child.cid,
                            error = %source,
                            "Lookup failed, counting node as zero bytes"
                        );
                        result.visited.remove(&child.cid);
                        result.order.pop();
                        result.skipped.push(child.cid);
                    }
                },
            }
        }

        debug!(
            cid = %root,
            total_size = result.total_size,
            visited = result.visited.len(),
            lookups = result.lookups,
            "Traversal complete"
        );

        Ok(result)
    }
}

fn source_failure(cid: &Cid, source: SourceError) -> ResolveError {
    ResolveError::Source {
        cid: cid.clone(),
        source,
    }
}
