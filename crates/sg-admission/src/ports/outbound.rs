//! # Outbound Ports (Driven Ports)
//!
//! The graph data source the admission gate walks.
//!
//! Production: `KuboGraphSource` (sg-gateway/src/adapters/kubo.rs)
//! Testing: `InMemoryGraphSource` (test_utils.rs)

use async_trait::async_trait;
use std::collections::HashSet;

use crate::domain::cid::{BlockRef, Cid};
use crate::domain::errors::SourceError;

/// Abstract interface to the service that knows the content graph.
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// List the direct children of `cid`, in source order.
    ///
    /// A node without links (a leaf, or an empty directory) yields an empty
    /// list.
    async fn list_links(&self, cid: &Cid) -> Result<Vec<BlockRef>, SourceError>;

    /// Stored byte size of a single block.
    async fn block_stat(&self, cid: &Cid) -> Result<u64, SourceError>;

    /// Identifiers the source holds as trusted (pinned) content.
    async fn list_pinned(&self) -> Result<HashSet<Cid>, SourceError>;
}
