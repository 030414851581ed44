//! Permanent allow set: identifiers admitted regardless of size.
//!
//! Built once at startup from the graph source's pinned listing and never
//! mutated afterwards, so readers need no synchronization.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use super::cid::Cid;
use super::errors::SourceError;
use crate::ports::outbound::GraphSource;

/// Immutable set of always-admitted identifiers.
#[derive(Debug, Clone, Default)]
pub struct PermanentAllowSet {
    members: Arc<HashSet<Cid>>,
}

impl PermanentAllowSet {
    /// An empty set: nothing bypasses the size check.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fetch the pinned listing once and freeze it.
    pub async fn load<S>(source: &S) -> Result<Self, SourceError>
    where
        S: GraphSource + ?Sized,
    {
        let pinned = source.list_pinned().await?;
        info!(count = pinned.len(), "Loaded permanent allow set");
        Ok(Self::from_iter(pinned))
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.members.contains(cid)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl FromIterator<Cid> for PermanentAllowSet {
    fn from_iter<I: IntoIterator<Item = Cid>>(iter: I) -> Self {
        Self {
            members: Arc::new(iter.into_iter().collect()),
        }
    }
}
