//! In-memory graph source for tests.
//!
//! Records every call so tests can assert how many lookups a decision cost,
//! and supports failure injection, artificial latency and a hold gate that
//! parks `list_links` calls until the test releases them.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::domain::cid::{BlockRef, Cid};
use crate::domain::errors::SourceError;
use crate::ports::outbound::GraphSource;

#[derive(Default)]
pub struct InMemoryGraphSource {
    links: HashMap<Cid, Vec<BlockRef>>,
    stats: HashMap<Cid, u64>,
    pinned: HashSet<Cid>,
    failing: HashSet<Cid>,
    fail_pinned: bool,
    delay: Option<Duration>,
    hold: Option<Arc<Semaphore>>,
    list_links_calls: AtomicUsize,
    block_stat_calls: AtomicUsize,
    calls_by_cid: Mutex<HashMap<Cid, usize>>,
}

impl InMemoryGraphSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node and its direct children.
    pub fn with_node(mut self, cid: &str, children: Vec<BlockRef>) -> Self {
        self.links.insert(Cid::from(cid), children);
        self
    }

    /// Register a stand-alone block with its stored size.
    pub fn with_block(mut self, cid: &str, size: u64) -> Self {
        self.stats.insert(Cid::from(cid), size);
        self
    }

    pub fn with_pinned<'a>(mut self, cids: impl IntoIterator<Item = &'a str>) -> Self {
        self.pinned.extend(cids.into_iter().map(Cid::from));
        self
    }

    /// Every lookup for `cid` fails with `SourceError::Unavailable`.
    pub fn failing(mut self, cid: &str) -> Self {
        self.failing.insert(Cid::from(cid));
        self
    }

    pub fn fail_pinned(mut self) -> Self {
        self.fail_pinned = true;
        self
    }

    /// Sleep this long inside every `list_links` call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Park every `list_links` call until [`release`](Self::release).
    pub fn held(mut self) -> Self {
        self.hold = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let parked `list_links` calls proceed, now and from here on.
    pub fn release(&self) {
        if let Some(hold) = &self.hold {
            if hold.available_permits() == 0 {
                hold.add_permits(Semaphore::MAX_PERMITS / 2);
            }
        }
    }

    pub fn list_links_calls(&self) -> usize {
        self.list_links_calls.load(Ordering::SeqCst)
    }

    pub fn block_stat_calls(&self) -> usize {
        self.block_stat_calls.load(Ordering::SeqCst)
    }

    /// Total data-source calls (both kinds).
    pub fn total_calls(&self) -> usize {
        self.list_links_calls() + self.block_stat_calls()
    }

    /// Data-source calls made for one identifier.
    pub fn calls_for(&self, cid: &str) -> usize {
        self.calls_by_cid
            .lock()
            .get(&Cid::from(cid))
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, cid: &Cid) {
        *self.calls_by_cid.lock().entry(cid.clone()).or_insert(0) += 1;
    }
}

#[async_trait]
impl GraphSource for InMemoryGraphSource {
    async fn list_links(&self, cid: &Cid) -> Result<Vec<BlockRef>, SourceError> {
        self.list_links_calls.fetch_add(1, Ordering::SeqCst);
        self.record(cid);

        if let Some(hold) = &self.hold {
            let _permit = hold
                .acquire()
                .await
                .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(cid) {
            return Err(SourceError::Unavailable(format!("injected failure for {cid}")));
        }

        match self.links.get(cid) {
            Some(children) => Ok(children.clone()),
            None if self.stats.contains_key(cid) => Ok(Vec::new()),
            None => Err(SourceError::NotFound(cid.clone())),
        }
    }

    async fn block_stat(&self, cid: &Cid) -> Result<u64, SourceError> {
        self.block_stat_calls.fetch_add(1, Ordering::SeqCst);
        self.record(cid);

        if self.failing.contains(cid) {
            return Err(SourceError::Unavailable(format!("injected failure for {cid}")));
        }

        self.stats
            .get(cid)
            .copied()
            .ok_or_else(|| SourceError::NotFound(cid.clone()))
    }

    async fn list_pinned(&self) -> Result<HashSet<Cid>, SourceError> {
        if self.fail_pinned {
            return Err(SourceError::Unavailable("pin listing failed".into()));
        }
        Ok(self.pinned.clone())
    }
}

/// `root` → two leaves of `a` and `b` bytes.
pub fn two_leaf_graph(root: &str, a: u64, b: u64) -> InMemoryGraphSource {
    InMemoryGraphSource::new().with_node(
        root,
        vec![
            BlockRef::leaf(format!("{root}-leaf-a"), a),
            BlockRef::leaf(format!("{root}-leaf-b"), b),
        ],
    )
}

/// Diamond: `A` → {`B`, `C`}, both `B` and `C` → shared leaf `D` of `size`.
pub fn diamond_graph(size: u64) -> InMemoryGraphSource {
    InMemoryGraphSource::new()
        .with_node("A", vec![BlockRef::branch("B"), BlockRef::branch("C")])
        .with_node("B", vec![BlockRef::leaf("D", size)])
        .with_node("C", vec![BlockRef::leaf("D", size)])
}
