//! # Decision Cache (Bounded FIFO)
//!
//! Remembers the allow/deny outcome of earlier traversals, keyed by
//! identifier, so that a root or any node inside a walked graph is answered
//! without touching the graph source again.
//!
//! ## Algorithm: Keyed Store + Insertion Queue
//!
//! - `entries`: identifier → allowed, one entry per identifier
//! - `order`: identifiers in insertion order
//! - Insert of a new identifier past capacity evicts `order.front()`
//! - Insert of a known identifier changes nothing (outcomes are immutable
//!   until evicted, and the FIFO position is not refreshed)
//! - Lookups never reorder: this is FIFO, not LRU
//!
//! Both structures sit behind one mutex, so lookup, insert and eviction are
//! each atomic with respect to concurrent requests.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tracing::trace;

use super::cid::Cid;

struct CacheInner {
    entries: HashMap<Cid, bool>,
    order: VecDeque<Cid>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheInner {
    /// Returns true if the identifier was new.
    fn insert(&mut self, cid: Cid, allowed: bool, capacity: usize) -> bool {
        if self.entries.contains_key(&cid) {
            return false;
        }

        while self.order.len() >= capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                    self.evictions += 1;
                    trace!(cid = %oldest, "Evicted decision");
                }
                None => break,
            }
        }

        self.order.push_back(cid.clone());
        self.entries.insert(cid, allowed);
        true
    }
}

/// Bounded, insertion-ordered admission decision store.
pub struct DecisionCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl DecisionCache {
    /// Create a cache holding at most `capacity` decisions.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(capacity.min(65_536)),
                order: VecDeque::with_capacity(capacity.min(65_536)),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            capacity,
        }
    }

    /// Look up a prior decision: `Some(allowed)` if cached.
    pub fn lookup(&self, cid: &Cid) -> Option<bool> {
        let mut inner = self.inner.lock();
        match inner.entries.get(cid).copied() {
            Some(allowed) => {
                inner.hits += 1;
                Some(allowed)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Record a decision for one identifier.
    ///
    /// Returns false if the identifier already had a decision, which is kept.
    pub fn insert(&self, cid: Cid, allowed: bool) -> bool {
        self.inner.lock().insert(cid, allowed, self.capacity)
    }

    /// Record the same decision for a batch of identifiers in one critical
    /// section. Returns how many were new.
    pub fn insert_many<I>(&self, cids: I, allowed: bool) -> usize
    where
        I: IntoIterator<Item = Cid>,
    {
        let mut inner = self.inner.lock();
        cids.into_iter()
            .filter(|cid| inner.insert(cid.clone(), allowed, self.capacity))
            .count()
    }

    /// Like [`lookup`](Self::lookup) but leaves the hit/miss counters alone.
    pub fn peek(&self, cid: &Cid) -> Option<bool> {
        self.inner.lock().entries.get(cid).copied()
    }

    /// Check presence without touching hit/miss counters.
    pub fn contains(&self, cid: &Cid) -> bool {
        self.inner.lock().entries.contains_key(cid)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.entries.len(),
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
        }
    }
}

/// Cache statistics for monitoring.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}
