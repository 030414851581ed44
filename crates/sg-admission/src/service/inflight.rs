//! Single-flight coalescing of traversals per identifier.
//!
//! The first request for an uncached identifier becomes the leader and walks
//! the graph; requests arriving while that walk is running subscribe to the
//! leader's outcome instead of starting their own.
//!
//! Registration and completion both happen under the same lock, so a
//! follower either subscribes before the leader publishes or finds no entry
//! at all. A leader dropped before completing (its request was cancelled)
//! removes its entry; its followers see the channel close and retry.

use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::broadcast;

use crate::domain::cid::Cid;
use crate::domain::decision::Decision;

#[derive(Default)]
pub(crate) struct InFlight {
    calls: Mutex<HashMap<Cid, broadcast::Sender<Decision>>>,
}

pub(crate) enum Role<'a> {
    Leader(LeaderGuard<'a>),
    Follower(broadcast::Receiver<Decision>),
}

impl InFlight {
    pub(crate) fn join(&self, cid: &Cid) -> Role<'_> {
        let mut calls = self.calls.lock();
        if let Some(tx) = calls.get(cid) {
            return Role::Follower(tx.subscribe());
        }

        let (tx, _) = broadcast::channel(1);
        calls.insert(cid.clone(), tx);
        Role::Leader(LeaderGuard {
            inflight: self,
            cid: cid.clone(),
            completed: false,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.calls.lock().len()
    }
}

/// Held by the request doing the traversal.
pub(crate) struct LeaderGuard<'a> {
    inflight: &'a InFlight,
    cid: Cid,
    completed: bool,
}

impl LeaderGuard<'_> {
    /// Publish the outcome to every follower and retire the entry.
    pub(crate) fn complete(mut self, decision: &Decision) {
        if let Some(tx) = self.inflight.calls.lock().remove(&self.cid) {
            // No receivers is fine: nobody was waiting
            let _ = tx.send(decision.clone());
        }
        self.completed = true;
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.inflight.calls.lock().remove(&self.cid);
        }
    }
}
