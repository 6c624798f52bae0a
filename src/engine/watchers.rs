// src/engine/watchers.rs

//! Fan-out of the pending command set to drain callers.
//!
//! Each drainer gets its own `watch` channel. Sends never block and only the
//! latest pending set is kept per subscriber: intermediate reports may be
//! skipped ("last value wins").

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::engine::CommandName;

#[derive(Debug, Default)]
pub struct DrainWatchers {
    next_id: AtomicU64,
    senders: Mutex<HashMap<u64, watch::Sender<Vec<CommandName>>>>,
    /// Set once by `close_all`; later subscribers get a closed channel.
    closed: AtomicBool,
}

impl DrainWatchers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. The initial value counts as already seen, so
    /// the first `changed()` resolves on the next broadcast.
    ///
    /// After [`DrainWatchers::close_all`] the sender is dropped straight away
    /// and `changed()` fails immediately.
    pub fn subscribe(&self) -> (u64, watch::Receiver<Vec<CommandName>>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(Vec::new());
        let mut senders = self.senders.lock();
        if !self.closed.load(Ordering::Acquire) {
            senders.insert(id, tx);
        }
        (id, rx)
    }

    pub fn unsubscribe(&self, id: u64) {
        self.senders.lock().remove(&id);
    }

    /// Publish `pending` to every subscriber without blocking.
    pub fn broadcast(&self, pending: &[CommandName]) {
        for tx in self.senders.lock().values() {
            tx.send_replace(pending.to_vec());
        }
    }

    /// Drop every subscriber; their receivers observe a closed channel.
    /// Subscribers registered afterwards are closed on arrival.
    pub fn close_all(&self) {
        let mut senders = self.senders.lock();
        self.closed.store(true, Ordering::Release);
        senders.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.senders.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
