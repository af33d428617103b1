//! Deferred-write Journal
//!
//! One FIFO queue per fragment node. Entries are appended at the tail and only
//! ever leave the queue through [`Stash::remove`] (after a confirmed replay) or an
//! explicit reset. Insertion order is never changed.
//!
//! Every entry carries a stash-wide sequence number, so callers can repeat
//! transaction ids across batches and a replay still removes exactly the entry
//! it executed. A transaction id may be pending for one node only: `homes`
//! tracks which node holds each pending id and how many entries share it.
//!
//! Each queue lives behind its own `DashMap` shard lock, which is held only for the
//! duration of a single append, removal or copy. No executor call happens while
//! it is held, and the `homes` lock is never held together with a queue lock.

use super::types::{now_ms, StashEntry};
use crate::error::{Result, RouterError};
use crate::routing::types::{TransactionDescriptor, TransactionId};
use crate::topology::types::NodeId;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct Stash {
    queues: DashMap<NodeId, VecDeque<StashEntry>>,
    /// Pending transaction id -> (home node, number of entries with that id).
    homes: DashMap<TransactionId, (NodeId, usize)>,
    next_seq: AtomicU64,
}

impl Stash {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Appends `transaction` to the tail of `node`'s queue and returns the entry's
    /// sequence number.
    ///
    /// Fails with `AlreadyStashed` when the same transaction id is still pending
    /// for a different node. Repeats on the same node are separate entries.
    pub fn enqueue(&self, node: &NodeId, transaction: TransactionDescriptor) -> Result<u64> {
        let id = transaction.id;

        match self.homes.entry(id) {
            Entry::Occupied(mut home) => {
                let (home_node, count) = home.get_mut();
                if home_node != node {
                    tracing::warn!(
                        "Refusing to stash transaction {} for {}: already pending for {}",
                        id,
                        node,
                        home_node
                    );
                    return Err(RouterError::AlreadyStashed {
                        transaction_id: id,
                        node: home_node.clone(),
                    });
                }
                *count += 1;
            }
            Entry::Vacant(slot) => {
                slot.insert((node.clone(), 1));
            }
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut queue = self.queues.entry(node.clone()).or_default();
        queue.push_back(StashEntry {
            seq,
            transaction,
            home_node: node.clone(),
            enqueued_at: now_ms(),
        });

        tracing::info!(
            "Stashed transaction {} for {} as entry {} (queue length {})",
            id,
            node,
            seq,
            queue.len()
        );
        Ok(seq)
    }

    /// Ordered copy of `node`'s queue.
    pub fn peek_all(&self, node: &NodeId) -> Vec<StashEntry> {
        self.queues
            .get(node)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes the entry with sequence number `seq` from `node`'s queue.
    pub fn remove(&self, node: &NodeId, seq: u64) -> Option<StashEntry> {
        let removed = {
            let mut queue = self.queues.get_mut(node)?;
            let position = queue.iter().position(|entry| entry.seq == seq)?;
            let removed = queue.remove(position);
            tracing::debug!("Removed entry {} from {} stash ({} left)", seq, node, queue.len());
            removed
        };

        if let Some(entry) = &removed {
            self.release(entry.transaction.id);
        }
        removed
    }

    pub fn len(&self, node: &NodeId) -> usize {
        self.queues.get(node).map_or(0, |queue| queue.len())
    }

    pub fn is_empty(&self, node: &NodeId) -> bool {
        self.len(node) == 0
    }

    /// Fragment node currently holding `transaction_id`, if any.
    pub fn locate(&self, transaction_id: TransactionId) -> Option<NodeId> {
        self.homes
            .get(&transaction_id)
            .map(|home| home.value().0.clone())
    }

    /// Drops every pending entry for `node` without replaying it.
    pub fn reset(&self, node: &NodeId) -> usize {
        let drained: Vec<StashEntry> = self
            .queues
            .get_mut(node)
            .map(|mut queue| queue.drain(..).collect())
            .unwrap_or_default();

        for entry in &drained {
            self.release(entry.transaction.id);
        }

        if !drained.is_empty() {
            tracing::warn!("Reset stash for {}: dropped {} pending writes", node, drained.len());
        }
        drained.len()
    }

    /// Drops every pending entry for every node.
    pub fn reset_all(&self) -> usize {
        let nodes: Vec<NodeId> = self.queues.iter().map(|queue| queue.key().clone()).collect();
        nodes.iter().map(|node| self.reset(node)).sum()
    }

    fn release(&self, transaction_id: TransactionId) {
        if let Entry::Occupied(mut home) = self.homes.entry(transaction_id) {
            let count = &mut home.get_mut().1;
            *count = count.saturating_sub(1);
            if *count == 0 {
                home.remove();
            }
        }
    }
}

impl Default for Stash {
    fn default() -> Self {
        Self {
            queues: DashMap::new(),
            homes: DashMap::new(),
            next_seq: AtomicU64::new(1),
        }
    }
}
