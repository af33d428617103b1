//! Stash Replayer
//!
//! Drains one node's stash against that node once an operator has marked it up.
//!
//! A pass works on a copy of the queue taken at the start, so writes stashed while
//! the pass runs wait for the next one. Entries are executed strictly in FIFO
//! order; a success removes exactly that entry (by sequence number), a failure
//! leaves it where it is and the pass moves on to the next entry. An entry that
//! an explicit reset dropped mid-pass has still been applied once; that case is
//! logged.
//!
//! Passes over the same node are serialized so two concurrent replays never run
//! the same entry side by side.

use super::stash::Stash;
use super::types::ReplayReport;
use crate::error::RouterError;
use crate::executor::types::ExecutionResult;
use crate::executor::NodeExecutor;
use crate::topology::types::NodeId;

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Replayer {
    stash: Arc<Stash>,
    executor: Arc<dyn NodeExecutor>,
    passes: DashMap<NodeId, Arc<Mutex<()>>>,
}

impl Replayer {
    pub fn new(stash: Arc<Stash>, executor: Arc<dyn NodeExecutor>) -> Self {
        Self {
            stash,
            executor,
            passes: DashMap::new(),
        }
    }

    /// Replays `node`'s stash. The caller must already have checked that `node` is up.
    pub async fn replay(&self, node: &NodeId) -> ReplayReport {
        let pass = self.passes.entry(node.clone()).or_default().clone();
        let _guard = pass.lock().await;

        let pending = self.stash.peek_all(node);
        if pending.is_empty() {
            tracing::debug!("Nothing stashed for {}", node);
            return ReplayReport::default();
        }

        tracing::info!("Replaying {} stashed transactions on {}", pending.len(), node);

        let mut report = ReplayReport::default();
        for entry in pending {
            let transaction = &entry.transaction;

            match self.executor.execute_on_node(node, transaction).await {
                Ok(rows) => {
                    if self.stash.remove(node, entry.seq).is_none() {
                        tracing::warn!(
                            "Transaction {} (entry {}) was applied on {} but had already left the stash",
                            transaction.id,
                            entry.seq,
                            node
                        );
                    }
                    tracing::info!("Replayed transaction {} on {}", transaction.id, node);
                    report.succeeded.push(ExecutionResult::success(
                        transaction.id,
                        node,
                        &transaction.query,
                        rows,
                        format!("Replayed on {}.", node),
                    ));
                }
                Err(e) => {
                    tracing::warn!(
                        "Replay of transaction {} on {} failed, keeping it stashed: {}",
                        transaction.id,
                        node,
                        e
                    );
                    let message = match e {
                        RouterError::Execution { message, .. } => message,
                        other => other.to_string(),
                    };
                    report.failed.push(ExecutionResult::failure(
                        transaction.id,
                        Some(node),
                        &transaction.query,
                        RouterError::Replay {
                            node: node.clone(),
                            transaction_id: transaction.id,
                            message,
                        },
                        "Still stashed; will be retried on the next replay.",
                    ));
                }
            }
        }

        tracing::info!(
            "Replay on {} finished: {} succeeded, {} failed, {} still stashed",
            node,
            report.succeeded.len(),
            report.failed.len(),
            self.stash.len(node)
        );

        report
    }
}
