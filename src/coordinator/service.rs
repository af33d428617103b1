//! Coordinator Service
//!
//! The surface exposed to the HTTP layer. Owns the process-wide registry and
//! stash and wires the router, executor and replayer together.
//!
//! ## Batch flow
//! 1. Take one registry snapshot for the whole batch (with per-batch overrides).
//! 2. Normalize and route every transaction. Routing is pure and lock-free.
//! 3. Spawn one task per transaction to execute its plan. Executor calls never
//!    run under the stash lock.
//! 4. For `FallbackExecuteAndStash`, append to the stash only after the central
//!    node reported success.
//! 5. Aggregate: `success` when nothing errored, `partial_success` otherwise.

use super::records;
use super::types::{BatchOutcome, BatchStatus, NodeReplay, RecordsPage, ReplayAllOutcome};
use crate::error::{Result, RouterError};
use crate::executor::types::ExecutionResult;
use crate::executor::NodeExecutor;
use crate::recovery::replayer::Replayer;
use crate::recovery::stash::Stash;
use crate::recovery::types::{ReplayReport, StashEntry};
use crate::routing::classifier::normalize;
use crate::routing::router::route;
use crate::routing::types::{DispatchPlan, Scenario, TransactionDescriptor};
use crate::topology::registry::NodeRegistry;
use crate::topology::types::{Node, NodeId, NodeStatus};

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub struct Coordinator {
    registry: Arc<NodeRegistry>,
    stash: Arc<Stash>,
    executor: Arc<dyn NodeExecutor>,
    replayer: Replayer,
}

impl Coordinator {
    pub fn new(registry: Arc<NodeRegistry>, executor: Arc<dyn NodeExecutor>) -> Arc<Self> {
        let stash = Stash::new();
        let replayer = Replayer::new(stash.clone(), executor.clone());

        Arc::new(Self {
            registry,
            stash,
            executor,
            replayer,
        })
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn stash(&self) -> &Arc<Stash> {
        &self.stash
    }

    /// Routes and executes a batch under the declared scenario.
    ///
    /// `overrides` adjust node status for this batch only. One transaction's
    /// failure never affects another's.
    pub async fn submit_batch(
        self: &Arc<Self>,
        scenario: Scenario,
        overrides: HashMap<NodeId, NodeStatus>,
        transactions: Vec<TransactionDescriptor>,
    ) -> BatchOutcome {
        let batch_id = Uuid::new_v4();
        let snapshot = self.registry.snapshot(&overrides);

        tracing::info!(
            "Batch {}: {} transactions under {:?}",
            batch_id,
            transactions.len(),
            scenario
        );

        let mut handles = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            let transaction = normalize(transaction);
            let plan = route(&snapshot, &scenario, &transaction);

            let id = transaction.id;
            let query = transaction.query.clone();
            let target = plan
                .target()
                .cloned()
                .unwrap_or_else(|| transaction.requested_node.clone());
            let coordinator = self.clone();
            let handle =
                tokio::spawn(async move { coordinator.dispatch(plan, transaction).await });
            handles.push((id, query, target, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (id, query, target, handle) in handles {
            match handle.await {
                Ok(result) => outcomes.push(result),
                Err(e) => {
                    tracing::error!("Batch {}: worker for transaction {} crashed: {}", batch_id, id, e);
                    outcomes.push(ExecutionResult::failure(
                        id,
                        Some(&target),
                        &query,
                        RouterError::Execution {
                            node: target.clone(),
                            message: format!("worker crashed: {}", e),
                        },
                        "Worker crashed before reporting a result.",
                    ));
                }
            }
        }

        let outcome = BatchOutcome::from_results(batch_id, outcomes);
        tracing::info!(
            "Batch {} finished: {:?} ({} ok, {} errors)",
            batch_id,
            outcome.status,
            outcome.results.len(),
            outcome.errors.len()
        );
        outcome
    }

    /// Plain concurrency simulation: every transaction runs on the node it names.
    pub async fn run_concurrent(self: &Arc<Self>, transactions: Vec<TransactionDescriptor>) -> BatchOutcome {
        self.submit_batch(Scenario::Normal, HashMap::new(), transactions)
            .await
    }

    /// Executes one routed transaction.
    async fn dispatch(&self, plan: DispatchPlan, transaction: TransactionDescriptor) -> ExecutionResult {
        let requested = &transaction.requested_node;

        match plan {
            DispatchPlan::DirectExecute(node) => {
                self.execute(&node, &transaction, format!("Query was run on {}.", node))
                    .await
            }
            DispatchPlan::RedirectExecute(node) => {
                let note = format!(
                    "{} is unavailable; query was run on {} instead.",
                    requested, node
                );
                self.execute(&node, &transaction, note).await
            }
            DispatchPlan::FallbackExecuteAndStash { exec, stash } => {
                let note = format!(
                    "{} is down; write was run on {} and stashed for replay on {}.",
                    stash, exec, stash
                );
                if let Some(home) = self.stash.locate(transaction.id).filter(|home| home != &stash) {
                    let reason = RouterError::AlreadyStashed {
                        transaction_id: transaction.id,
                        node: home,
                    };
                    tracing::warn!("Transaction {} rejected: {}", transaction.id, reason);
                    return ExecutionResult::failure(
                        transaction.id,
                        None,
                        &transaction.query,
                        reason,
                        "Rejected before execution.",
                    );
                }

                let result = self.execute(&exec, &transaction, note).await;
                if !result.is_error() {
                    let (id, query) = (transaction.id, transaction.query.clone());
                    if let Err(e) = self.stash.enqueue(&stash, transaction) {
                        tracing::error!("Transaction {} ran on {} but was not stashed: {}", id, exec, e);
                        return ExecutionResult::failure(
                            id,
                            Some(&exec),
                            &query,
                            e,
                            format!("Ran on {} but could not be stashed for {}.", exec, stash),
                        );
                    }
                } else {
                    tracing::warn!(
                        "Transaction {} failed on fallback node {}; not stashed",
                        transaction.id,
                        exec
                    );
                }
                result
            }
            DispatchPlan::Reject(reason) => {
                tracing::warn!("Transaction {} rejected: {}", transaction.id, reason);
                ExecutionResult::failure(
                    transaction.id,
                    None,
                    &transaction.query,
                    reason,
                    "Rejected before execution.",
                )
            }
        }
    }

    async fn execute(
        &self,
        node: &NodeId,
        transaction: &TransactionDescriptor,
        note: String,
    ) -> ExecutionResult {
        match self.executor.execute_on_node(node, transaction).await {
            Ok(rows) => ExecutionResult::success(transaction.id, node, &transaction.query, rows, note),
            Err(e) => {
                tracing::warn!("Transaction {} failed on {}: {}", transaction.id, node, e);
                let error = match e {
                    RouterError::Execution { .. } => e,
                    other => RouterError::Execution {
                        node: node.clone(),
                        message: other.to_string(),
                    },
                };
                ExecutionResult::failure(
                    transaction.id,
                    Some(node),
                    &transaction.query,
                    error,
                    "Rolled back.",
                )
            }
        }
    }

    /// Operator call: marks a node up or down. Never touches the stash.
    pub fn set_node_status(&self, node: &NodeId, status: NodeStatus) -> Result<()> {
        self.registry.set_status(node, status)
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.registry.members()
    }

    /// Replays `node`'s stash. The node must be configured and marked up.
    pub async fn trigger_replay(&self, node: &NodeId) -> Result<ReplayReport> {
        if !self.registry.contains(node) {
            return Err(RouterError::UnknownNode(node.clone()));
        }
        if !self.registry.is_up(node) {
            return Err(RouterError::NodeDownRouting(format!(
                "cannot replay onto {} while it is marked down",
                node
            )));
        }

        Ok(self.replayer.replay(node).await)
    }

    /// Replays every fragment node that is up, in id order. Down nodes keep
    /// their stash and are listed as skipped when it is not empty.
    pub async fn replay_all(&self) -> ReplayAllOutcome {
        let mut fragments: Vec<NodeId> = self
            .registry
            .topology()
            .fragments()
            .map(|(id, _)| id.clone())
            .collect();
        fragments.sort();

        let mut nodes = Vec::new();
        let mut skipped = Vec::new();
        for node in fragments {
            if !self.registry.is_up(&node) {
                if !self.stash.is_empty(&node) {
                    tracing::warn!(
                        "Skipping replay on {}: marked down with {} pending writes",
                        node,
                        self.stash.len(&node)
                    );
                    skipped.push(node);
                }
                continue;
            }
            let report = self.replayer.replay(&node).await;
            nodes.push(NodeReplay::new(node, report));
        }

        let clean = skipped.is_empty() && nodes.iter().all(|n| n.failed.is_empty());
        ReplayAllOutcome {
            status: if clean {
                BatchStatus::Success
            } else {
                BatchStatus::PartialSuccess
            },
            nodes,
            skipped,
        }
    }

    /// Pending deferred writes for `node`, oldest first.
    pub fn inspect_stash(&self, node: &NodeId) -> Result<Vec<StashEntry>> {
        if !self.registry.contains(node) {
            return Err(RouterError::UnknownNode(node.clone()));
        }
        Ok(self.stash.peek_all(node))
    }

    /// Explicitly discards pending writes for one node, or for all nodes.
    pub fn reset_stash(&self, node: Option<&NodeId>) -> Result<usize> {
        match node {
            Some(node) if !self.registry.contains(node) => Err(RouterError::UnknownNode(node.clone())),
            Some(node) => Ok(self.stash.reset(node)),
            None => Ok(self.stash.reset_all()),
        }
    }

    /// One page of the union of every fragment table, read from the central node.
    pub async fn browse_records(&self, page: usize, game_id: Option<i64>) -> Result<RecordsPage> {
        let central = self.registry.central().clone();
        if !self.registry.is_up(&central) {
            return Err(RouterError::NodeDownRouting(format!(
                "combined records are served by {} which is down",
                central
            )));
        }

        let topology = self.registry.topology();
        let page = page.max(1);

        let count = TransactionDescriptor::new(0, central.as_str(), records::total_records_query(topology, game_id));
        let rows = self.executor.execute_on_node(&central, &count).await?;
        let total_records = rows
            .as_ref()
            .and_then(|rows| rows.first())
            .and_then(|row| row["total_records"].as_u64())
            .unwrap_or(0);

        let fetch = TransactionDescriptor::new(0, central.as_str(), records::page_query(topology, game_id, page));
        let records = self
            .executor
            .execute_on_node(&central, &fetch)
            .await?
            .unwrap_or_default();

        Ok(RecordsPage {
            records,
            total_records,
            page,
            total_pages: records::total_pages(total_records),
        })
    }
}
