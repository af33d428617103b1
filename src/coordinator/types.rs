use crate::executor::types::ExecutionResult;
use crate::executor::Row;
use crate::recovery::types::ReplayReport;
use crate::topology::types::NodeId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// No transaction in the batch errored.
    Success,
    /// At least one transaction errored; the others still ran.
    PartialSuccess,
}

/// Aggregated outcome of one submitted batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    pub status: BatchStatus,
    /// Successful transactions, ordered by transaction id.
    pub results: Vec<ExecutionResult>,
    /// Rejected or failed transactions, ordered by transaction id.
    pub errors: Vec<ExecutionResult>,
}

impl BatchOutcome {
    pub fn from_results(batch_id: Uuid, outcomes: Vec<ExecutionResult>) -> Self {
        let (mut errors, mut results): (Vec<_>, Vec<_>) =
            outcomes.into_iter().partition(ExecutionResult::is_error);
        results.sort_by_key(|r| r.transaction_id);
        errors.sort_by_key(|r| r.transaction_id);

        let status = if errors.is_empty() {
            BatchStatus::Success
        } else {
            BatchStatus::PartialSuccess
        };

        Self {
            batch_id,
            status,
            results,
            errors,
        }
    }
}

/// Replay outcome for one node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeReplay {
    pub node: NodeId,
    pub succeeded: Vec<ExecutionResult>,
    pub failed: Vec<ExecutionResult>,
}

impl NodeReplay {
    pub fn new(node: NodeId, report: ReplayReport) -> Self {
        Self {
            node,
            succeeded: report.succeeded,
            failed: report.failed,
        }
    }
}

/// Outcome of replaying every fragment node's stash in one call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayAllOutcome {
    /// `partial_success` when any entry failed or a down node still holds entries.
    pub status: BatchStatus,
    /// Fragment nodes that were up, in id order.
    pub nodes: Vec<NodeReplay>,
    /// Fragment nodes skipped because they are marked down, with pending entries left.
    pub skipped: Vec<NodeId>,
}

/// One page of the combined (all fragments) view served by the central node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordsPage {
    pub records: Vec<Row>,
    pub total_records: u64,
    pub page: usize,
    pub total_pages: u64,
}
