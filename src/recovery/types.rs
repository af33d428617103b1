use crate::executor::types::ExecutionResult;
use crate::routing::types::{TransactionDescriptor, TransactionId};
use crate::topology::types::NodeId;
use serde::{Deserialize, Serialize};

/// A write that ran on the central node while its home fragment node was down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StashEntry {
    /// Stash-wide sequence number. Unique per entry even when transaction ids repeat.
    pub seq: u64,
    pub transaction: TransactionDescriptor,
    /// The fragment node the write must eventually reach.
    pub home_node: NodeId,
    /// Timestamp (ms) when the entry was appended.
    pub enqueued_at: u64,
}

/// Result of one replay pass over a node's stash.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReplayReport {
    pub succeeded: Vec<ExecutionResult>,
    /// Entries that failed and are still stashed, in stash order.
    pub failed: Vec<ExecutionResult>,
}

impl ReplayReport {
    pub fn succeeded_ids(&self) -> Vec<TransactionId> {
        self.succeeded.iter().map(|r| r.transaction_id).collect()
    }

    pub fn failed_ids(&self) -> Vec<TransactionId> {
        self.failed.iter().map(|r| r.transaction_id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.succeeded.is_empty() && self.failed.is_empty()
    }
}

/// Helper to get the current system time in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
