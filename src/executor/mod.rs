//! Node Executor Module
//!
//! The data store itself is an external collaborator. Everything above this module
//! only needs one capability: run one transaction against one node and get rows
//! or an error back.
//!
//! ## Contract
//! An executor begins a transaction at the requested isolation level, runs the
//! query, waits out the artificial delay, then commits or rolls back according to
//! the descriptor's commit decision. On any error it rolls back before returning,
//! so an `Err` always means the attempt left no effect. Routing, stashing and
//! replay never issue commit or rollback themselves.
//!
//! ## Submodules
//! - **`memory`**: An in-memory simulation of the three-node store with
//!   reachability and per-transaction fault injection.
//! - **`types`**: The per-transaction `ExecutionResult` reported to callers.

pub mod memory;
pub mod types;


use crate::error::Result;
use crate::routing::types::TransactionDescriptor;
use crate::topology::types::NodeId;

use async_trait::async_trait;

/// One result row, keyed by column name.
pub type Row = serde_json::Value;

#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Runs `transaction` on `node`.
    ///
    /// Returns `Ok(Some(rows))` for reads, `Ok(None)` for writes, and
    /// `Err(RouterError::Execution { .. })` after rolling back on failure.
    async fn execute_on_node(
        &self,
        node: &NodeId,
        transaction: &TransactionDescriptor,
    ) -> Result<Option<Vec<Row>>>;
}
