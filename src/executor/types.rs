use super::Row;
use crate::error::RouterError;
use crate::routing::types::TransactionId;
use crate::topology::types::NodeId;
use serde::{Deserialize, Serialize};

/// Outcome of executing one transaction on one node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    pub transaction_id: TransactionId,
    /// Node the transaction ran on; `None` when it was rejected before execution.
    pub executed_node: Option<NodeId>,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Row>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RouterError>,
    pub note: String,
}

impl ExecutionResult {
    pub fn success(
        transaction_id: TransactionId,
        node: &NodeId,
        query: &str,
        rows: Option<Vec<Row>>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            transaction_id,
            executed_node: Some(node.clone()),
            query: query.to_string(),
            rows,
            error: None,
            note: note.into(),
        }
    }

    pub fn failure(
        transaction_id: TransactionId,
        node: Option<&NodeId>,
        query: &str,
        error: RouterError,
        note: impl Into<String>,
    ) -> Self {
        Self {
            transaction_id,
            executed_node: node.cloned(),
            query: query.to_string(),
            rows: None,
            error: Some(error),
            note: note.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
