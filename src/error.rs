//! Routing & Recovery Errors
//!
//! Every failure a single transaction can run into is one of these variants.
//! Errors are reported per transaction and never abort a batch or a replay pass.

use crate::topology::types::NodeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RouterError>;

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum RouterError {
    /// A fragment reference (table identifier or range value) has no owning node.
    #[error("unknown fragment: {0}")]
    UnknownFragment(String),

    /// The query references neither or both fragment tables.
    #[error("unrecognized table reference in query: {0}")]
    UnrecognizedTable(String),

    /// No fallback rule applies for the current scenario and node combination.
    #[error("no route to a live node: {0}")]
    NodeDownRouting(String),

    /// The executor failed; the attempt was rolled back.
    #[error("execution failed on {node}: {message}")]
    Execution { node: NodeId, message: String },

    /// One stash entry failed during replay.
    #[error("replay of transaction {transaction_id} on {node} failed: {message}")]
    Replay {
        node: NodeId,
        transaction_id: u64,
        message: String,
    },

    /// The transaction id is already pending in another node's stash.
    #[error("transaction {transaction_id} is already stashed for {node}")]
    AlreadyStashed { transaction_id: u64, node: NodeId },

    /// A request parameter could not be interpreted.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// Invalid static topology. Fatal at startup.
    #[error("invalid topology: {0}")]
    Topology(String),
}
