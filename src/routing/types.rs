use crate::error::RouterError;
use crate::topology::types::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-assigned transaction identifier.
pub type TransactionId = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Read,
    Write,
    Unknown,
}

/// Isolation level requested for the transaction. Enforcement belongs to the data store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    #[serde(rename = "READ UNCOMMITTED")]
    ReadUncommitted,
    #[default]
    #[serde(rename = "READ COMMITTED")]
    ReadCommitted,
    #[serde(rename = "REPEATABLE READ")]
    RepeatableRead,
    #[serde(rename = "SERIALIZABLE")]
    Serializable,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        };
        f.write_str(level)
    }
}

/// What the executor does once the statement ran without error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommitDecision {
    #[default]
    Commit,
    Rollback,
}

/// Normalized representation of one incoming transaction.
///
/// Field aliases accept the request shape used by the simulation front end
/// (`node`, `isolation`, `status`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionDescriptor {
    pub id: TransactionId,
    #[serde(alias = "node")]
    pub requested_node: NodeId,
    pub query: String,
    /// Derived from the query when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_kind: Option<OperationKind>,
    /// Explicit fragment reference (table identifier). Bypasses query text inspection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,
    #[serde(default, alias = "isolation")]
    pub isolation_level: IsolationLevel,
    #[serde(default, alias = "status")]
    pub commit_decision: CommitDecision,
    /// Artificial delay in seconds applied before commit/rollback.
    #[serde(default, deserialize_with = "delay_seconds")]
    pub delay: f64,
}

impl TransactionDescriptor {
    pub fn new(id: TransactionId, requested_node: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id,
            requested_node: NodeId(requested_node.into()),
            query: query.into(),
            operation_kind: None,
            fragment: None,
            isolation_level: IsolationLevel::default(),
            commit_decision: CommitDecision::default(),
            delay: 0.0,
        }
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    pub fn with_operation_kind(mut self, kind: OperationKind) -> Self {
        self.operation_kind = Some(kind);
        self
    }

    pub fn with_commit_decision(mut self, decision: CommitDecision) -> Self {
        self.commit_decision = decision;
        self
    }

    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    pub fn with_delay(mut self, seconds: f64) -> Self {
        self.delay = seconds;
        self
    }
}

/// Accepts the delay either as a number or as a numeric string (`"2"`).
fn delay_seconds<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Delay {
        Number(f64),
        Text(String),
    }

    match Delay::deserialize(deserializer)? {
        Delay::Number(seconds) => Ok(seconds),
        Delay::Text(text) if text.trim().is_empty() => Ok(0.0),
        Delay::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Output of the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub operation_kind: OperationKind,
    /// Table identifier of the single referenced fragment.
    pub fragment: String,
}

/// Failure condition declared for a batch before any transaction is routed.
///
/// Accepts the front end's legacy tags: `case1` is a central-node outage,
/// `case2` a fragment-node outage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", content = "node", rename_all = "snake_case")]
pub enum Scenario {
    #[default]
    Normal,
    #[serde(alias = "case1")]
    CentralDown,
    #[serde(alias = "case2")]
    FragmentDown(NodeId),
}

/// The router's decision for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchPlan {
    /// Run on the requested node.
    DirectExecute(NodeId),
    /// Run on a different node than requested.
    RedirectExecute(NodeId),
    /// Run on `exec`; when that succeeds, defer the write to `stash` for replay.
    FallbackExecuteAndStash { exec: NodeId, stash: NodeId },
    Reject(RouterError),
}

impl DispatchPlan {
    /// Node the transaction executes on, if any.
    pub fn target(&self) -> Option<&NodeId> {
        match self {
            DispatchPlan::DirectExecute(node) | DispatchPlan::RedirectExecute(node) => Some(node),
            DispatchPlan::FallbackExecuteAndStash { exec, .. } => Some(exec),
            DispatchPlan::Reject(_) => None,
        }
    }
}
