//! HTTP Protocol Definitions
//!
//! Endpoints and Data Transfer Objects exposed to the simulation front end.
//! Request shapes accept the front end's field names (`simulationCase`,
//! `nodeStatus`) as aliases.

use crate::error::{Result, RouterError};
use crate::recovery::types::StashEntry;
use crate::routing::types::{Scenario, TransactionDescriptor};
use crate::topology::types::{NodeId, NodeStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const ENDPOINT_SIMULATE: &str = "/simulate";
pub const ENDPOINT_CRASH_RECOVERY: &str = "/simulate_crash_recovery";
pub const ENDPOINT_NODES: &str = "/nodes";
pub const ENDPOINT_NODE_STATUS: &str = "/nodes/:id/status";
pub const ENDPOINT_REPLAY: &str = "/replay/:id";
pub const ENDPOINT_REPLAY_ALL: &str = "/replay";
pub const ENDPOINT_STASH: &str = "/stash/:id";
pub const ENDPOINT_STASH_ALL: &str = "/stash";
pub const ENDPOINT_RECORDS: &str = "/records";

#[derive(Debug, Serialize, Deserialize)]
pub struct SimulateRequest {
    pub transactions: Vec<TransactionDescriptor>,
}

/// Either a tagged scenario object or a legacy string tag
/// (`normal`, `case1`, `case2`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ScenarioRequest {
    Tagged(Scenario),
    Legacy(String),
}

impl Default for ScenarioRequest {
    fn default() -> Self {
        ScenarioRequest::Tagged(Scenario::Normal)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CrashRecoveryRequest {
    #[serde(default, alias = "simulationCase")]
    pub scenario: ScenarioRequest,
    /// Per-batch status overrides, `true` meaning up.
    #[serde(default, alias = "nodeStatus")]
    pub node_status: HashMap<NodeId, bool>,
    pub transactions: Vec<TransactionDescriptor>,
}

impl CrashRecoveryRequest {
    pub fn overrides(&self) -> HashMap<NodeId, NodeStatus> {
        self.node_status
            .iter()
            .map(|(node, up)| (node.clone(), NodeStatus::from_flag(*up)))
            .collect()
    }

    /// Resolves the batch scenario. A legacy `case2` names no node, so the down
    /// fragment is taken from `node_status` (first down node by id).
    pub fn scenario(&self) -> Result<Scenario> {
        match &self.scenario {
            ScenarioRequest::Tagged(scenario) => Ok(scenario.clone()),
            ScenarioRequest::Legacy(tag) => match tag.as_str() {
                "normal" | "" => Ok(Scenario::Normal),
                "case1" | "central_down" => Ok(Scenario::CentralDown),
                "case2" | "fragment_down" => {
                    let mut down: Vec<&NodeId> = self
                        .node_status
                        .iter()
                        .filter(|(_, up)| !**up)
                        .map(|(node, _)| node)
                        .collect();
                    down.sort();
                    down.first()
                        .map(|node| Scenario::FragmentDown((*node).clone()))
                        .ok_or_else(|| {
                            RouterError::NodeDownRouting(
                                "fragment-down scenario without a down node in nodeStatus".into(),
                            )
                        })
                }
                other => Err(RouterError::NodeDownRouting(format!("unknown scenario {}", other))),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeStatusRequest {
    pub status: NodeStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeStatusResponse {
    pub node: NodeId,
    pub status: NodeStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StashResponse {
    pub node: NodeId,
    pub entries: Vec<StashEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetStashResponse {
    pub dropped: usize,
}

/// `game_id` arrives as text; an empty value means no filter.
#[derive(Debug, Deserialize)]
pub struct RecordsParams {
    pub page: Option<usize>,
    pub game_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: RouterError,
    pub message: String,
}

impl From<RouterError> for ErrorResponse {
    fn from(error: RouterError) -> Self {
        Self {
            message: error.to_string(),
            error,
        }
    }
}
