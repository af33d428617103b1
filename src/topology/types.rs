use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a configured node (e.g. `node1`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Holds the logical union of every fragment.
    Central,
    /// Owns one disjoint partition of the data.
    Fragment,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Up,
    Down,
}

impl NodeStatus {
    pub fn from_flag(up: bool) -> Self {
        if up {
            NodeStatus::Up
        } else {
            NodeStatus::Down
        }
    }

    pub fn is_up(self) -> bool {
        self == NodeStatus::Up
    }
}

/// Inclusive range over the partitioning attribute (release year).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FragmentRange {
    pub start: i64,
    pub end: i64,
}

impl FragmentRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, value: i64) -> bool {
        value >= self.start && value <= self.end
    }

    pub fn overlaps(&self, other: &FragmentRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// A horizontal fragment: the table that stores it and the range it covers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fragment {
    /// Table identifier as it appears in query text (e.g. `games_frag1`).
    pub table: String,
    pub range: FragmentRange,
}

/// Static description of one node, as read from configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeSpec {
    pub id: NodeId,
    pub role: NodeRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment: Option<Fragment>,
}

/// The fixed three-node layout: one central node and two fragment nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Topology {
    pub nodes: Vec<NodeSpec>,
}

impl Default for Topology {
    /// node1 central, node2 owns 1997-2020 (`games_frag1`), node3 owns 2021-2025 (`games_frag2`).
    fn default() -> Self {
        Self {
            nodes: vec![
                NodeSpec {
                    id: NodeId::from("node1"),
                    role: NodeRole::Central,
                    fragment: None,
                },
                NodeSpec {
                    id: NodeId::from("node2"),
                    role: NodeRole::Fragment,
                    fragment: Some(Fragment {
                        table: "games_frag1".to_string(),
                        range: FragmentRange::new(1997, 2020),
                    }),
                },
                NodeSpec {
                    id: NodeId::from("node3"),
                    role: NodeRole::Fragment,
                    fragment: Some(Fragment {
                        table: "games_frag2".to_string(),
                        range: FragmentRange::new(2021, 2025),
                    }),
                },
            ],
        }
    }
}

/// A node together with its current availability, as reported to operators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub role: NodeRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment: Option<Fragment>,
    pub status: NodeStatus,
}
