//! Node Registry
//!
//! Holds the static three-node topology together with the mutable up/down status
//! of every node. Status only ever changes through [`NodeRegistry::set_status`];
//! routing and replay read it but never write it.
//!
//! Batches route against a [`RegistrySnapshot`], an immutable copy of the statuses
//! taken once before the first transaction is routed.

use super::types::*;
use crate::error::{Result, RouterError};

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

impl Topology {
    /// Checks the layout invariants: one central node, two fragment nodes,
    /// unique ids, disjoint contiguous ranges and unambiguous table identifiers.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for node in &self.nodes {
            if !seen.insert(&node.id) {
                return Err(RouterError::Topology(format!("duplicate node id {}", node.id)));
            }
            match (node.role, &node.fragment) {
                (NodeRole::Central, Some(_)) => {
                    return Err(RouterError::Topology(format!(
                        "central node {} must not own a fragment",
                        node.id
                    )));
                }
                (NodeRole::Fragment, None) => {
                    return Err(RouterError::UnknownFragment(format!(
                        "fragment node {} has no fragment configured",
                        node.id
                    )));
                }
                _ => {}
            }
        }

        let central_count = self
            .nodes
            .iter()
            .filter(|node| node.role == NodeRole::Central)
            .count();
        if central_count != 1 {
            return Err(RouterError::Topology(format!(
                "expected exactly one central node, found {}",
                central_count
            )));
        }

        let mut fragments: Vec<&Fragment> = self.fragments().map(|(_, fragment)| fragment).collect();
        if fragments.len() != 2 {
            return Err(RouterError::Topology(format!(
                "expected exactly two fragment nodes, found {}",
                fragments.len()
            )));
        }

        for fragment in &fragments {
            if fragment.table.trim().is_empty() {
                return Err(RouterError::Topology("empty fragment table identifier".into()));
            }
            if fragment.range.start > fragment.range.end {
                return Err(RouterError::Topology(format!(
                    "fragment {} has an empty range {}..={}",
                    fragment.table, fragment.range.start, fragment.range.end
                )));
            }
        }

        // Substring classification needs identifiers that cannot match each other.
        let (a, b) = (&fragments[0].table, &fragments[1].table);
        if a.contains(b.as_str()) || b.contains(a.as_str()) {
            return Err(RouterError::Topology(format!(
                "fragment tables {} and {} are ambiguous",
                a, b
            )));
        }

        fragments.sort_by_key(|fragment| fragment.range.start);
        let (lower, upper) = (fragments[0], fragments[1]);
        if lower.range.overlaps(&upper.range) {
            return Err(RouterError::Topology(format!(
                "fragment ranges of {} and {} overlap",
                lower.table, upper.table
            )));
        }
        if lower.range.end + 1 != upper.range.start {
            return Err(RouterError::Topology(format!(
                "fragment ranges leave a gap between {} and {}",
                lower.range.end, upper.range.start
            )));
        }

        Ok(())
    }

    pub fn central(&self) -> Option<&NodeId> {
        self.nodes
            .iter()
            .find(|node| node.role == NodeRole::Central)
            .map(|node| &node.id)
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.iter().any(|node| &node.id == node_id)
    }

    pub fn is_central(&self, node_id: &NodeId) -> bool {
        self.nodes
            .iter()
            .any(|node| &node.id == node_id && node.role == NodeRole::Central)
    }

    /// Iterates `(owner, fragment)` pairs in configuration order.
    pub fn fragments(&self) -> impl Iterator<Item = (&NodeId, &Fragment)> {
        self.nodes
            .iter()
            .filter_map(|node| node.fragment.as_ref().map(|fragment| (&node.id, fragment)))
    }

    /// Static lookup from a fragment's table identifier to the node owning it.
    pub fn owner_of(&self, fragment_ref: &str) -> Result<NodeId> {
        self.fragments()
            .find(|(_, fragment)| fragment.table.eq_ignore_ascii_case(fragment_ref))
            .map(|(owner, _)| owner.clone())
            .ok_or_else(|| RouterError::UnknownFragment(fragment_ref.to_string()))
    }

    /// Range lookup: the node whose fragment covers `value`.
    pub fn owner_of_value(&self, value: i64) -> Result<NodeId> {
        self.fragments()
            .find(|(_, fragment)| fragment.range.contains(value))
            .map(|(owner, _)| owner.clone())
            .ok_or_else(|| RouterError::UnknownFragment(value.to_string()))
    }
}

/// Process-wide registry: static topology plus live node status.
pub struct NodeRegistry {
    topology: Arc<Topology>,
    central: NodeId,
    statuses: DashMap<NodeId, NodeStatus>,
}

impl NodeRegistry {
    /// Validates the topology and starts every node in the `Up` state.
    pub fn new(topology: Topology) -> Result<Arc<Self>> {
        topology.validate()?;

        let central = topology
            .central()
            .cloned()
            .ok_or_else(|| RouterError::Topology("no central node".into()))?;

        let statuses = DashMap::new();
        for node in &topology.nodes {
            statuses.insert(node.id.clone(), NodeStatus::Up);
        }

        tracing::info!(
            "Node registry initialised: central={} fragments=[{}]",
            central,
            topology
                .fragments()
                .map(|(owner, fragment)| format!(
                    "{}:{}({}-{})",
                    owner, fragment.table, fragment.range.start, fragment.range.end
                ))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Arc::new(Self {
            topology: Arc::new(topology),
            central,
            statuses,
        }))
    }

    /// Marks a node up or down. Idempotent; never touches stashed transactions.
    pub fn set_status(&self, node_id: &NodeId, status: NodeStatus) -> Result<()> {
        let mut current = self
            .statuses
            .get_mut(node_id)
            .ok_or_else(|| RouterError::UnknownNode(node_id.clone()))?;

        if *current != status {
            tracing::info!("Node {} is now {:?} (was {:?})", node_id, status, *current);
            *current = status;
        } else {
            tracing::debug!("Node {} already {:?}", node_id, status);
        }
        Ok(())
    }

    pub fn status(&self, node_id: &NodeId) -> Option<NodeStatus> {
        self.statuses.get(node_id).map(|entry| *entry.value())
    }

    pub fn is_up(&self, node_id: &NodeId) -> bool {
        self.status(node_id).is_some_and(NodeStatus::is_up)
    }

    pub fn is_central(&self, node_id: &NodeId) -> bool {
        &self.central == node_id
    }

    pub fn central(&self) -> &NodeId {
        &self.central
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.topology.contains(node_id)
    }

    pub fn owner_of(&self, fragment_ref: &str) -> Result<NodeId> {
        self.topology.owner_of(fragment_ref)
    }

    pub fn owner_of_value(&self, value: i64) -> Result<NodeId> {
        self.topology.owner_of_value(value)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Every configured node with its current status, in configuration order.
    pub fn members(&self) -> Vec<Node> {
        self.topology
            .nodes
            .iter()
            .map(|spec| Node {
                id: spec.id.clone(),
                role: spec.role,
                fragment: spec.fragment.clone(),
                status: self.status(&spec.id).unwrap_or_default(),
            })
            .collect()
    }

    /// Copies the current statuses, applying per-batch overrides on top.
    ///
    /// Overrides only affect the returned snapshot; the registry itself is unchanged.
    /// Overrides naming unknown nodes are ignored.
    pub fn snapshot(&self, overrides: &HashMap<NodeId, NodeStatus>) -> RegistrySnapshot {
        let mut statuses: HashMap<NodeId, NodeStatus> = self
            .statuses
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();

        for (node_id, status) in overrides {
            if let Some(current) = statuses.get_mut(node_id) {
                *current = *status;
            } else {
                tracing::warn!("Ignoring status override for unknown node {}", node_id);
            }
        }

        RegistrySnapshot {
            topology: self.topology.clone(),
            central: self.central.clone(),
            statuses,
        }
    }
}

/// Immutable, consistent view of the registry used to route one batch.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    topology: Arc<Topology>,
    central: NodeId,
    statuses: HashMap<NodeId, NodeStatus>,
}

impl RegistrySnapshot {
    pub fn is_up(&self, node_id: &NodeId) -> bool {
        self.statuses
            .get(node_id)
            .is_some_and(|status| status.is_up())
    }

    pub fn is_central(&self, node_id: &NodeId) -> bool {
        &self.central == node_id
    }

    pub fn central(&self) -> &NodeId {
        &self.central
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.topology.contains(node_id)
    }

    pub fn owner_of(&self, fragment_ref: &str) -> Result<NodeId> {
        self.topology.owner_of(fragment_ref)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }
}
