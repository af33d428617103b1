//! In-memory Simulated Store
//!
//! Stands in for the three database nodes. The central node hosts every fragment
//! table; each fragment node hosts only its own. Statements are interpreted just
//! far enough to make the simulation observable:
//!
//! - `SELECT` returns the rows of every referenced table (union), honouring a
//!   `game_id = N` filter, `COUNT(*) [AS alias]` and `LIMIT n [OFFSET m]`.
//! - `INSERT ... VALUES (...)` appends one row; the first value is taken as `game_id`.
//! - `UPDATE ... SET ... [WHERE game_id = N]` stamps matching rows.
//! - `DELETE ... [WHERE game_id = N]` removes matching rows.
//!
//! Writes are applied at commit time, after the artificial delay, and dropped on
//! rollback. Reachability and per-transaction failures can be injected.

use super::{NodeExecutor, Row};
use crate::error::{Result, RouterError};
use crate::routing::classifier::descriptor_kind;
use crate::routing::types::{CommitDecision, OperationKind, TransactionDescriptor, TransactionId};
use crate::topology::types::{NodeId, NodeRole, Topology};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use regex::Regex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

struct Patterns {
    game_id: Regex,
    count: Regex,
    limit: Regex,
    values: Regex,
    set: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        game_id: Regex::new(r"(?i)\bgame_id\s*=\s*'?(-?\d+)'?").unwrap(),
        count: Regex::new(r"(?i)\bCOUNT\s*\(\s*\*\s*\)(?:\s+AS\s+(\w+))?").unwrap(),
        limit: Regex::new(r"(?i)\bLIMIT\s+(\d+)(?:\s+OFFSET\s+(\d+))?").unwrap(),
        values: Regex::new(r"(?is)\bVALUES\s*\((.*)\)").unwrap(),
        set: Regex::new(r"(?is)\bSET\s+(.*?)(?:\s+WHERE\s+.*)?;?\s*$").unwrap(),
    })
}

pub struct MemoryExecutor {
    /// Node -> table -> rows, in insertion order.
    tables: DashMap<NodeId, HashMap<String, Vec<Row>>>,
    /// Every fragment table identifier, lowercased.
    known_tables: Vec<String>,
    unreachable: DashSet<NodeId>,
    /// Remaining injected failures per (node, transaction).
    faults: DashMap<(NodeId, TransactionId), usize>,
    /// Transactions whose writes were committed, per node, in commit order.
    committed: DashMap<NodeId, Vec<TransactionId>>,
}

impl MemoryExecutor {
    pub fn new(topology: &Topology) -> Arc<Self> {
        let known_tables: Vec<String> = topology
            .fragments()
            .map(|(_, fragment)| fragment.table.to_lowercase())
            .collect();

        let tables = DashMap::new();
        for node in &topology.nodes {
            let hosted: HashMap<String, Vec<Row>> = match (node.role, &node.fragment) {
                (NodeRole::Central, _) => known_tables
                    .iter()
                    .map(|table| (table.clone(), Vec::new()))
                    .collect(),
                (NodeRole::Fragment, Some(fragment)) => {
                    HashMap::from([(fragment.table.to_lowercase(), Vec::new())])
                }
                (NodeRole::Fragment, None) => HashMap::new(),
            };
            tables.insert(node.id.clone(), hosted);
        }

        Arc::new(Self {
            tables,
            known_tables,
            unreachable: DashSet::new(),
            faults: DashMap::new(),
            committed: DashMap::new(),
        })
    }

    /// Makes every call against `node` fail until it is reachable again.
    pub fn set_reachable(&self, node: &NodeId, reachable: bool) {
        if reachable {
            self.unreachable.remove(node);
        } else {
            self.unreachable.insert(node.clone());
        }
        tracing::info!("Simulated node {} reachable={}", node, reachable);
    }

    /// Fails the next `times` executions of transaction `id` on `node`.
    pub fn fail_transaction(&self, node: &NodeId, id: TransactionId, times: usize) {
        if times == 0 {
            self.faults.remove(&(node.clone(), id));
        } else {
            self.faults.insert((node.clone(), id), times);
        }
    }

    /// Transactions committed on `node`, in commit order.
    pub fn committed(&self, node: &NodeId) -> Vec<TransactionId> {
        self.committed
            .get(node)
            .map(|ids| ids.value().clone())
            .unwrap_or_default()
    }

    pub fn rows(&self, node: &NodeId, table: &str) -> Vec<Row> {
        self.tables
            .get(node)
            .and_then(|hosted| hosted.get(&table.to_lowercase()).cloned())
            .unwrap_or_default()
    }

    /// Appends rows directly, bypassing transactions. Used to load demo data.
    pub fn seed(&self, node: &NodeId, table: &str, rows: Vec<Row>) -> Result<()> {
        let mut hosted = self
            .tables
            .get_mut(node)
            .ok_or_else(|| RouterError::UnknownNode(node.clone()))?;
        let table_rows = hosted.get_mut(&table.to_lowercase()).ok_or_else(|| RouterError::Execution {
            node: node.clone(),
            message: format!("Table '{}' doesn't exist", table),
        })?;
        table_rows.extend(rows);
        Ok(())
    }

    fn take_fault(&self, node: &NodeId, id: TransactionId) -> bool {
        let key = (node.clone(), id);
        let exhausted = {
            let Some(mut remaining) = self.faults.get_mut(&key) else {
                return false;
            };
            *remaining -= 1;
            *remaining == 0
        };
        if exhausted {
            self.faults.remove(&key);
        }
        true
    }

    fn referenced_tables(&self, query: &str) -> Vec<String> {
        let lowered = query.to_lowercase();
        self.known_tables
            .iter()
            .filter(|table| lowered.contains(table.as_str()))
            .cloned()
            .collect()
    }

    fn read(&self, node: &NodeId, tables: &[String], query: &str) -> Vec<Row> {
        let p = patterns();
        let game_id = p
            .game_id
            .captures(query)
            .and_then(|caps| caps[1].parse::<i64>().ok());

        let mut rows: Vec<Row> = match self.tables.get(node) {
            Some(hosted) => tables
                .iter()
                .filter_map(|table| hosted.get(table))
                .flat_map(|table_rows| table_rows.iter().cloned())
                .filter(|row| game_id.map_or(true, |id| row["game_id"] == json!(id)))
                .collect(),
            None => Vec::new(),
        };

        if let Some(caps) = p.count.captures(query) {
            let column = caps.get(1).map_or("count", |m| m.as_str());
            let mut row = serde_json::Map::new();
            row.insert(column.to_string(), json!(rows.len()));
            return vec![Row::Object(row)];
        }

        if let Some(caps) = p.limit.captures(query) {
            let limit = caps[1].parse::<usize>().unwrap_or(usize::MAX);
            let offset = caps
                .get(2)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .unwrap_or(0);
            rows = rows.into_iter().skip(offset).take(limit).collect();
        }

        rows
    }

    fn apply_write(&self, node: &NodeId, table: &str, transaction: &TransactionDescriptor) -> Result<()> {
        let p = patterns();
        let query = transaction.query.as_str();
        let target = p
            .game_id
            .captures(query)
            .and_then(|caps| caps[1].parse::<i64>().ok());
        let matches = |row: &Row| target.map_or(true, |id| row["game_id"] == json!(id));

        let mut hosted = self
            .tables
            .get_mut(node)
            .ok_or_else(|| RouterError::UnknownNode(node.clone()))?;
        let rows = hosted.entry(table.to_string()).or_default();

        let keyword = query.trim_start().split_whitespace().next().unwrap_or("").to_ascii_uppercase();
        match keyword.as_str() {
            "INSERT" => {
                let values = p
                    .values
                    .captures(query)
                    .map(|caps| caps[1].trim().to_string())
                    .ok_or_else(|| RouterError::Execution {
                        node: node.clone(),
                        message: "INSERT without VALUES".into(),
                    })?;
                let game_id = values
                    .split(',')
                    .next()
                    .and_then(|first| first.trim().trim_matches('\'').parse::<i64>().ok());
                rows.push(json!({
                    "game_id": game_id,
                    "values": values,
                    "transaction_id": transaction.id,
                }));
            }
            "UPDATE" => {
                let assignments = p
                    .set
                    .captures(query)
                    .map(|caps| caps[1].trim().to_string())
                    .unwrap_or_default();
                for row in rows.iter_mut().filter(|row| matches(row)) {
                    row["last_update"] = json!(assignments);
                    row["updated_by"] = json!(transaction.id);
                }
            }
            "DELETE" => rows.retain(|row| !matches(row)),
            other => {
                return Err(RouterError::Execution {
                    node: node.clone(),
                    message: format!("unsupported write statement {}", other),
                });
            }
        }

        drop(hosted);
        self.committed
            .entry(node.clone())
            .or_default()
            .push(transaction.id);
        Ok(())
    }
}

#[async_trait]
impl NodeExecutor for MemoryExecutor {
    async fn execute_on_node(
        &self,
        node: &NodeId,
        transaction: &TransactionDescriptor,
    ) -> Result<Option<Vec<Row>>> {
        let fail = |message: String| RouterError::Execution {
            node: node.clone(),
            message,
        };

        tracing::debug!(
            "Executing transaction {} on {} at {}",
            transaction.id,
            node,
            transaction.isolation_level
        );

        if self.unreachable.contains(node) {
            return Err(fail(format!("node {} is unreachable", node)));
        }

        let hosted: Vec<String> = self
            .tables
            .get(node)
            .map(|hosted| hosted.keys().cloned().collect())
            .ok_or_else(|| fail(format!("node {} is not part of the store", node)))?;

        if self.take_fault(node, transaction.id) {
            return Err(fail("injected failure, transaction rolled back".into()));
        }

        let referenced = self.referenced_tables(&transaction.query);
        if referenced.is_empty() {
            return Err(fail("query references no known table".into()));
        }
        if let Some(missing) = referenced.iter().find(|table| !hosted.contains(table)) {
            return Err(fail(format!("Table '{}' doesn't exist", missing)));
        }

        let delay = if transaction.delay > 0.0 {
            Duration::try_from_secs_f64(transaction.delay)
                .map_err(|e| fail(format!("invalid delay {}s: {}", transaction.delay, e)))?
        } else {
            Duration::ZERO
        };

        match descriptor_kind(transaction) {
            OperationKind::Read => {
                let rows = self.read(node, &referenced, &transaction.query);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(Some(rows))
            }
            OperationKind::Write => {
                let [table] = referenced.as_slice() else {
                    return Err(fail("a write must reference exactly one table".into()));
                };
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                match transaction.commit_decision {
                    CommitDecision::Commit => self.apply_write(node, table, transaction)?,
                    CommitDecision::Rollback => {
                        tracing::debug!("Transaction {} rolled back on {}", transaction.id, node);
                    }
                }
                Ok(None)
            }
            OperationKind::Unknown => Err(fail(format!(
                "unsupported statement: {}",
                transaction.query.trim()
            ))),
        }
    }
}
