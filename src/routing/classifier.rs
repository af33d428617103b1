//! Query Classifier
//!
//! Derives the operation kind and the owning fragment from raw query text.
//! Only two things are inspected: the leading keyword and which fragment table
//! identifiers occur anywhere in the text. Queries are never parsed.

use super::types::{Classification, OperationKind, TransactionDescriptor};
use crate::error::{Result, RouterError};
use crate::topology::types::Topology;

use regex::Regex;
use std::sync::OnceLock;

fn leading_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\s(]*([A-Za-z]+)").unwrap())
}

/// Maps the query's leading keyword (case-insensitive) to an operation kind.
pub fn operation_kind(query: &str) -> OperationKind {
    let keyword = leading_keyword_regex()
        .captures(query)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_uppercase());

    match keyword.as_deref() {
        Some("SELECT") => OperationKind::Read,
        Some("INSERT") | Some("UPDATE") | Some("DELETE") => OperationKind::Write,
        _ => OperationKind::Unknown,
    }
}

/// Finds the single fragment table referenced by `query`.
///
/// Fails with `UnrecognizedTable` when neither or both identifiers appear.
pub fn fragment_of(query: &str, topology: &Topology) -> Result<String> {
    let lowered = query.to_lowercase();
    let matches: Vec<&str> = topology
        .fragments()
        .map(|(_, fragment)| fragment.table.as_str())
        .filter(|table| lowered.contains(&table.to_lowercase()))
        .collect();

    match matches.as_slice() {
        [table] => Ok(table.to_string()),
        [] => Err(RouterError::UnrecognizedTable(format!(
            "no fragment table in query: {}",
            query.trim()
        ))),
        _ => Err(RouterError::UnrecognizedTable(format!(
            "query references several fragment tables ({}): {}",
            matches.join(", "),
            query.trim()
        ))),
    }
}

/// Classifies a raw query: leading keyword plus referenced fragment.
pub fn classify(query: &str, topology: &Topology) -> Result<Classification> {
    Ok(Classification {
        operation_kind: operation_kind(query),
        fragment: fragment_of(query, topology)?,
    })
}

/// Operation kind of a descriptor: the declared one, else derived from the query.
pub fn descriptor_kind(descriptor: &TransactionDescriptor) -> OperationKind {
    descriptor
        .operation_kind
        .unwrap_or_else(|| operation_kind(&descriptor.query))
}

/// Fragment of a descriptor: the explicit reference when supplied, else the
/// one found in the query text.
pub fn descriptor_fragment(descriptor: &TransactionDescriptor, topology: &Topology) -> Result<String> {
    match &descriptor.fragment {
        Some(fragment) => {
            // Validate the explicit reference against the configured fragments.
            topology.owner_of(fragment)?;
            Ok(fragment.clone())
        }
        None => fragment_of(&descriptor.query, topology),
    }
}

/// Returns the descriptor with its operation kind filled in.
pub fn normalize(mut descriptor: TransactionDescriptor) -> TransactionDescriptor {
    if descriptor.operation_kind.is_none() {
        descriptor.operation_kind = Some(operation_kind(&descriptor.query));
    }
    descriptor
}
