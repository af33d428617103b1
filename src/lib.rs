//! Fragment-aware Transaction Router Library
//!
//! Routes transactions across one central node and two fragment nodes under a
//! declared failure scenario, defers writes addressed to a down fragment node,
//! and replays them once the node is back.
//!
//! ## Architecture Modules
//!
//! - **`topology`**: Static node layout, fragment ranges and the live node registry.
//! - **`routing`**: Transaction descriptors, the query classifier and the pure
//!   failure-aware router.
//! - **`executor`**: The node execution seam (`NodeExecutor`) and an in-memory
//!   simulated store.
//! - **`recovery`**: The per-node deferred-write stash and its replayer.
//! - **`coordinator`**: The process-wide service and its HTTP surface.
//! - **`config`**: Command-line configuration for the binary.
//! - **`error`**: The shared error taxonomy.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod recovery;
pub mod routing;
pub mod topology;
