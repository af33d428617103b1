//! Topology & Node Registry Module
//!
//! Describes the fixed three-node layout of the fragmented store and tracks which
//! nodes are currently available.
//!
//! ## Layout
//! - **Central node**: holds the logical union of both fragments. Normally serves
//!   as the one-stop read replica and is the write fallback when a fragment node is down.
//! - **Fragment nodes**: each owns one disjoint range of the partitioning attribute
//!   (release year), stored in its own table (e.g. `games_frag1`, `games_frag2`).
//!
//! ## Submodules
//! - **`types`**: Node identifiers, roles, statuses, fragment ranges and the topology itself.
//! - **`registry`**: Validation, ownership lookups, status mutation and per-batch snapshots.

pub mod registry;
pub mod types;
