//! Deferred-write Recovery Module
//!
//! When a fragment node is down, writes addressed to it run on the central node
//! (so they are visible) and are parked here until the node comes back.
//!
//! ## Lifecycle of a stashed write
//! 1. **Stash**: appended to `stash[node]` only after the central-node execution succeeded.
//! 2. **Wait**: node status changes never touch the stash.
//! 3. **Replay**: an explicit replay call runs pending entries on the recovered node
//!    in order; successes are removed, failures stay in place for the next pass.
//!
//! ## Submodules
//! - **`stash`**: Per-node FIFO queues.
//! - **`replayer`**: Ordered, continue-on-failure drain of one queue.
//! - **`types`**: Stash entries and replay reports.

pub mod replayer;
pub mod stash;
pub mod types;

#[cfg(test)]
mod tests;
