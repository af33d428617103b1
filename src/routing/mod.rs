//! Routing Module
//!
//! Decides where each transaction actually executes given the failure scenario
//! declared for its batch.
//!
//! ## Pipeline
//! 1. **Classify**: the leading keyword gives the operation kind; the referenced
//!    table identifier gives the owning fragment.
//! 2. **Route**: a single decision table maps `(snapshot, scenario, descriptor)`
//!    to a `DispatchPlan`.
//!
//! The router is pure. Executing the plan and stashing deferred writes is the
//! coordinator's job.

pub mod classifier;
pub mod router;
pub mod types;
