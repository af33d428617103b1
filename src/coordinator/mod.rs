//! Coordinator Module
//!
//! Process-wide entry point that ties the topology, router, executor and
//! recovery layers together and exposes them over HTTP.
//!
//! ## Submodules
//! - **`service`**: The `Coordinator` (batch submission, node status, replay, stash, records).
//! - **`handlers`**: Axum handlers wrapping the service.
//! - **`protocol`**: Endpoint paths and request/response DTOs.
//! - **`records`**: Query builders for the paginated combined view.
//! - **`types`**: Batch outcomes and record pages.

pub mod handlers;
pub mod protocol;
pub mod records;
pub mod service;
pub mod types;
