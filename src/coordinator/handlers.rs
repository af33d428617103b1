use super::protocol::*;
use super::service::Coordinator;
use super::types::NodeReplay;
use crate::error::RouterError;
use crate::topology::types::NodeId;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

fn error_response(error: RouterError) -> Response {
    let status = match &error {
        RouterError::UnknownNode(_) => StatusCode::NOT_FOUND,
        RouterError::NodeDownRouting(_) | RouterError::AlreadyStashed { .. } => StatusCode::CONFLICT,
        RouterError::UnknownFragment(_)
        | RouterError::UnrecognizedTable(_)
        | RouterError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::from(error))).into_response()
}

pub async fn handle_simulate(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<SimulateRequest>,
) -> Response {
    let outcome = coordinator.run_concurrent(req.transactions).await;
    (StatusCode::OK, Json(outcome)).into_response()
}

pub async fn handle_crash_recovery(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<CrashRecoveryRequest>,
) -> Response {
    let scenario = match req.scenario() {
        Ok(scenario) => scenario,
        Err(e) => {
            tracing::error!("Rejecting crash-recovery batch: {}", e);
            return error_response(e);
        }
    };
    let overrides = req.overrides();

    let outcome = coordinator
        .submit_batch(scenario, overrides, req.transactions)
        .await;
    (StatusCode::OK, Json(outcome)).into_response()
}

pub async fn handle_list_nodes(Extension(coordinator): Extension<Arc<Coordinator>>) -> Response {
    (StatusCode::OK, Json(coordinator.nodes())).into_response()
}

pub async fn handle_set_node_status(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Path(node_id): Path<String>,
    Json(req): Json<NodeStatusRequest>,
) -> Response {
    let node = NodeId(node_id);
    match coordinator.set_node_status(&node, req.status) {
        Ok(()) => (
            StatusCode::OK,
            Json(NodeStatusResponse {
                node,
                status: req.status,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn handle_replay(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Path(node_id): Path<String>,
) -> Response {
    let node = NodeId(node_id);
    match coordinator.trigger_replay(&node).await {
        Ok(report) => (StatusCode::OK, Json(NodeReplay::new(node, report))).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn handle_replay_all(Extension(coordinator): Extension<Arc<Coordinator>>) -> Response {
    let outcome = coordinator.replay_all().await;
    (StatusCode::OK, Json(outcome)).into_response()
}

pub async fn handle_inspect_stash(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Path(node_id): Path<String>,
) -> Response {
    let node = NodeId(node_id);
    match coordinator.inspect_stash(&node) {
        Ok(entries) => (StatusCode::OK, Json(StashResponse { node, entries })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn handle_reset_stash(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Path(node_id): Path<String>,
) -> Response {
    let node = NodeId(node_id);
    match coordinator.reset_stash(Some(&node)) {
        Ok(dropped) => (StatusCode::OK, Json(ResetStashResponse { dropped })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn handle_reset_all_stashes(Extension(coordinator): Extension<Arc<Coordinator>>) -> Response {
    match coordinator.reset_stash(None) {
        Ok(dropped) => (StatusCode::OK, Json(ResetStashResponse { dropped })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn handle_records(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Query(params): Query<RecordsParams>,
) -> Response {
    let game_id = match params.game_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!("Invalid game_id {:?}: {}", raw, e);
                return error_response(RouterError::InvalidRequest(format!(
                    "invalid game_id {:?}: {}",
                    raw, e
                )));
            }
        },
    };

    match coordinator
        .browse_records(params.page.unwrap_or(1), game_id)
        .await
    {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => {
            tracing::error!("Failed to browse records: {}", e);
            error_response(e)
        }
    }
}
