use axum::{
    Router,
    extract::Extension,
    routing::{delete, get, post},
};
use clap::Parser;
use fragment_router::config::Args;
use fragment_router::coordinator::handlers::*;
use fragment_router::coordinator::protocol::*;
use fragment_router::coordinator::service::Coordinator;
use fragment_router::executor::memory::MemoryExecutor;
use fragment_router::topology::registry::NodeRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.max_level()?)
        .init();

    // 1. Topology and node registry:
    let topology = args.load_topology()?;
    let executor = MemoryExecutor::new(&topology);
    let registry = NodeRegistry::new(topology)?;

    for node in registry.members() {
        tracing::info!(
            "  - {} role={:?} fragment={:?} status={:?}",
            node.id,
            node.role,
            node.fragment.as_ref().map(|f| f.table.as_str()),
            node.status
        );
    }

    // 2. Coordinator (router, stash, replayer):
    let coordinator = Coordinator::new(registry, executor);

    // 3. HTTP Router:
    let app = Router::new()
        .route(ENDPOINT_SIMULATE, post(handle_simulate))
        .route(ENDPOINT_CRASH_RECOVERY, post(handle_crash_recovery))
        .route(ENDPOINT_NODES, get(handle_list_nodes))
        .route(ENDPOINT_NODE_STATUS, post(handle_set_node_status))
        .route(ENDPOINT_REPLAY, post(handle_replay))
        .route(ENDPOINT_REPLAY_ALL, post(handle_replay_all))
        .route(
            ENDPOINT_STASH,
            get(handle_inspect_stash).delete(handle_reset_stash),
        )
        .route(ENDPOINT_STASH_ALL, delete(handle_reset_all_stashes))
        .route(ENDPOINT_RECORDS, get(handle_records))
        .layer(Extension(coordinator));

    // 4. Start HTTP server:
    tracing::info!("HTTP server listening on {}", args.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
