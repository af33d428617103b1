//! End-to-end crash-recovery walk-through over the default three-node layout:
//! node2 goes down, a write addressed to it lands on node1 and is stashed, node2
//! comes back and the stash is replayed onto it.

use fragment_router::coordinator::service::Coordinator;
use fragment_router::coordinator::types::BatchStatus;
use fragment_router::executor::memory::MemoryExecutor;
use fragment_router::routing::types::{OperationKind, Scenario, TransactionDescriptor};
use fragment_router::topology::registry::NodeRegistry;
use fragment_router::topology::types::{NodeId, NodeStatus, Topology};
use std::collections::HashMap;

#[tokio::test]
async fn test_fragment_outage_and_replay() {
    // ARRANGE
    let topology = Topology::default();
    let executor = MemoryExecutor::new(&topology);
    let registry = NodeRegistry::new(topology).unwrap();
    let coordinator = Coordinator::new(registry, executor.clone());

    let node1 = NodeId::from("node1");
    let node2 = NodeId::from("node2");

    coordinator.set_node_status(&node2, NodeStatus::Down).unwrap();

    let write = TransactionDescriptor::new(
        1,
        "node2",
        "INSERT INTO games_frag1 VALUES (1, 'Half-Life', 1998)",
    )
    .with_operation_kind(OperationKind::Write);

    // ACT
    let outcome = coordinator
        .submit_batch(Scenario::FragmentDown(node2.clone()), HashMap::new(), vec![write])
        .await;

    // ASSERT
    assert_eq!(outcome.status, BatchStatus::Success);
    assert_eq!(outcome.results[0].executed_node, Some(node1.clone()));

    let stashed = coordinator.inspect_stash(&node2).unwrap();
    assert_eq!(stashed.len(), 1);
    assert_eq!(stashed[0].transaction.id, 1);
    assert_eq!(stashed[0].home_node, node2);
    assert_eq!(executor.rows(&node1, "games_frag1").len(), 1);
    assert!(executor.rows(&node2, "games_frag1").is_empty());

    // Bringing the node back alone does not drain anything.
    coordinator.set_node_status(&node2, NodeStatus::Up).unwrap();
    assert_eq!(coordinator.inspect_stash(&node2).unwrap().len(), 1);

    // ACT
    let report = coordinator.trigger_replay(&node2).await.unwrap();

    // ASSERT
    assert_eq!(report.succeeded_ids(), vec![1]);
    assert!(report.failed.is_empty());
    assert!(coordinator.inspect_stash(&node2).unwrap().is_empty());
    assert_eq!(executor.committed(&node2), vec![1]);
    assert_eq!(executor.rows(&node2, "games_frag1").len(), 1);

    // A second pass has nothing left to do.
    let again = coordinator.trigger_replay(&node2).await.unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn test_central_outage_routes_by_fragment() {
    let topology = Topology::default();
    let executor = MemoryExecutor::new(&topology);
    let registry = NodeRegistry::new(topology).unwrap();
    let coordinator = Coordinator::new(registry, executor);

    let outcome = coordinator
        .submit_batch(
            Scenario::CentralDown,
            HashMap::new(),
            vec![
                TransactionDescriptor::new(1, "node1", "SELECT * FROM games_frag2"),
                TransactionDescriptor::new(2, "node1", "SELECT * FROM games_frag1 JOIN games_frag2"),
            ],
        )
        .await;

    assert_eq!(outcome.status, BatchStatus::PartialSuccess);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].executed_node, Some(NodeId::from("node3")));
    assert_eq!(outcome.errors[0].transaction_id, 2);
    assert!(coordinator.inspect_stash(&NodeId::from("node2")).unwrap().is_empty());
}
