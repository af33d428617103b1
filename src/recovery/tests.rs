//! Recovery Module Tests
//!
//! ## Test Scopes
//! - **Stash**: FIFO order, removal by sequence number, repeated ids, one home per id, explicit reset.
//! - **Replayer**: Continue-on-failure, position preservation, idempotent empty replay,
//!   writes stashed while a pass is running.

#[cfg(test)]
mod tests {
    use crate::error::RouterError;
    use crate::executor::memory::MemoryExecutor;
    use crate::executor::NodeExecutor;
    use crate::recovery::replayer::Replayer;
    use crate::recovery::stash::Stash;
    use crate::routing::types::TransactionDescriptor;
    use crate::topology::types::{NodeId, Topology};
    use std::sync::Arc;
    use std::time::Duration;

    fn node(id: &str) -> NodeId {
        NodeId::from(id)
    }

    fn write(id: u64) -> TransactionDescriptor {
        TransactionDescriptor::new(id, "node2", format!("INSERT INTO games_frag1 VALUES ({})", id))
    }

    fn stashed_ids(stash: &Stash, node_id: &str) -> Vec<u64> {
        stash
            .peek_all(&node(node_id))
            .iter()
            .map(|entry| entry.transaction.id)
            .collect()
    }

    // ============================================================
    // STASH TESTS
    // ============================================================

    #[test]
    fn test_enqueue_preserves_order() {
        let stash = Stash::new();

        for id in [3, 1, 2] {
            stash.enqueue(&node("node2"), write(id)).unwrap();
        }

        assert_eq!(stashed_ids(&stash, "node2"), vec![3, 1, 2]);
        assert_eq!(stash.len(&node("node2")), 3);
        assert!(stash.is_empty(&node("node3")));
    }

    #[test]
    fn test_entry_keeps_transaction_and_home() {
        let stash = Stash::new();
        let t = write(1);

        stash.enqueue(&node("node2"), t.clone()).unwrap();

        let entries = stash.peek_all(&node("node2"));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].transaction, t);
        assert_eq!(entries[0].home_node, node("node2"));
        assert!(entries[0].enqueued_at > 0);
    }

    #[test]
    fn test_remove_targets_single_entry() {
        let stash = Stash::new();
        let seqs: Vec<u64> = [1, 2, 3]
            .into_iter()
            .map(|id| stash.enqueue(&node("node2"), write(id)).unwrap())
            .collect();

        let removed = stash.remove(&node("node2"), seqs[1]);

        assert_eq!(removed.map(|e| e.transaction.id), Some(2));
        assert_eq!(stashed_ids(&stash, "node2"), vec![1, 3]);
        assert!(stash.remove(&node("node2"), seqs[1]).is_none());
        assert!(stash.remove(&node("node3"), seqs[0]).is_none());
        assert_eq!(stash.locate(2), None);
    }

    #[test]
    fn test_repeated_id_gets_distinct_entries() {
        let stash = Stash::new();

        let first = stash.enqueue(&node("node2"), write(1)).unwrap();
        let second = stash.enqueue(&node("node2"), write(1)).unwrap();

        assert_ne!(first, second);
        assert_eq!(stashed_ids(&stash, "node2"), vec![1, 1]);

        stash.remove(&node("node2"), second);
        let left = stash.peek_all(&node("node2"));
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].seq, first);
        assert_eq!(stash.locate(1), Some(node("node2")));

        stash.remove(&node("node2"), first);
        assert_eq!(stash.locate(1), None);
    }

    #[test]
    fn test_id_pending_for_one_node_only() {
        let stash = Stash::new();
        stash.enqueue(&node("node2"), write(1)).unwrap();

        let result = stash.enqueue(&node("node3"), write(1));

        assert_eq!(
            result,
            Err(RouterError::AlreadyStashed {
                transaction_id: 1,
                node: node("node2"),
            })
        );
        assert!(stash.is_empty(&node("node3")));

        // Once the first entry is gone the id is free again.
        stash.reset(&node("node2"));
        assert!(stash.enqueue(&node("node3"), write(1)).is_ok());
        assert_eq!(stash.locate(1), Some(node("node3")));
    }

    #[test]
    fn test_queues_are_per_node() {
        let stash = Stash::new();

        stash.enqueue(&node("node2"), write(1)).unwrap();
        stash.enqueue(&node("node3"), write(2)).unwrap();

        assert_eq!(stashed_ids(&stash, "node2"), vec![1]);
        assert_eq!(stashed_ids(&stash, "node3"), vec![2]);
        assert_eq!(stash.locate(2), Some(node("node3")));
        assert_eq!(stash.locate(9), None);
    }

    #[test]
    fn test_reset_is_explicit() {
        let stash = Stash::new();
        stash.enqueue(&node("node2"), write(1)).unwrap();
        stash.enqueue(&node("node2"), write(2)).unwrap();
        stash.enqueue(&node("node3"), write(3)).unwrap();

        assert_eq!(stash.reset(&node("node2")), 2);
        assert!(stash.is_empty(&node("node2")));
        assert_eq!(stash.len(&node("node3")), 1);

        assert_eq!(stash.reset_all(), 1);
        assert!(stash.is_empty(&node("node3")));
    }

    // ============================================================
    // REPLAYER TESTS
    // ============================================================

    fn replayer_with(executor: Arc<MemoryExecutor>, stash: Arc<Stash>) -> Replayer {
        Replayer::new(stash, executor as Arc<dyn NodeExecutor>)
    }

    #[tokio::test]
    async fn test_replay_empty_stash_is_noop() {
        let executor = MemoryExecutor::new(&Topology::default());
        let stash = Stash::new();
        let replayer = replayer_with(executor.clone(), stash.clone());

        let first = replayer.replay(&node("node2")).await;
        let second = replayer.replay(&node("node2")).await;

        assert!(first.is_empty());
        assert!(second.is_empty());
        assert!(executor.committed(&node("node2")).is_empty());
    }

    #[tokio::test]
    async fn test_replay_runs_in_fifo_order_and_drains() {
        let executor = MemoryExecutor::new(&Topology::default());
        let stash = Stash::new();
        for id in [1, 2, 3] {
            stash.enqueue(&node("node2"), write(id)).unwrap();
        }
        let replayer = replayer_with(executor.clone(), stash.clone());

        let report = replayer.replay(&node("node2")).await;

        assert_eq!(report.succeeded_ids(), vec![1, 2, 3]);
        assert!(report.failed.is_empty());
        assert!(stash.is_empty(&node("node2")));
        assert_eq!(executor.committed(&node("node2")), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_replay_continues_past_failure_and_keeps_position() {
        let executor = MemoryExecutor::new(&Topology::default());
        let stash = Stash::new();
        stash.enqueue(&node("node2"), write(1)).unwrap();
        stash.enqueue(&node("node2"), write(2)).unwrap();
        executor.fail_transaction(&node("node2"), 1, 1);
        let replayer = replayer_with(executor.clone(), stash.clone());

        let report = replayer.replay(&node("node2")).await;

        assert_eq!(report.succeeded_ids(), vec![2]);
        assert_eq!(report.failed_ids(), vec![1]);
        assert!(matches!(
            report.failed[0].error,
            Some(RouterError::Replay { transaction_id: 1, .. })
        ));
        assert_eq!(stashed_ids(&stash, "node2"), vec![1]);

        // Next pass picks up the stuck entry.
        let retry = replayer.replay(&node("node2")).await;
        assert_eq!(retry.succeeded_ids(), vec![1]);
        assert!(stash.is_empty(&node("node2")));
        assert_eq!(executor.committed(&node("node2")), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_failed_entry_keeps_place_ahead_of_later_writes() {
        let executor = MemoryExecutor::new(&Topology::default());
        let stash = Stash::new();
        stash.enqueue(&node("node2"), write(1)).unwrap();
        stash.enqueue(&node("node2"), write(2)).unwrap();
        executor.fail_transaction(&node("node2"), 1, 1);
        executor.fail_transaction(&node("node2"), 2, 1);
        let replayer = replayer_with(executor.clone(), stash.clone());

        replayer.replay(&node("node2")).await;
        stash.enqueue(&node("node2"), write(3)).unwrap();

        assert_eq!(stashed_ids(&stash, "node2"), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_replay_only_touches_requested_node() {
        let executor = MemoryExecutor::new(&Topology::default());
        let stash = Stash::new();
        stash.enqueue(&node("node2"), write(1)).unwrap();
        stash
            .enqueue(
                &node("node3"),
                TransactionDescriptor::new(2, "node3", "INSERT INTO games_frag2 VALUES (2)"),
            )
            .unwrap();
        let replayer = replayer_with(executor.clone(), stash.clone());

        let report = replayer.replay(&node("node3")).await;

        assert_eq!(report.succeeded_ids(), vec![2]);
        assert_eq!(stashed_ids(&stash, "node2"), vec![1]);
    }

    #[tokio::test]
    async fn test_replay_removes_the_entry_it_ran_when_ids_repeat() {
        // ARRANGE: two batches both used id 1; the older entry fails once
        let executor = MemoryExecutor::new(&Topology::default());
        let stash = Stash::new();
        let older = TransactionDescriptor::new(1, "node2", "INSERT INTO games_frag1 VALUES (100)");
        let newer = TransactionDescriptor::new(1, "node2", "INSERT INTO games_frag1 VALUES (200)");
        stash.enqueue(&node("node2"), older.clone()).unwrap();
        stash.enqueue(&node("node2"), newer.clone()).unwrap();
        executor.fail_transaction(&node("node2"), 1, 1);
        let replayer = replayer_with(executor.clone(), stash.clone());

        // ACT
        let report = replayer.replay(&node("node2")).await;

        // ASSERT
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].query, older.query);
        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.succeeded[0].query, newer.query);

        let left = stash.peek_all(&node("node2"));
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].transaction, older);

        let rows = executor.rows(&node("node2"), "games_frag1");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["game_id"], serde_json::json!(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_stashed_mid_pass_waits_for_next_pass() {
        // ARRANGE: each replayed write takes 5s
        let executor = MemoryExecutor::new(&Topology::default());
        let stash = Stash::new();
        for id in [1, 2] {
            stash.enqueue(&node("node2"), write(id).with_delay(5.0)).unwrap();
        }
        let replayer = Arc::new(replayer_with(executor.clone(), stash.clone()));

        // ACT: start a pass, then stash another write while the first entry runs
        let running = replayer.clone();
        let pass = tokio::spawn(async move { running.replay(&NodeId::from("node2")).await });
        tokio::time::sleep(Duration::from_secs(1)).await;
        stash.enqueue(&node("node2"), write(3)).unwrap();
        assert_eq!(stashed_ids(&stash, "node2"), vec![1, 2, 3]);

        let report = pass.await.unwrap();

        // ASSERT
        assert_eq!(report.succeeded_ids(), vec![1, 2]);
        assert_eq!(stashed_ids(&stash, "node2"), vec![3]);
        assert_eq!(executor.committed(&node("node2")), vec![1, 2]);

        let next = replayer.replay(&node("node2")).await;
        assert_eq!(next.succeeded_ids(), vec![3]);
        assert!(stash.is_empty(&node("node2")));
        assert_eq!(executor.committed(&node("node2")), vec![1, 2, 3]);
    }
}
