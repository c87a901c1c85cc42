//! Shard coordination against in-memory micronodes:
//! leader rotation → forwarding → distribution → reassembly.
//!
//! Every remote micronode is served by a `NullPeerClient`, which keeps
//! fragments as live state, so a distribution followed by an assembly
//! round-trips without sockets.

use std::sync::Arc;
use std::time::Duration;

use shardchain_network::{ForwardedTransaction, SealRequest, ShardView};
use shardchain_node::{
    NodeError, NodeMetrics, ParallelFetcher, ShardCoordinator, StepOutcome,
};
use shardchain_nullables::{mined_chain, NullPeerClient};
use shardchain_types::{BlockHash, NodeId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const A1: &str = "127.0.0.1:5001";
const A2: &str = "127.0.0.1:5002";
const A3: &str = "127.0.0.1:5003";

fn id(n: u8) -> NodeId {
    format!("{n:032x}").parse().unwrap()
}

/// A client that knows the identities of three micronodes.
fn subnet_client() -> Arc<NullPeerClient> {
    let client = Arc::new(NullPeerClient::new());
    client.set_identity(A1, id(1));
    client.set_identity(A2, id(2));
    client.set_identity(A3, id(3));
    client
}

fn coordinator_for(me: u8, shard_size: u64, client: &Arc<NullPeerClient>) -> ShardCoordinator {
    ShardCoordinator::new(
        id(me),
        shard_size,
        client.clone(),
        ParallelFetcher::new(10),
        Arc::new(NodeMetrics::new().unwrap()),
    )
}

fn addresses(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn indices(blocks: &[shardchain_types::Block]) -> Vec<u64> {
    blocks.iter().map(|b| b.index).collect()
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

#[tokio::test]
async fn registration_requires_local_identity() {
    let client = subnet_client();
    let outsider = coordinator_for(9, 2, &client);
    let err = outsider
        .register_micronodes(&addresses(&[A1, A2]))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::NotInSubnet { .. }));
    assert!(!outsider.is_sharded().await);
}

#[tokio::test]
async fn unreachable_micronode_fails_registration() {
    let client = subnet_client();
    client.set_unreachable(A2);
    let coord = coordinator_for(1, 2, &client);
    let err = coord
        .register_micronodes(&addresses(&[A1, A2]))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Network(_)));
    assert!(coord.micronodes().await.is_empty());
}

#[tokio::test]
async fn non_coordinator_drops_standalone_genesis() {
    let client = subnet_client();
    let member = coordinator_for(2, 2, &client);
    let registered = member
        .register_micronodes(&addresses(&["http://127.0.0.1:5001/", A2]))
        .await
        .unwrap();

    assert_eq!(registered.len(), 2);
    assert_eq!(registered[0].address, A1);
    assert!(member.local_chain().await.is_empty());
    assert_eq!(member.view().await.height, 0);
    assert_eq!(member.view().await.leaders, vec![0]);
    assert!(member.last_block().await.is_none());
}

#[tokio::test]
async fn coordinator_joining_with_history_keeps_its_blocks() {
    let client = subnet_client();
    let coord = coordinator_for(1, 2, &client);
    coord.seal_and_append(1, None).await.unwrap();
    coord.seal_and_append(2, None).await.unwrap();

    coord.register_micronodes(&addresses(&[A1, A2])).await.unwrap();
    // Blocks 1..=3 were sealed here, so epochs 0 and 1 stay local.
    assert_eq!(coord.view().await.leaders, vec![0, 0]);
    assert!(coord.is_leader().await);

    let b4 = coord.seal_and_append(3, None).await.unwrap();
    assert_eq!(b4.index, 4);
    assert_eq!(coord.view().await.leaders, vec![0, 0, 1]);
    assert_eq!(
        indices(&coord.assemble_full_chain().await.unwrap()),
        vec![1, 2, 3, 4]
    );

    let b5 = coord.seal_and_append(4, None).await.unwrap();
    assert_eq!(b5.index, 5);
    assert_eq!(client.forwarded_seals().len(), 1);
    assert_eq!(
        indices(&coord.assemble_full_chain().await.unwrap()),
        vec![1, 2, 3, 4, 5]
    );
}

// ---------------------------------------------------------------------------
// Leader rotation and forwarding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn leadership_rotates_every_shard() {
    let client = subnet_client();
    let coord = coordinator_for(1, 2, &client);
    coord.register_micronodes(&addresses(&[A1, A2])).await.unwrap();
    assert!(coord.is_leader().await);

    // Block 2 is sealed locally and closes epoch 0.
    let b2 = coord.seal_and_append(7, None).await.unwrap();
    assert_eq!(b2.index, 2);
    assert_eq!(coord.view().await.leaders, vec![0, 1]);
    assert!(!coord.is_leader().await);

    // Blocks 3 and 4 are forwarded to the new leader.
    let b3 = coord.seal_and_append(8, None).await.unwrap();
    assert_eq!(b3.index, 3);
    assert_eq!(coord.view().await.leaders, vec![0, 1]);
    let b4 = coord.seal_and_append(9, None).await.unwrap();
    assert_eq!(b4.index, 4);
    assert_eq!(coord.view().await.leaders, vec![0, 1, 0]);
    assert!(coord.is_leader().await);

    let seals = client.forwarded_seals();
    assert_eq!(seals.len(), 2);
    assert!(seals.iter().all(|(peer, _)| peer == A2));
    // The forwarded request links to the coordinator's tip.
    assert_eq!(
        seals[0].1.previous_hash.as_ref(),
        Some(&shardchain_ledger::hash(&b2))
    );
    assert_eq!(seals[1].1.view.height, 3);
    assert_eq!(coord.last_block().await.map(|b| b.index), Some(4));
}

#[tokio::test]
async fn transactions_follow_the_leader() {
    let client = subnet_client();
    let coord = coordinator_for(1, 2, &client);
    coord.register_micronodes(&addresses(&[A1, A2])).await.unwrap();

    assert_eq!(coord.submit_transaction("alice", "bob", 5).await.unwrap(), 2);
    assert_eq!(coord.pending_count().await, 1);
    coord.seal_and_append(1, None).await.unwrap();

    let index = coord.submit_transaction("bob", "carol", 2).await.unwrap();
    assert_eq!(index, 3);
    let forwarded = client.forwarded_transactions();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].0, A2);
    assert_eq!(forwarded[0].1.sender, "bob");
    assert_eq!(coord.pending_count().await, 0);
}

#[tokio::test]
async fn bystander_writes_are_rejected_without_side_effects() {
    let client = subnet_client();
    let bystander = coordinator_for(3, 2, &client);
    bystander
        .register_micronodes(&addresses(&[A1, A2, A3]))
        .await
        .unwrap();
    let view_before = bystander.view().await;
    let chain_before = bystander.local_chain().await;

    let tx = bystander.submit_transaction("alice", "bob", 1).await;
    assert!(matches!(tx, Err(NodeError::NotLeader { .. })));
    let seal = bystander.seal_and_append(1, Some(BlockHash::seed())).await;
    assert!(matches!(seal, Err(NodeError::NotLeader { .. })));

    assert_eq!(bystander.view().await, view_before);
    assert_eq!(bystander.local_chain().await, chain_before);
    assert_eq!(bystander.pending_count().await, 0);
    assert!(client.forwarded_seals().is_empty());
    assert!(client.forwarded_transactions().is_empty());
}

#[tokio::test]
async fn leader_rejection_maps_to_not_leader() {
    let client = subnet_client();
    client.set_rejecting(A2);
    let coord = coordinator_for(1, 2, &client);
    coord.register_micronodes(&addresses(&[A1, A2])).await.unwrap();
    coord.seal_and_append(1, None).await.unwrap();

    let err = coord.submit_transaction("a", "b", 1).await.unwrap_err();
    assert!(matches!(err, NodeError::NotLeader { .. }));
    assert_eq!(coord.view().await.leaders, vec![0, 1]);
}

#[tokio::test]
async fn forwarding_failure_leaves_state_untouched() {
    let client = subnet_client();
    let coord = coordinator_for(1, 2, &client);
    coord.register_micronodes(&addresses(&[A1, A2])).await.unwrap();
    coord.seal_and_append(1, None).await.unwrap();
    client.set_unreachable(A2);

    let err = coord.seal_and_append(2, None).await.unwrap_err();
    assert!(matches!(err, NodeError::Network(_)));
    assert_eq!(coord.view().await.height, 2);
    assert_eq!(coord.last_block().await.map(|b| b.index), Some(2));
}

#[tokio::test]
async fn forwarded_writes_adopt_the_senders_view() {
    let client = subnet_client();
    let leader = coordinator_for(2, 2, &client);
    leader.register_micronodes(&addresses(&[A1, A2])).await.unwrap();
    assert!(!leader.is_leader().await);

    let index = leader
        .accept_forwarded_transaction(ForwardedTransaction {
            sender: "alice".into(),
            recipient: "bob".into(),
            amount: 3,
            view: ShardView {
                leaders: vec![0, 1],
                height: 2,
            },
        })
        .await
        .unwrap();
    assert_eq!(index, 3);

    let prev = BlockHash::new("ab".repeat(32));
    let b3 = leader
        .accept_forwarded_seal(SealRequest {
            proof: 11,
            previous_hash: Some(prev.clone()),
            view: ShardView {
                leaders: vec![0, 1],
                height: 2,
            },
        })
        .await
        .unwrap();
    assert_eq!(b3.index, 3);
    assert_eq!(b3.previous_hash, prev);
    assert_eq!(b3.transactions.len(), 1);

    let b4 = leader
        .accept_forwarded_seal(SealRequest {
            proof: 12,
            previous_hash: None,
            view: ShardView {
                leaders: vec![0, 1],
                height: 3,
            },
        })
        .await
        .unwrap();
    assert_eq!(b4.index, 4);
    assert_eq!(b4.previous_hash, shardchain_ledger::hash(&b3));
    assert_eq!(indices(&leader.local_chain().await), vec![3, 4]);

    // Epoch 2 belongs to the coordinator again.
    let refused = leader
        .accept_forwarded_seal(SealRequest {
            proof: 13,
            previous_hash: None,
            view: ShardView {
                leaders: vec![0, 1, 0],
                height: 4,
            },
        })
        .await;
    assert!(matches!(refused, Err(NodeError::NotLeader { .. })));
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

#[tokio::test]
async fn assembly_orders_by_shard_not_arrival() {
    let client = subnet_client();
    let coord = coordinator_for(1, 2, &client);
    coord
        .register_micronodes(&addresses(&[A1, A2, A3]))
        .await
        .unwrap();
    for proof in 0..5 {
        coord.seal_and_append(proof, None).await.unwrap();
    }
    assert_eq!(indices(&client.fragment(A2)), vec![3, 4]);
    assert_eq!(indices(&client.fragment(A3)), vec![5, 6]);

    // The earlier shard now answers last.
    client.set_delay(A2, Duration::from_millis(80));
    let chain = coord.assemble_full_chain().await.unwrap();
    assert_eq!(indices(&chain), vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn single_micronode_serves_local_chain() {
    let client = subnet_client();
    let coord = coordinator_for(1, 2, &client);
    coord.register_micronodes(&addresses(&[A1])).await.unwrap();
    coord.seal_and_append(1, None).await.unwrap();
    coord.seal_and_append(2, None).await.unwrap();
    assert_eq!(indices(&coord.assemble_full_chain().await.unwrap()), vec![1, 2, 3]);
}

#[tokio::test]
async fn missing_fragment_is_an_error() {
    let client = subnet_client();
    let coord = coordinator_for(1, 2, &client);
    coord.register_micronodes(&addresses(&[A1, A2])).await.unwrap();
    client.set_unreachable(A2);

    let err = coord.assemble_full_chain().await.unwrap_err();
    assert!(matches!(err, NodeError::FragmentUnavailable { ref peer, .. } if peer == A2));
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn distribution_round_trips_through_assembly() {
    let client = subnet_client();
    let coord = coordinator_for(1, 2, &client);
    coord
        .register_micronodes(&addresses(&[A1, A2, A3]))
        .await
        .unwrap();
    let chain = mined_chain(5);

    let report = coord.distribute_chain(chain.clone()).await;

    assert!(report.is_complete(), "{report:?}");
    assert_eq!(report.nodes.len(), 3);
    assert_eq!(coord.view().await.leaders, vec![0, 1, 2]);
    assert_eq!(coord.local_chain().await, chain[..2].to_vec());
    assert_eq!(client.fragment(A2), chain[2..4].to_vec());
    assert_eq!(client.fragment(A3), chain[4..].to_vec());
    let mut cleared = client.clears();
    cleared.sort();
    assert_eq!(cleared, addresses(&[A2, A3]));

    assert_eq!(coord.assemble_full_chain().await.unwrap(), chain);
    assert_eq!(coord.last_block().await, chain.last().cloned());
}

#[tokio::test]
async fn fragments_for_one_node_are_posted_in_epoch_order() {
    let client = subnet_client();
    let coord = coordinator_for(1, 1, &client);
    coord.register_micronodes(&addresses(&[A1, A2])).await.unwrap();
    // With one-block epochs the genesis epoch is already complete, so the
    // coordinator also leads epoch 1.
    assert_eq!(coord.view().await.leaders, vec![0, 0]);
    let chain = mined_chain(5);

    let report = coord.distribute_chain(chain.clone()).await;

    assert!(report.is_complete());
    assert_eq!(coord.view().await.leaders, vec![0, 0, 1, 0, 1, 0]);
    let posts: Vec<Vec<u64>> = client
        .posts()
        .iter()
        .filter(|(peer, _)| peer == A2)
        .map(|(_, blocks)| indices(blocks))
        .collect();
    assert_eq!(posts, vec![vec![3], vec![5]]);
    assert_eq!(indices(&coord.local_chain().await), vec![1, 2, 4]);
}

#[tokio::test]
async fn sealing_continues_after_exact_multiple_distribution() {
    let client = subnet_client();
    let coord = coordinator_for(1, 2, &client);
    coord.register_micronodes(&addresses(&[A1, A2])).await.unwrap();

    let report = coord.distribute_chain(mined_chain(4)).await;
    assert!(report.is_complete(), "{report:?}");
    // Block 4 closed epoch 1; epoch 2 is open and led by slot 0.
    assert_eq!(coord.view().await.leaders, vec![0, 1, 0]);
    assert!(coord.is_leader().await);

    let b5 = coord.seal_and_append(5, None).await.unwrap();
    let b6 = coord.seal_and_append(6, None).await.unwrap();
    assert_eq!((b5.index, b6.index), (5, 6));
    assert!(client.forwarded_seals().is_empty());
    assert_eq!(coord.view().await.leaders, vec![0, 1, 0, 1]);

    let chain = coord.assemble_full_chain().await.unwrap();
    assert_eq!(indices(&chain), vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn clearing_the_local_chain_forgets_the_tip() {
    let client = subnet_client();
    let coord = coordinator_for(1, 2, &client);
    coord.seal_and_append(1, None).await.unwrap();
    assert!(coord.last_block().await.is_some());

    coord.clear_local().await;
    assert!(coord.last_block().await.is_none());

    let blocks = mined_chain(3);
    coord.append_fragment(blocks[1..].to_vec()).await;
    assert_eq!(coord.last_block().await, blocks.last().cloned());
}

// ---------------------------------------------------------------------------
// Schedule and height stay in step
// ---------------------------------------------------------------------------

/// One leader per completed epoch plus the open one.
async fn assert_in_step(node: &ShardCoordinator, shard_size: u64) {
    let view = node.view().await;
    assert_eq!(
        view.leaders.len() as u64,
        view.height / shard_size + 1,
        "shard_size {shard_size}: {view:?}"
    );
}

#[tokio::test]
async fn leader_list_tracks_height_on_every_path() {
    let adopted = mined_chain(12);

    for shard_size in 1..=3u64 {
        let client = subnet_client();
        let coord = coordinator_for(1, shard_size, &client);
        coord
            .register_micronodes(&addresses(&[A1, A2, A3]))
            .await
            .unwrap();
        assert_in_step(&coord, shard_size).await;

        // Local seals and forwarded seals alike.
        for proof in 0..7 {
            coord.seal_and_append(proof, None).await.unwrap();
            assert_in_step(&coord, shard_size).await;
        }
        assert!(!client.forwarded_seals().is_empty());

        coord.distribute_chain(adopted.clone()).await;
        assert_in_step(&coord, shard_size).await;
        assert_eq!(coord.view().await.height, 12);

        for proof in 7..9 {
            coord.seal_and_append(proof, None).await.unwrap();
            assert_in_step(&coord, shard_size).await;
        }

        // A member picks the schedule up from a forwarded write.
        let member = coordinator_for(2, shard_size, &client);
        member
            .register_micronodes(&addresses(&[A1, A2, A3]))
            .await
            .unwrap();
        assert_in_step(&member, shard_size).await;

        let (_, request) = client
            .forwarded_seals()
            .into_iter()
            .find(|(peer, _)| peer == A2)
            .unwrap();
        member.accept_forwarded_seal(request).await.unwrap();
        assert_in_step(&member, shard_size).await;
    }
}

#[tokio::test]
async fn failed_clear_skips_node_and_is_reported() {
    let client = subnet_client();
    let coord = coordinator_for(1, 2, &client);
    coord
        .register_micronodes(&addresses(&[A1, A2, A3]))
        .await
        .unwrap();
    client.set_unreachable(A3);

    let report = coord.distribute_chain(mined_chain(6)).await;

    assert!(!report.is_complete());
    assert_eq!(report.failed_nodes(), vec![A3]);
    let a3 = report.nodes.iter().find(|n| n.address == A3).unwrap();
    assert!(matches!(a3.cleared, StepOutcome::Failed(_)));
    assert!(a3
        .fragments
        .iter()
        .all(|f| f.outcome == StepOutcome::Skipped));
    assert!(client.posts().iter().all(|(peer, _)| peer != A3));
    assert_eq!(client.fragment(A2).len(), 2);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["nodes"][0]["cleared"]["status"], "done");
}

#[tokio::test]
async fn standalone_distribution_replaces_local_chain() {
    let client = Arc::new(NullPeerClient::new());
    let coord = coordinator_for(1, 2, &client);
    let chain = mined_chain(3);

    let report = coord.distribute_chain(chain.clone()).await;

    assert!(report.is_complete());
    assert!(report.nodes.is_empty());
    assert_eq!(coord.local_chain().await, chain);
    assert!(client.clears().is_empty());
}
