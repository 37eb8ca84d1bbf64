//! Seeded randomized tests.
//!
//! Each seed builds a random cluster (nodes, replicas, channels, leader
//! reports, node failures) and checks the service against an independent
//! model of the routing rules plus the properties in [`crate::properties`].

// Test-specific lint allowances.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::similar_names)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;
use warden_core::{ChannelName, CollectionId, Error, NodeId, SegmentId};
use warden_meta::{LeaderView, LoadStatus, ReplicaSource, TargetScope};
use warden_routing::{LeaderDeduplicator, TieBreak};

use crate::properties::{check_dedup_idempotent, check_routing_lists};
use crate::scenarios::seeds::{CI_SEED_COUNT, REGRESSION_SEEDS};
use crate::scenarios::time::{MINUTE_US, SECOND_US};
use crate::scenarios::{local_view, TestCluster};

const COLLECTION: u64 = 1;

fn all_seeds() -> impl Iterator<Item = u64> {
    REGRESSION_SEEDS.iter().copied().chain(0..CI_SEED_COUNT)
}

// ============================================================================
// Random Cluster
// ============================================================================

struct RandomCluster {
    cluster: TestCluster,
    channels: Vec<ChannelName>,
    online: BTreeSet<NodeId>,
}

fn random_cluster(seed: u64) -> RandomCluster {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cluster = TestCluster::new();

    let node_count: u64 = rng.gen_range(2..=8);
    let replica_count: u64 = rng.gen_range(1..=3);
    let channel_count: usize = rng.gen_range(1..=4);

    cluster.add_nodes(1..=node_count);
    for replica in 0..replica_count {
        let members = (1..=node_count).filter(|node| node % replica_count == replica);
        cluster.add_replica(replica + 1, COLLECTION, members);
    }
    cluster.load_collection(COLLECTION, LoadStatus::Loaded, 100, 0);

    let channels: Vec<String> = (0..channel_count).map(|i| format!("ch{i}")).collect();
    let targets: Vec<Vec<u64>> = channels
        .iter()
        .map(|_| (1..=6u64).filter(|_| rng.gen_bool(0.6)).collect())
        .collect();
    let target_refs: Vec<(&str, &[u64])> = channels
        .iter()
        .zip(&targets)
        .map(|(channel, segments)| (channel.as_str(), segments.as_slice()))
        .collect();
    cluster.set_target(COLLECTION, &target_refs);

    for leader in 1..=node_count {
        for (channel, segments) in channels.iter().zip(&targets) {
            if !rng.gen_bool(0.5) {
                continue;
            }
            let version = rng.gen_range(1..=4);
            let mut view = LeaderView::new(
                NodeId::new(leader),
                CollectionId::new(COLLECTION),
                channel.as_str(),
                version,
            );
            for &segment in segments {
                if rng.gen::<f64>() < 0.1 {
                    continue;
                }
                let owner = if rng.gen_bool(0.8) {
                    leader
                } else {
                    rng.gen_range(1..=node_count)
                };
                view = view.with_segment(SegmentId::new(segment), NodeId::new(owner), version);
            }
            cluster.report_checked(view);
        }
    }

    // Failures after the reports were marked, so some serviceable views
    // point at nodes that are gone.
    let mut online = BTreeSet::new();
    for node in 1..=node_count {
        if rng.gen_bool(0.2) {
            cluster.kill_node(node);
        } else {
            online.insert(NodeId::new(node));
        }
    }

    debug!(seed, node_count, replica_count, channel_count, "built random cluster");

    RandomCluster {
        cluster,
        channels: channels.into_iter().map(ChannelName::from).collect(),
        online,
    }
}

/// Independent model: per channel, the newest serviceable view of each
/// replica wins (lowest node on ties), and only online winners are routed.
fn expected_leaders(rc: &RandomCluster) -> Vec<(ChannelName, BTreeSet<NodeId>)> {
    let views = rc.cluster.reported_views();
    rc.channels
        .iter()
        .map(|channel| {
            let mut winners: BTreeMap<_, &LeaderView> = BTreeMap::new();
            for view in views
                .iter()
                .filter(|v| v.channel == *channel && v.is_serviceable())
            {
                let Some(replica) = rc
                    .cluster
                    .replicas
                    .by_collection_and_node(view.collection_id, view.leader_id)
                else {
                    continue;
                };
                let slot = winners.entry(replica.replica_id).or_insert(view);
                if (view.version, std::cmp::Reverse(view.leader_id))
                    > (slot.version, std::cmp::Reverse(slot.leader_id))
                {
                    *slot = view;
                }
            }
            let live: BTreeSet<NodeId> = winners
                .values()
                .map(|v| v.leader_id)
                .filter(|node| rc.online.contains(node))
                .collect();
            (channel.clone(), live)
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_random_routing_matches_model() {
    let mut ok_runs = 0;
    let mut err_runs = 0;

    for seed in all_seeds() {
        let rc = random_cluster(seed);
        let expected = expected_leaders(&rc);
        let result = rc
            .cluster
            .availability
            .get_shard_leaders(CollectionId::new(COLLECTION));

        match expected.iter().find(|(_, nodes)| nodes.is_empty()) {
            Some((channel, _)) => {
                let Err(err) = result else {
                    panic!("seed {seed}: expected failure");
                };
                let Error::ChannelNotAvailable {
                    channel: failed, ..
                } = &err
                else {
                    panic!("seed {seed}: unexpected error {err}");
                };
                assert_eq!(failed, channel, "seed {seed}: wrong failing channel");
                err_runs += 1;
            }
            None => {
                let lists = result.unwrap_or_else(|e| panic!("seed {seed}: {e}"));
                assert_eq!(lists.len(), expected.len(), "seed {seed}");
                for (list, (channel, nodes)) in lists.iter().zip(&expected) {
                    assert_eq!(&list.channel, channel, "seed {seed}: channel order");
                    let routed: BTreeSet<NodeId> = list.node_ids().into_iter().collect();
                    assert_eq!(&routed, nodes, "seed {seed}: leaders for {channel}");
                }

                let violations = check_routing_lists(
                    &lists,
                    &rc.cluster.reported_views(),
                    &rc.cluster.replicas,
                    &rc.cluster.nodes,
                );
                assert!(
                    violations.is_empty(),
                    "seed {seed}: {}",
                    violations
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                ok_runs += 1;
            }
        }
    }

    // Both outcomes must be exercised for the model check to mean anything.
    assert!(ok_runs > 0, "no seed produced a routable cluster");
    assert!(err_runs > 0, "no seed produced an unroutable cluster");
}

#[test]
fn test_random_dedup_idempotent() {
    for seed in all_seeds() {
        let rc = random_cluster(seed);
        let views = rc.cluster.reported_views();

        for tie_break in [TieBreak::LowestNodeId, TieBreak::FirstSeen] {
            let dedup = LeaderDeduplicator::new(Arc::new(rc.cluster.replicas.clone()), tie_break);
            for channel in &rc.channels {
                let channel_views: Vec<LeaderView> = views
                    .iter()
                    .filter(|v| v.channel == *channel)
                    .cloned()
                    .collect();
                if let Some(violation) = check_dedup_idempotent(&dedup, &channel_views) {
                    panic!("seed {seed}, {channel}: {violation}");
                }
            }
        }
    }
}

#[test]
fn test_random_marked_views_agree_with_readiness() {
    for seed in all_seeds() {
        let rc = random_cluster(seed);
        let mut rng = StdRng::seed_from_u64(seed ^ 0x5EED);

        for mut view in rc.cluster.reported_views() {
            // Re-mark against current liveness; a node may have died since.
            let ready = rc
                .cluster
                .availability
                .check_shard_ready(&view, TargetScope::Current);
            if rng.gen_bool(0.5) {
                view.unserviceable_reason = Some(Error::NodeOffline {
                    node_id: view.leader_id,
                });
            }
            let marked = rc
                .cluster
                .availability
                .mark_serviceability(&mut view, TargetScope::Current);

            assert_eq!(marked, ready.is_ok(), "seed {seed}");
            assert_eq!(view.unserviceable_reason, ready.err(), "seed {seed}");
        }
    }
}

#[test]
fn test_random_sweep_escalation() {
    for seed in all_seeds() {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut cluster = TestCluster::new();
        cluster.add_nodes([1]);

        let now_us = 2 * MINUTE_US;
        let mut expected = None;

        for id in 1..=rng.gen_range(1..=6u64) {
            let updated_at_us = rng.gen_range(0..=now_us);
            cluster.add_replica(id, id, [1]);

            if rng.gen_bool(0.5) {
                let channel = format!("c{id}-ch");
                cluster.load_collection(id, LoadStatus::Loaded, 100, updated_at_us);
                cluster.set_target(id, &[(channel.as_str(), &[])]);
                cluster.report_checked(local_view(1, id, &channel, 1, &[]));
            } else {
                let percentage = rng.gen_range(0..100);
                cluster.load_collection(id, LoadStatus::Loading, percentage, updated_at_us);
                if expected.is_none() && now_us - updated_at_us >= MINUTE_US {
                    expected = Some(CollectionId::new(id));
                }
            }
        }

        let result = cluster.availability.check_collections_queryable(now_us);
        match expected {
            Some(collection_id) => assert_eq!(
                result,
                Err(Error::CollectionNotFullyLoaded {
                    collection_id,
                    detail: None,
                }),
                "seed {seed}"
            ),
            None => assert!(result.is_ok(), "seed {seed}: {result:?}"),
        }
    }
}

#[test]
fn test_random_load_progress_is_monotonic() {
    for seed in all_seeds() {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut cluster = TestCluster::new();
        cluster.add_nodes([1]);
        cluster.add_replica(1, COLLECTION, [1]);
        cluster.set_target(COLLECTION, &[("ch1", &[1])]);
        cluster.report_checked(local_view(1, COLLECTION, "ch1", 1, &[1]));

        let mut percentages: Vec<u32> = (0..rng.gen_range(1..=20))
            .map(|_| rng.gen_range(0..=100))
            .collect();
        percentages.sort_unstable();
        percentages.push(100);

        let mut queryable_since = None;
        for (step, &percentage) in percentages.iter().enumerate() {
            let now_us = step as u64 * SECOND_US;
            cluster.load_collection(COLLECTION, LoadStatus::Loading, percentage, now_us);
            let queryable = cluster
                .availability
                .is_queryable(CollectionId::new(COLLECTION))
                .is_ok();

            if let Some(since) = queryable_since {
                assert!(queryable, "seed {seed}: regressed at {percentage}% after {since}%");
            } else if queryable {
                queryable_since = Some(percentage);
            }
        }
        assert_eq!(queryable_since, Some(100), "seed {seed}");
    }
}
