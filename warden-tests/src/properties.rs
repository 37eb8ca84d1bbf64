//! Property definitions and checkers for routing tests.
//!
//! Properties are invariants that every routing table produced by the
//! availability service must satisfy, whatever state the cluster is in.

use std::collections::{BTreeMap, BTreeSet};

use warden_core::{ChannelName, NodeId, ReplicaId};
use warden_meta::{LeaderView, LivenessSource, ReplicaSource, ShardRoutingList};
use warden_routing::LeaderDeduplicator;

// ============================================================================
// Property Violation Types
// ============================================================================

/// A violation of a routing property.
#[derive(Debug, Clone)]
pub enum PropertyViolation {
    /// A channel was returned without any endpoint.
    EmptyRoutingList {
        /// The channel.
        channel: ChannelName,
    },
    /// A routed leader is not online.
    OfflineLeaderRouted {
        /// The channel.
        channel: ChannelName,
        /// The offline leader.
        node_id: NodeId,
    },
    /// A routed leader reported itself unable to serve.
    UnserviceableLeaderRouted {
        /// The channel.
        channel: ChannelName,
        /// The unserviceable leader.
        node_id: NodeId,
    },
    /// More than one leader was routed for the same replica and channel.
    MultipleLeadersPerReplica {
        /// The channel.
        channel: ChannelName,
        /// The replica.
        replica_id: ReplicaId,
        /// The routed leaders.
        leaders: Vec<NodeId>,
    },
    /// A routed leader was superseded by a newer view of its replica.
    StaleLeaderRouted {
        /// The channel.
        channel: ChannelName,
        /// The routed leader.
        node_id: NodeId,
        /// Its reported version.
        version: u64,
        /// The newest serviceable version in the replica.
        newest: u64,
    },
    /// Deduplicating an already deduplicated set changed it.
    DedupNotIdempotent {
        /// Leaders after one pass.
        first: Vec<NodeId>,
        /// Leaders after two passes.
        second: Vec<NodeId>,
    },
}

impl std::fmt::Display for PropertyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRoutingList { channel } => {
                write!(f, "Empty routing list for {channel}")
            }
            Self::OfflineLeaderRouted { channel, node_id } => {
                write!(f, "Offline leader {node_id} routed for {channel}")
            }
            Self::UnserviceableLeaderRouted { channel, node_id } => {
                write!(f, "Unserviceable leader {node_id} routed for {channel}")
            }
            Self::MultipleLeadersPerReplica {
                channel,
                replica_id,
                leaders,
            } => {
                write!(
                    f,
                    "Multiple leaders for {replica_id} on {channel}: {leaders:?}"
                )
            }
            Self::StaleLeaderRouted {
                channel,
                node_id,
                version,
                newest,
            } => {
                write!(
                    f,
                    "Stale leader {node_id} routed for {channel} at version {version}, \
                     newest is {newest}"
                )
            }
            Self::DedupNotIdempotent { first, second } => {
                write!(
                    f,
                    "Dedup not idempotent: {first:?} became {second:?}"
                )
            }
        }
    }
}

// ============================================================================
// Checkers
// ============================================================================

/// Checks every routing list against the views that produced it.
///
/// `views` is every view published in the distribution; each leader reports
/// at most one view per channel.
#[must_use]
pub fn check_routing_lists(
    lists: &[ShardRoutingList],
    views: &[LeaderView],
    replicas: &dyn ReplicaSource,
    liveness: &dyn LivenessSource,
) -> Vec<PropertyViolation> {
    let mut violations = Vec::new();

    for list in lists {
        if list.endpoints.is_empty() {
            violations.push(PropertyViolation::EmptyRoutingList {
                channel: list.channel.clone(),
            });
            continue;
        }

        let channel_views: Vec<&LeaderView> =
            views.iter().filter(|v| v.channel == list.channel).collect();
        let mut by_replica: BTreeMap<ReplicaId, Vec<NodeId>> = BTreeMap::new();

        for node_id in list.node_ids() {
            if liveness.get(node_id).is_none() {
                violations.push(PropertyViolation::OfflineLeaderRouted {
                    channel: list.channel.clone(),
                    node_id,
                });
            }

            let Some(view) = channel_views.iter().find(|v| v.leader_id == node_id) else {
                continue;
            };
            if !view.is_serviceable() {
                violations.push(PropertyViolation::UnserviceableLeaderRouted {
                    channel: list.channel.clone(),
                    node_id,
                });
            }

            let Some(replica) = replicas.by_collection_and_node(view.collection_id, node_id)
            else {
                continue;
            };
            by_replica
                .entry(replica.replica_id)
                .or_default()
                .push(node_id);

            let newest = channel_views
                .iter()
                .filter(|v| v.is_serviceable() && replica.contains(v.leader_id))
                .map(|v| v.version)
                .max()
                .unwrap_or(view.version);
            if view.version < newest {
                violations.push(PropertyViolation::StaleLeaderRouted {
                    channel: list.channel.clone(),
                    node_id,
                    version: view.version,
                    newest,
                });
            }
        }

        for (replica_id, leaders) in by_replica {
            if leaders.len() > 1 {
                violations.push(PropertyViolation::MultipleLeadersPerReplica {
                    channel: list.channel.clone(),
                    replica_id,
                    leaders,
                });
            }
        }
    }

    violations
}

/// Checks that deduplicating a deduplicated set of one channel's views is a
/// no-op.
#[must_use]
pub fn check_dedup_idempotent(
    dedup: &LeaderDeduplicator,
    views: &[LeaderView],
) -> Option<PropertyViolation> {
    let once = dedup.dedup(views.iter().cloned());
    let twice = dedup.dedup(once.values().cloned());
    if once == twice {
        return None;
    }
    Some(PropertyViolation::DedupNotIdempotent {
        first: once.keys().copied().collect(),
        second: twice.keys().copied().collect(),
    })
}

/// Returns the distinct leaders across all routing lists.
#[must_use]
pub fn routed_nodes(lists: &[ShardRoutingList]) -> BTreeSet<NodeId> {
    lists.iter().flat_map(ShardRoutingList::node_ids).collect()
}
