//! Cluster metadata model.
//!
//! These are point-in-time snapshots of state owned by external stores.
//! Availability checks read them and never write them back.

use std::collections::{BTreeSet, HashMap, HashSet};

use warden_core::{ChannelName, CollectionId, Error, NodeId, ReplicaId, SegmentId};

// -----------------------------------------------------------------------------
// Nodes
// -----------------------------------------------------------------------------

/// A worker node as known to the liveness tracker.
///
/// A record only exists while the node is considered online.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// Node identifier.
    pub node_id: NodeId,
    /// Network address queries are routed to.
    pub address: String,
    /// Time of the last accepted heartbeat (microseconds since epoch).
    pub last_heartbeat_us: u64,
}

impl NodeRecord {
    /// Creates a node record.
    #[must_use]
    pub fn new(node_id: NodeId, address: impl Into<String>, last_heartbeat_us: u64) -> Self {
        Self {
            node_id,
            address: address.into(),
            last_heartbeat_us,
        }
    }
}

// -----------------------------------------------------------------------------
// Leader Views
// -----------------------------------------------------------------------------

/// Location of one segment inside a leader's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentPlacement {
    /// The segment.
    pub segment_id: SegmentId,
    /// The node hosting the segment.
    pub node_id: NodeId,
    /// Refresh counter assigned by the owning replica.
    pub version: u64,
}

/// A leader's self-reported snapshot of what it serves for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderView {
    /// The node acting as leader.
    pub leader_id: NodeId,
    /// Collection the channel belongs to.
    pub collection_id: CollectionId,
    /// The channel being served.
    pub channel: ChannelName,
    /// Monotonic version of this report within its replica.
    pub version: u64,
    /// Segments the leader currently serves, by segment ID.
    pub segments: HashMap<SegmentId, SegmentPlacement>,
    /// Why the leader cannot serve reads, if it cannot.
    pub unserviceable_reason: Option<Error>,
}

impl LeaderView {
    /// Creates an empty, serviceable leader view.
    #[must_use]
    pub fn new(
        leader_id: NodeId,
        collection_id: CollectionId,
        channel: impl Into<ChannelName>,
        version: u64,
    ) -> Self {
        Self {
            leader_id,
            collection_id,
            channel: channel.into(),
            version,
            segments: HashMap::new(),
            unserviceable_reason: None,
        }
    }

    /// Adds a segment placement.
    #[must_use]
    pub fn with_segment(mut self, segment_id: SegmentId, node_id: NodeId, version: u64) -> Self {
        self.segments.insert(
            segment_id,
            SegmentPlacement {
                segment_id,
                node_id,
                version,
            },
        );
        self
    }

    /// Marks the view as unserviceable.
    #[must_use]
    pub fn with_unserviceable_reason(mut self, reason: Error) -> Self {
        self.unserviceable_reason = Some(reason);
        self
    }

    /// Returns true if the leader has not reported a reason it cannot serve.
    #[must_use]
    pub const fn is_serviceable(&self) -> bool {
        self.unserviceable_reason.is_none()
    }
}

// -----------------------------------------------------------------------------
// Targets
// -----------------------------------------------------------------------------

/// Which target assignment to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetScope {
    /// The target currently being served.
    #[default]
    Current,
    /// The target being prepared to replace the current one.
    Next,
    /// The current target, falling back to the next one where it has no entry.
    CurrentOrNext,
}

/// Descriptor of a channel assigned to a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DmChannel {
    /// Collection the channel belongs to.
    pub collection_id: CollectionId,
    /// Channel name.
    pub channel: ChannelName,
}

/// Desired placement for a collection: each channel and the sealed segments
/// expected to be served on it.
///
/// Channels keep insertion order so routing output follows target order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetChannelSet {
    channels: Vec<(ChannelName, HashSet<SegmentId>)>,
}

impl TargetChannelSet {
    /// Creates an empty target.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// Adds a channel with its expected segments, replacing any previous entry.
    #[must_use]
    pub fn with_channel(
        mut self,
        channel: impl Into<ChannelName>,
        segments: impl IntoIterator<Item = SegmentId>,
    ) -> Self {
        let channel = channel.into();
        let segments: HashSet<SegmentId> = segments.into_iter().collect();
        if let Some(entry) = self.channels.iter_mut().find(|(name, _)| *name == channel) {
            entry.1 = segments;
        } else {
            self.channels.push((channel, segments));
        }
        self
    }

    /// Returns the channel names in insertion order.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelName> + '_ {
        self.channels.iter().map(|(name, _)| name)
    }

    /// Returns the expected segments of a channel, if the channel is assigned.
    #[must_use]
    pub fn segments(&self, channel: &ChannelName) -> Option<&HashSet<SegmentId>> {
        self.channels
            .iter()
            .find(|(name, _)| name == channel)
            .map(|(_, segments)| segments)
    }

    /// Returns the number of channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns true if no channel is assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

// -----------------------------------------------------------------------------
// Replicas and Collections
// -----------------------------------------------------------------------------

/// An independent, fully-loaded copy of a collection across a set of nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replica {
    /// Replica identifier.
    pub replica_id: ReplicaId,
    /// Collection this replica serves.
    pub collection_id: CollectionId,
    /// Member nodes.
    pub nodes: BTreeSet<NodeId>,
}

impl Replica {
    /// Creates a replica with the given members.
    #[must_use]
    pub fn new(
        replica_id: ReplicaId,
        collection_id: CollectionId,
        nodes: impl IntoIterator<Item = NodeId>,
    ) -> Self {
        Self {
            replica_id,
            collection_id,
            nodes: nodes.into_iter().collect(),
        }
    }

    /// Returns true if the node is a member of this replica.
    #[must_use]
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains(&node_id)
    }
}

/// Load lifecycle of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    /// Segments and channels are still being loaded.
    #[default]
    Loading,
    /// Load formally completed.
    Loaded,
}

/// A collection as tracked by the collection store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    /// Collection identifier.
    pub collection_id: CollectionId,
    /// Load lifecycle state.
    pub status: LoadStatus,
    /// Load progress in percent, as last computed by the store.
    pub load_percentage: u32,
    /// Last time the collection's load status was refreshed
    /// (microseconds since epoch).
    pub updated_at_us: u64,
}

impl Collection {
    /// Creates a collection record.
    #[must_use]
    pub const fn new(
        collection_id: CollectionId,
        status: LoadStatus,
        load_percentage: u32,
        updated_at_us: u64,
    ) -> Self {
        Self {
            collection_id,
            status,
            load_percentage,
            updated_at_us,
        }
    }
}

// -----------------------------------------------------------------------------
// Routing Output
// -----------------------------------------------------------------------------

/// A node that can serve reads for a shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingEndpoint {
    /// The serving node.
    pub node_id: NodeId,
    /// Its network address.
    pub address: String,
}

/// The healthy leaders for one channel.
///
/// Endpoint order carries no meaning; routers load-balance across them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardRoutingList {
    /// The channel.
    pub channel: ChannelName,
    /// Live, serviceable leaders. Never empty when produced by the aggregator.
    pub endpoints: Vec<RoutingEndpoint>,
}

impl ShardRoutingList {
    /// Returns the leader node IDs.
    #[must_use]
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.endpoints.iter().map(|e| e.node_id).collect()
    }

    /// Returns the leader addresses, parallel to [`Self::node_ids`].
    #[must_use]
    pub fn node_addrs(&self) -> Vec<&str> {
        self.endpoints.iter().map(|e| e.address.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leader_view_builder() {
        let view = LeaderView::new(NodeId::new(1), CollectionId::new(10), "ch1", 3)
            .with_segment(SegmentId::new(100), NodeId::new(2), 1);

        assert_eq!(view.segments.len(), 1);
        assert_eq!(view.segments[&SegmentId::new(100)].node_id, NodeId::new(2));
        assert!(view.is_serviceable());

        let view = view.with_unserviceable_reason(Error::NodeOffline {
            node_id: NodeId::new(2),
        });
        assert!(!view.is_serviceable());
    }

    #[test]
    fn test_target_channel_set_keeps_order() {
        let target = TargetChannelSet::new()
            .with_channel("ch2", [SegmentId::new(1)])
            .with_channel("ch1", [SegmentId::new(2), SegmentId::new(3)])
            .with_channel("ch2", [SegmentId::new(4)]);

        let names: Vec<&str> = target.channels().map(ChannelName::as_str).collect();
        assert_eq!(names, vec!["ch2", "ch1"]);
        assert_eq!(target.len(), 2);

        let ch2 = target.segments(&ChannelName::from("ch2")).unwrap();
        assert!(ch2.contains(&SegmentId::new(4)));
        assert!(!ch2.contains(&SegmentId::new(1)));
        assert!(target.segments(&ChannelName::from("ch3")).is_none());
    }

    #[test]
    fn test_replica_membership() {
        let replica = Replica::new(
            ReplicaId::new(1),
            CollectionId::new(10),
            [NodeId::new(1), NodeId::new(2)],
        );
        assert!(replica.contains(NodeId::new(2)));
        assert!(!replica.contains(NodeId::new(3)));
    }

    #[test]
    fn test_routing_list_parallel_arrays() {
        let list = ShardRoutingList {
            channel: ChannelName::from("ch1"),
            endpoints: vec![
                RoutingEndpoint {
                    node_id: NodeId::new(1),
                    address: "10.0.0.1:21123".to_string(),
                },
                RoutingEndpoint {
                    node_id: NodeId::new(2),
                    address: "10.0.0.2:21123".to_string(),
                },
            ],
        };

        assert_eq!(list.node_ids(), vec![NodeId::new(1), NodeId::new(2)]);
        assert_eq!(list.node_addrs(), vec!["10.0.0.1:21123", "10.0.0.2:21123"]);
    }
}
