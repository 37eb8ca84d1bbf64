//! Read-only metadata sources.
//!
//! Each trait is a capability over one external store. Implementations hand
//! out snapshots: every call reads the store independently, and two calls
//! may observe different states if the store is mutated in between.

use std::collections::HashSet;

use warden_core::{ChannelName, CollectionId, NodeId, SegmentId};

use crate::types::{Collection, DmChannel, LeaderView, NodeRecord, Replica, TargetScope};

/// Node liveness tracker.
pub trait LivenessSource: Send + Sync {
    /// Returns the node's record if it is currently considered online.
    ///
    /// Staleness is decided by the tracker; an expired node has no record.
    fn get(&self, node_id: NodeId) -> Option<NodeRecord>;
}

/// Target assignment store.
pub trait TargetSource: Send + Sync {
    /// Returns the channels assigned to a collection, in target order.
    fn dm_channels_by_collection(
        &self,
        collection_id: CollectionId,
        scope: TargetScope,
    ) -> Vec<DmChannel>;

    /// Returns the sealed segments expected to be served on a channel.
    fn sealed_segments_by_channel(
        &self,
        collection_id: CollectionId,
        channel: &ChannelName,
        scope: TargetScope,
    ) -> HashSet<SegmentId>;
}

/// Live distribution store.
pub trait DistributionSource: Send + Sync {
    /// Returns every leader view reported for a channel.
    fn leader_views_by_channel(&self, channel: &ChannelName) -> Vec<LeaderView>;
}

/// Replica topology store.
pub trait ReplicaSource: Send + Sync {
    /// Returns the replica of a collection the node belongs to.
    fn by_collection_and_node(
        &self,
        collection_id: CollectionId,
        node_id: NodeId,
    ) -> Option<Replica>;
}

/// Collection store.
pub trait CollectionSource: Send + Sync {
    /// Returns a collection.
    fn collection(&self, collection_id: CollectionId) -> Option<Collection>;

    /// Returns the collection's load progress in percent.
    ///
    /// `None` means the collection's load is not tracked at all.
    fn load_percentage(&self, collection_id: CollectionId) -> Option<u32>;

    /// Returns every known collection.
    fn all_collections(&self) -> Vec<Collection>;

    /// Returns true if the collection exists and is not being released.
    fn exists(&self, collection_id: CollectionId) -> bool;
}
