//! In-memory metadata stores.
//!
//! Each store implements one source trait over shared in-process state.
//! Clones share state via `Arc`, so a test (or an embedding process) can keep
//! one handle for mutation and hand another to the availability checks.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use warden_core::{ChannelName, CollectionId, NodeId, ReplicaId, SegmentId};

use crate::source::{
    CollectionSource, DistributionSource, LivenessSource, ReplicaSource, TargetSource,
};
use crate::types::{
    Collection, DmChannel, LeaderView, LoadStatus, NodeRecord, Replica, TargetChannelSet,
    TargetScope,
};

// A writer that panicked left the maps structurally intact, so readers keep
// going with whatever it managed to write.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// -----------------------------------------------------------------------------
// Node Manager
// -----------------------------------------------------------------------------

/// In-memory liveness tracker.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNodeManager {
    nodes: Arc<RwLock<HashMap<NodeId, NodeRecord>>>,
}

impl InMemoryNodeManager {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or re-registers) a node as online.
    pub fn register(&self, node_id: NodeId, address: impl Into<String>, current_time_us: u64) {
        write(&self.nodes).insert(node_id, NodeRecord::new(node_id, address, current_time_us));
    }

    /// Records a heartbeat. Returns false if the node is not registered.
    pub fn heartbeat(&self, node_id: NodeId, current_time_us: u64) -> bool {
        let mut nodes = write(&self.nodes);
        let Some(record) = nodes.get_mut(&node_id) else {
            return false;
        };
        record.last_heartbeat_us = record.last_heartbeat_us.max(current_time_us);
        true
    }

    /// Removes a node. Returns its last record, if it was online.
    pub fn remove(&self, node_id: NodeId) -> Option<NodeRecord> {
        write(&self.nodes).remove(&node_id)
    }

    /// Removes every node whose last heartbeat is older than `timeout_us`.
    ///
    /// Returns the expired nodes in ascending order.
    pub fn expire_stale(&self, current_time_us: u64, timeout_us: u64) -> Vec<NodeId> {
        let mut nodes = write(&self.nodes);
        let mut expired: Vec<NodeId> = nodes
            .values()
            .filter(|record| current_time_us.saturating_sub(record.last_heartbeat_us) > timeout_us)
            .map(|record| record.node_id)
            .collect();
        expired.sort_unstable();
        for node_id in &expired {
            nodes.remove(node_id);
        }
        expired
    }

    /// Returns the number of online nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.nodes).len()
    }

    /// Returns true if no node is online.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        read(&self.nodes).is_empty()
    }
}

impl LivenessSource for InMemoryNodeManager {
    fn get(&self, node_id: NodeId) -> Option<NodeRecord> {
        read(&self.nodes).get(&node_id).cloned()
    }
}

// -----------------------------------------------------------------------------
// Target Store
// -----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Targets {
    current: HashMap<CollectionId, TargetChannelSet>,
    next: HashMap<CollectionId, TargetChannelSet>,
}

/// In-memory target assignment store holding a current and a next target.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTargetStore {
    targets: Arc<RwLock<Targets>>,
}

impl InMemoryTargetStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current target of a collection.
    pub fn set_current(&self, collection_id: CollectionId, target: TargetChannelSet) {
        write(&self.targets).current.insert(collection_id, target);
    }

    /// Replaces the next target of a collection.
    pub fn set_next(&self, collection_id: CollectionId, target: TargetChannelSet) {
        write(&self.targets).next.insert(collection_id, target);
    }

    /// Promotes the next target to current. Returns false if there was none.
    pub fn promote_next(&self, collection_id: CollectionId) -> bool {
        let mut targets = write(&self.targets);
        match targets.next.remove(&collection_id) {
            Some(next) => {
                targets.current.insert(collection_id, next);
                true
            }
            None => false,
        }
    }

    /// Drops both targets of a collection.
    pub fn remove_collection(&self, collection_id: CollectionId) {
        let mut targets = write(&self.targets);
        targets.current.remove(&collection_id);
        targets.next.remove(&collection_id);
    }
}

impl Targets {
    fn resolve(
        &self,
        collection_id: CollectionId,
        scope: TargetScope,
        has_entry: impl Fn(&TargetChannelSet) -> bool,
    ) -> Option<&TargetChannelSet> {
        let current = self.current.get(&collection_id);
        let next = self.next.get(&collection_id);
        match scope {
            TargetScope::Current => current,
            TargetScope::Next => next,
            TargetScope::CurrentOrNext => current.filter(|t| has_entry(t)).or(next),
        }
    }
}

impl TargetSource for InMemoryTargetStore {
    fn dm_channels_by_collection(
        &self,
        collection_id: CollectionId,
        scope: TargetScope,
    ) -> Vec<DmChannel> {
        let targets = read(&self.targets);
        targets
            .resolve(collection_id, scope, |t| !t.is_empty())
            .map(|target| {
                target
                    .channels()
                    .map(|channel| DmChannel {
                        collection_id,
                        channel: channel.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn sealed_segments_by_channel(
        &self,
        collection_id: CollectionId,
        channel: &ChannelName,
        scope: TargetScope,
    ) -> HashSet<SegmentId> {
        let targets = read(&self.targets);
        targets
            .resolve(collection_id, scope, |t| t.segments(channel).is_some())
            .and_then(|target| target.segments(channel))
            .cloned()
            .unwrap_or_default()
    }
}

// -----------------------------------------------------------------------------
// Distribution
// -----------------------------------------------------------------------------

/// In-memory live distribution, holding the latest leader views per node.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDistribution {
    views: Arc<RwLock<BTreeMap<NodeId, Vec<LeaderView>>>>,
}

impl InMemoryDistribution {
    /// Creates an empty distribution.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every leader view reported by a node.
    pub fn update_leader_views(&self, node_id: NodeId, views: Vec<LeaderView>) {
        let mut all = write(&self.views);
        if views.is_empty() {
            all.remove(&node_id);
        } else {
            all.insert(node_id, views);
        }
    }

    /// Drops every leader view reported by a node.
    pub fn remove_node(&self, node_id: NodeId) {
        write(&self.views).remove(&node_id);
    }
}

impl DistributionSource for InMemoryDistribution {
    fn leader_views_by_channel(&self, channel: &ChannelName) -> Vec<LeaderView> {
        read(&self.views)
            .values()
            .flatten()
            .filter(|view| view.channel == *channel)
            .cloned()
            .collect()
    }
}

// -----------------------------------------------------------------------------
// Replica Store
// -----------------------------------------------------------------------------

/// In-memory replica topology.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReplicaStore {
    replicas: Arc<RwLock<BTreeMap<ReplicaId, Replica>>>,
}

impl InMemoryReplicaStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a replica.
    pub fn put(&self, replica: Replica) {
        write(&self.replicas).insert(replica.replica_id, replica);
    }

    /// Removes a replica.
    pub fn remove(&self, replica_id: ReplicaId) -> Option<Replica> {
        write(&self.replicas).remove(&replica_id)
    }
}

impl ReplicaSource for InMemoryReplicaStore {
    fn by_collection_and_node(
        &self,
        collection_id: CollectionId,
        node_id: NodeId,
    ) -> Option<Replica> {
        read(&self.replicas)
            .values()
            .find(|r| r.collection_id == collection_id && r.contains(node_id))
            .cloned()
    }
}

// -----------------------------------------------------------------------------
// Collection Store
// -----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Collections {
    collections: BTreeMap<CollectionId, Collection>,
    releasing: HashSet<CollectionId>,
}

/// In-memory collection store.
///
/// A collection being released stays listed but no longer exists.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCollectionStore {
    inner: Arc<RwLock<Collections>>,
}

impl InMemoryCollectionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a collection.
    pub fn put(&self, collection: Collection) {
        let mut inner = write(&self.inner);
        inner.releasing.remove(&collection.collection_id);
        inner.collections.insert(collection.collection_id, collection);
    }

    /// Refreshes a collection's load progress. Returns false if it is unknown.
    pub fn update_load(
        &self,
        collection_id: CollectionId,
        status: LoadStatus,
        load_percentage: u32,
        current_time_us: u64,
    ) -> bool {
        let mut inner = write(&self.inner);
        let Some(collection) = inner.collections.get_mut(&collection_id) else {
            return false;
        };
        collection.status = status;
        collection.load_percentage = load_percentage;
        collection.updated_at_us = current_time_us;
        true
    }

    /// Starts releasing a collection.
    pub fn begin_release(&self, collection_id: CollectionId) {
        write(&self.inner).releasing.insert(collection_id);
    }

    /// Removes a collection entirely.
    pub fn remove(&self, collection_id: CollectionId) -> Option<Collection> {
        let mut inner = write(&self.inner);
        inner.releasing.remove(&collection_id);
        inner.collections.remove(&collection_id)
    }
}

impl CollectionSource for InMemoryCollectionStore {
    fn collection(&self, collection_id: CollectionId) -> Option<Collection> {
        read(&self.inner).collections.get(&collection_id).cloned()
    }

    fn load_percentage(&self, collection_id: CollectionId) -> Option<u32> {
        read(&self.inner)
            .collections
            .get(&collection_id)
            .map(|collection| collection.load_percentage)
    }

    fn all_collections(&self) -> Vec<Collection> {
        read(&self.inner).collections.values().cloned().collect()
    }

    fn exists(&self, collection_id: CollectionId) -> bool {
        let inner = read(&self.inner);
        inner.collections.contains_key(&collection_id) && !inner.releasing.contains(&collection_id)
    }
}
