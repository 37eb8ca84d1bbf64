//! Reusable cluster scenarios for Warden tests.
//!
//! A [`TestCluster`] owns one in-memory store per metadata source and a
//! [`ShardAvailability`] wired over them, so tests mutate the stores and
//! observe verdicts the way a coordinator would.

use std::collections::BTreeMap;
use std::sync::{Arc, Once};

use warden_core::{CollectionId, NodeId, ReplicaId, SegmentId};
use warden_meta::{
    Collection, InMemoryCollectionStore, InMemoryDistribution, InMemoryNodeManager,
    InMemoryReplicaStore, InMemoryTargetStore, LeaderView, LoadStatus, Replica, TargetChannelSet,
    TargetScope,
};
use warden_routing::{AvailabilityConfig, MetaSources, ShardAvailability};

/// Seeds for reproducible testing.
pub mod seeds {
    /// Standard test seeds that have historically found bugs.
    pub const REGRESSION_SEEDS: &[u64] = &[
        42,
        12345,
        0xDEAD_BEEF,
        999,
        7777,
        0x1337,
        0xCAFE_BABE,
        1,
        u64::MAX,
        0,
    ];

    /// Number of random seeds to test in CI.
    pub const CI_SEED_COUNT: u64 = 200;
}

/// Time constants in microseconds.
pub mod time {
    /// One second.
    pub const SECOND_US: u64 = 1_000_000;
    /// One minute.
    pub const MINUTE_US: u64 = 60 * SECOND_US;
}

static TRACING: Once = Once::new();

/// Installs a test subscriber once per process.
///
/// Honors `RUST_LOG`; silent by default.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Returns the address a test node listens on.
#[must_use]
pub fn node_addr(node_id: NodeId) -> String {
    format!("10.0.{}.{}:21123", node_id.get() / 256, node_id.get() % 256)
}

/// An in-memory cluster with an availability service over it.
#[derive(Debug)]
pub struct TestCluster {
    /// Liveness tracker.
    pub nodes: InMemoryNodeManager,
    /// Target store.
    pub targets: InMemoryTargetStore,
    /// Live distribution.
    pub distribution: InMemoryDistribution,
    /// Replica topology.
    pub replicas: InMemoryReplicaStore,
    /// Collection store.
    pub collections: InMemoryCollectionStore,
    /// The service under test.
    pub availability: ShardAvailability,
    reported: BTreeMap<NodeId, Vec<LeaderView>>,
}

impl TestCluster {
    /// Creates an empty cluster with test configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AvailabilityConfig::for_testing())
    }

    /// Creates an empty cluster.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    #[must_use]
    pub fn with_config(config: AvailabilityConfig) -> Self {
        init_tracing();

        let nodes = InMemoryNodeManager::new();
        let targets = InMemoryTargetStore::new();
        let distribution = InMemoryDistribution::new();
        let replicas = InMemoryReplicaStore::new();
        let collections = InMemoryCollectionStore::new();

        let sources = MetaSources {
            liveness: Arc::new(nodes.clone()),
            targets: Arc::new(targets.clone()),
            distribution: Arc::new(distribution.clone()),
            replicas: Arc::new(replicas.clone()),
            collections: Arc::new(collections.clone()),
        };
        let availability =
            ShardAvailability::new(sources, config).expect("test config must be valid");

        Self {
            nodes,
            targets,
            distribution,
            replicas,
            collections,
            availability,
            reported: BTreeMap::new(),
        }
    }

    /// Brings nodes online.
    pub fn add_nodes(&self, ids: impl IntoIterator<Item = u64>) {
        for id in ids {
            let node_id = NodeId::new(id);
            self.nodes.register(node_id, node_addr(node_id), 0);
        }
    }

    /// Takes a node offline.
    pub fn kill_node(&self, id: u64) {
        self.nodes.remove(NodeId::new(id));
    }

    /// Registers a replica of a collection.
    pub fn add_replica(&self, replica: u64, collection: u64, members: impl IntoIterator<Item = u64>) {
        self.replicas.put(Replica::new(
            ReplicaId::new(replica),
            CollectionId::new(collection),
            members.into_iter().map(NodeId::new),
        ));
    }

    /// Records a collection's load state.
    pub fn load_collection(
        &self,
        collection: u64,
        status: LoadStatus,
        percentage: u32,
        updated_at_us: u64,
    ) {
        self.collections.put(Collection::new(
            CollectionId::new(collection),
            status,
            percentage,
            updated_at_us,
        ));
    }

    /// Assigns the current target of a collection.
    pub fn set_target(&self, collection: u64, channels: &[(&str, &[u64])]) {
        let target = channels
            .iter()
            .fold(TargetChannelSet::new(), |target, (channel, segments)| {
                target.with_channel(*channel, segments.iter().copied().map(SegmentId::new))
            });
        self.targets.set_current(CollectionId::new(collection), target);
    }

    /// Publishes a leader view as reported by its leader, as-is.
    pub fn report(&mut self, view: LeaderView) {
        let leader_id = view.leader_id;
        let views = self.reported.entry(leader_id).or_default();
        views.retain(|v| v.channel != view.channel);
        views.push(view);
        self.distribution.update_leader_views(leader_id, views.clone());
    }

    /// Publishes a leader view after recording its readiness against the
    /// current target, as a distribution handler would.
    pub fn report_checked(&mut self, mut view: LeaderView) {
        self.availability
            .mark_serviceability(&mut view, TargetScope::Current);
        self.report(view);
    }

    /// Returns every view currently published.
    #[must_use]
    pub fn reported_views(&self) -> Vec<LeaderView> {
        self.reported.values().flatten().cloned().collect()
    }
}

impl Default for TestCluster {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a leader view whose segments all live on the leader.
#[must_use]
pub fn local_view(
    leader: u64,
    collection: u64,
    channel: &str,
    version: u64,
    segments: &[u64],
) -> LeaderView {
    segments.iter().fold(
        LeaderView::new(
            NodeId::new(leader),
            CollectionId::new(collection),
            channel,
            version,
        ),
        |view, &segment| view.with_segment(SegmentId::new(segment), NodeId::new(leader), version),
    )
}
