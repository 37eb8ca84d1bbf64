//! Entry points used by query routers, health checks, and leader promotion.

use std::sync::Arc;

use warden_core::{CollectionId, Result};
use warden_meta::{
    CollectionSource, DistributionSource, DmChannel, LeaderView, LivenessSource, ReplicaSource,
    ShardRoutingList, TargetScope, TargetSource,
};

use crate::aggregator::ShardLeaderAggregator;
use crate::config::AvailabilityConfig;
use crate::dedup::LeaderDeduplicator;
use crate::liveness::LivenessGate;
use crate::queryable::QueryabilityEvaluator;
use crate::readiness::ReadinessChecker;

/// Handles to every metadata store the checks read from.
#[derive(Clone)]
pub struct MetaSources {
    /// Node liveness tracker.
    pub liveness: Arc<dyn LivenessSource>,
    /// Target assignment store.
    pub targets: Arc<dyn TargetSource>,
    /// Live distribution store.
    pub distribution: Arc<dyn DistributionSource>,
    /// Replica topology store.
    pub replicas: Arc<dyn ReplicaSource>,
    /// Collection store.
    pub collections: Arc<dyn CollectionSource>,
}

/// Shard availability service.
///
/// Holds no mutable state: every call reads fresh snapshots from the sources,
/// so it can be shared freely and called concurrently.
#[derive(Debug, Clone)]
pub struct ShardAvailability {
    liveness: LivenessGate,
    readiness: ReadinessChecker,
    evaluator: QueryabilityEvaluator,
}

impl ShardAvailability {
    /// Wires the checks over the given sources.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the configuration is invalid.
    pub fn new(sources: MetaSources, config: AvailabilityConfig) -> Result<Self> {
        config.validate()?;

        let liveness = LivenessGate::new(sources.liveness);
        let readiness = ReadinessChecker::new(liveness.clone(), Arc::clone(&sources.targets));
        let aggregator = ShardLeaderAggregator::new(
            sources.distribution,
            LeaderDeduplicator::new(sources.replicas, config.tie_break),
            liveness.clone(),
            config,
        );
        let evaluator =
            QueryabilityEvaluator::new(sources.collections, sources.targets, aggregator, config);

        Ok(Self {
            liveness,
            readiness,
            evaluator,
        })
    }

    /// Returns the healthy leaders of every channel of a collection.
    ///
    /// # Errors
    /// See [`QueryabilityEvaluator::shard_leaders`].
    pub fn get_shard_leaders(&self, collection_id: CollectionId) -> Result<Vec<ShardRoutingList>> {
        self.evaluator.shard_leaders(collection_id)
    }

    /// Returns the healthy leaders of the given channels.
    ///
    /// # Errors
    /// See [`QueryabilityEvaluator::shard_leaders_with_channels`].
    pub fn get_shard_leaders_with_channels(
        &self,
        collection_id: CollectionId,
        channels: &[DmChannel],
    ) -> Result<Vec<ShardRoutingList>> {
        self.evaluator
            .shard_leaders_with_channels(collection_id, channels)
    }

    /// Checks one collection.
    ///
    /// # Errors
    /// See [`QueryabilityEvaluator::is_queryable`].
    pub fn is_queryable(&self, collection_id: CollectionId) -> Result<()> {
        self.evaluator.is_queryable(collection_id)
    }

    /// Sweeps every known collection, escalating sustained failures.
    ///
    /// # Errors
    /// See [`QueryabilityEvaluator::evaluate`].
    pub fn check_collections_queryable(&self, current_time_us: u64) -> Result<()> {
        self.evaluator.check_collections_queryable(current_time_us)
    }

    /// Checks whether a leader serves its whole shard.
    ///
    /// # Errors
    /// See [`ReadinessChecker::check_shard_ready`].
    pub fn check_shard_ready(&self, view: &LeaderView, scope: TargetScope) -> Result<()> {
        self.readiness.check_shard_ready(view, scope)
    }

    /// Records the readiness verdict on a leader view. Returns true if ready.
    pub fn mark_serviceability(&self, view: &mut LeaderView, scope: TargetScope) -> bool {
        self.readiness.mark_serviceability(view, scope)
    }

    /// Returns the liveness gate.
    #[must_use]
    pub const fn liveness(&self) -> &LivenessGate {
        &self.liveness
    }
}
