//! Collection queryability.
//!
//! A collection is queryable when its load has completed, its channels are
//! assigned in the current target, and every channel has a live,
//! serviceable leader. The periodic sweep only escalates a collection that
//! has stayed unqueryable past a grace window, which absorbs heartbeat and
//! report jitter.

use std::fmt;
use std::sync::Arc;

use tracing::warn;
use warden_core::{CollectionId, Error, Result};
use warden_meta::{
    Collection, CollectionSource, DmChannel, LoadStatus, ShardRoutingList, TargetScope,
    TargetSource,
};

use crate::aggregator::ShardLeaderAggregator;
use crate::config::AvailabilityConfig;

const RECOVERING_DETAIL: &str = "loaded collection do not found any channel in target, may be in recovery";
const UNWATCHED_DETAIL: &str = "still have unwatched channels or loaded segments";

/// Decides whether collections can serve reads.
#[derive(Clone)]
pub struct QueryabilityEvaluator {
    collections: Arc<dyn CollectionSource>,
    targets: Arc<dyn TargetSource>,
    aggregator: ShardLeaderAggregator,
    config: AvailabilityConfig,
}

impl QueryabilityEvaluator {
    /// Creates an evaluator.
    #[must_use]
    pub fn new(
        collections: Arc<dyn CollectionSource>,
        targets: Arc<dyn TargetSource>,
        aggregator: ShardLeaderAggregator,
        config: AvailabilityConfig,
    ) -> Self {
        Self {
            collections,
            targets,
            aggregator,
            config,
        }
    }

    /// Checks that the collection has finished loading.
    ///
    /// A `Loaded` status counts as fully loaded whatever the percentage says,
    /// since the percentage may lag behind a background refresh.
    ///
    /// # Errors
    /// Returns `CollectionNotLoaded` if load progress is untracked, or
    /// `CollectionNotFullyLoaded` if it is below full.
    pub fn check_load_status(&self, collection_id: CollectionId) -> Result<()> {
        let Some(percentage) = self.collections.load_percentage(collection_id) else {
            let err = Error::CollectionNotLoaded { collection_id };
            warn!(collection_id = %collection_id, error = %err, "collection load is not tracked");
            return Err(err);
        };

        let loaded = self
            .collections
            .collection(collection_id)
            .is_some_and(|collection| collection.status == LoadStatus::Loaded);
        let percentage = if loaded {
            self.config.full_load_percentage
        } else {
            percentage
        };

        if percentage < self.config.full_load_percentage {
            warn!(
                collection_id = %collection_id,
                percentage,
                "collection is not fully loaded"
            );
            return Err(Error::CollectionNotFullyLoaded {
                collection_id,
                detail: None,
            });
        }
        Ok(())
    }

    /// Returns the healthy leaders of every channel of a loaded collection.
    ///
    /// # Errors
    /// Returns the load-status errors of [`Self::check_load_status`],
    /// `CollectionOnRecovering` if the current target has no channel, or the
    /// first channel's `ChannelNotAvailable`.
    pub fn shard_leaders(&self, collection_id: CollectionId) -> Result<Vec<ShardRoutingList>> {
        let (_, lists) = self.resolve(collection_id)?;
        Ok(lists)
    }

    /// Returns the healthy leaders of the given channels, in the given order.
    ///
    /// Load status and target are not consulted.
    ///
    /// # Errors
    /// Returns the first channel's `ChannelNotAvailable`.
    pub fn shard_leaders_with_channels(
        &self,
        collection_id: CollectionId,
        channels: &[DmChannel],
    ) -> Result<Vec<ShardRoutingList>> {
        self.aggregator.build_routing_lists(collection_id, channels)
    }

    /// Checks that every channel is watched and every segment is loaded.
    ///
    /// # Errors
    /// Returns the errors of [`Self::shard_leaders`], or
    /// `CollectionNotFullyLoaded` if fewer routing lists than channels were
    /// produced.
    pub fn is_queryable(&self, collection_id: CollectionId) -> Result<()> {
        let (channels, lists) = self.resolve(collection_id)?;
        if lists.len() != channels.len() {
            return Err(Error::CollectionNotFullyLoaded {
                collection_id,
                detail: Some(UNWATCHED_DETAIL.to_string()),
            });
        }
        Ok(())
    }

    /// Sweeps every known collection.
    ///
    /// # Errors
    /// Returns the first escalated failure; see [`Self::evaluate`].
    pub fn check_collections_queryable(&self, current_time_us: u64) -> Result<()> {
        self.evaluate(&self.collections.all_collections(), current_time_us)
    }

    /// Evaluates the given collections and escalates the first sustained failure.
    ///
    /// A failure is escalated only if the collection still exists and its
    /// load status has not been refreshed within the grace interval. Earlier
    /// failures inside the window are absorbed.
    ///
    /// # Errors
    /// Returns the first escalated failure.
    pub fn evaluate(&self, collections: &[Collection], current_time_us: u64) -> Result<()> {
        for collection in collections {
            let Err(err) = self.is_queryable(collection.collection_id) else {
                continue;
            };

            let stale_for_us = current_time_us.saturating_sub(collection.updated_at_us);
            if stale_for_us < self.config.grace_interval_us
                || !self.collections.exists(collection.collection_id)
            {
                continue;
            }

            warn!(
                collection_id = %collection.collection_id,
                last_updated_us = collection.updated_at_us,
                stale_for_us,
                grace_interval_us = self.config.grace_interval_us,
                error = %err,
                "collection not queryable"
            );
            return Err(err);
        }
        Ok(())
    }

    fn resolve(
        &self,
        collection_id: CollectionId,
    ) -> Result<(Vec<DmChannel>, Vec<ShardRoutingList>)> {
        self.check_load_status(collection_id)?;

        let channels = self
            .targets
            .dm_channels_by_collection(collection_id, TargetScope::Current);
        if channels.is_empty() {
            let err = Error::CollectionOnRecovering {
                collection_id,
                detail: RECOVERING_DETAIL.to_string(),
            };
            warn!(collection_id = %collection_id, error = %err, "failed to get channels");
            return Err(err);
        }

        let lists = self.aggregator.build_routing_lists(collection_id, &channels)?;
        Ok((channels, lists))
    }
}

impl fmt::Debug for QueryabilityEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryabilityEvaluator")
            .field("aggregator", &self.aggregator)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
