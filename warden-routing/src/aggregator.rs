//! Shard leader aggregation.
//!
//! For each channel, turns the raw leader reports into the list of endpoints
//! a query router may use. Routing is all-or-nothing: one channel without a
//! serviceable, live leader fails the whole request, and an empty routing list
//! is never produced.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};
use warden_core::{ChannelName, CollectionId, Error, ErrorCauses, Result};
use warden_meta::{DistributionSource, DmChannel, LeaderView, RoutingEndpoint, ShardRoutingList};

use crate::config::AvailabilityConfig;
use crate::dedup::LeaderDeduplicator;
use crate::liveness::LivenessGate;

/// Builds per-channel routing lists from leader views.
#[derive(Clone)]
pub struct ShardLeaderAggregator {
    distribution: Arc<dyn DistributionSource>,
    dedup: LeaderDeduplicator,
    liveness: LivenessGate,
    config: AvailabilityConfig,
}

impl ShardLeaderAggregator {
    /// Creates an aggregator.
    #[must_use]
    pub fn new(
        distribution: Arc<dyn DistributionSource>,
        dedup: LeaderDeduplicator,
        liveness: LivenessGate,
        config: AvailabilityConfig,
    ) -> Self {
        Self {
            distribution,
            dedup,
            liveness,
            config,
        }
    }

    /// Builds one routing list per channel, in channel order.
    ///
    /// # Errors
    /// Returns `ChannelNotAvailable` for the first channel without a
    /// serviceable, live leader. No partial result is returned.
    pub fn build_routing_lists(
        &self,
        collection_id: CollectionId,
        channels: &[DmChannel],
    ) -> Result<Vec<ShardRoutingList>> {
        if channels.len() > self.config.max_channels_per_collection as usize {
            warn!(
                collection_id = %collection_id,
                count = channels.len(),
                max = self.config.max_channels_per_collection,
                "too many channels for collection"
            );
        }

        channels
            .iter()
            .map(|channel| self.build_channel(collection_id, &channel.channel))
            .collect()
    }

    fn build_channel(
        &self,
        collection_id: CollectionId,
        channel: &ChannelName,
    ) -> Result<ShardRoutingList> {
        let candidates = self.distribution.leader_views_by_channel(channel);
        let mut causes = ErrorCauses::new();

        if candidates.is_empty() {
            causes.push(Error::ChannelLack {
                channel: channel.clone(),
                reason: "channel not subscribed".to_string(),
            });
        }

        if candidates.len() > self.config.max_leader_views_per_channel as usize {
            warn!(
                channel = %channel,
                count = candidates.len(),
                max = self.config.max_leader_views_per_channel,
                "too many leader views for channel"
            );
        }

        let mut readable = Vec::with_capacity(candidates.len());
        for view in candidates {
            match Self::unserviceable_cause(collection_id, channel, &view) {
                Some(cause) => {
                    debug!(
                        channel = %channel,
                        leader_id = %view.leader_id,
                        error = %cause,
                        "excluding unserviceable leader"
                    );
                    causes.push(cause);
                }
                None => readable.push(view),
            }
        }

        if readable.is_empty() {
            return Err(Self::not_available(channel, causes));
        }

        let leaders = self.dedup.resolve(readable, &mut causes);
        let mut endpoints = Vec::with_capacity(leaders.len());
        for leader_id in leaders.into_keys() {
            match self.liveness.check(leader_id) {
                Ok(record) => endpoints.push(RoutingEndpoint {
                    node_id: record.node_id,
                    address: record.address,
                }),
                Err(err) => {
                    // The node went away after reporting; others may still serve.
                    debug!(channel = %channel, leader_id = %leader_id, "skipping vanished leader");
                    causes.push(err);
                }
            }
        }

        if endpoints.is_empty() {
            return Err(Self::not_available(channel, causes));
        }

        Ok(ShardRoutingList {
            channel: channel.clone(),
            endpoints,
        })
    }

    fn unserviceable_cause(
        collection_id: CollectionId,
        channel: &ChannelName,
        view: &LeaderView,
    ) -> Option<Error> {
        if view.collection_id != collection_id || view.channel != *channel {
            return Some(Error::InvalidLeaderView {
                leader_id: view.leader_id,
                reason: format!(
                    "reported {}/{} while serving {collection_id}/{channel}",
                    view.collection_id, view.channel
                ),
            });
        }
        view.unserviceable_reason.clone()
    }

    fn not_available(channel: &ChannelName, causes: ErrorCauses) -> Error {
        warn!(
            channel = %channel,
            error = %causes,
            "channel is not available in any replica"
        );
        Error::ChannelNotAvailable {
            channel: channel.clone(),
            causes,
        }
    }
}

impl fmt::Debug for ShardLeaderAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardLeaderAggregator")
            .field("dedup", &self.dedup)
            .field("liveness", &self.liveness)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
