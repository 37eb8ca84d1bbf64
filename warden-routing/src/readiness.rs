//! Shard data-readiness checker.
//!
//! A shard is ready on a leader if and only if:
//! 1. The leader is online.
//! 2. Every segment the target expects on the channel is in the leader's view.
//! 3. Every such segment is hosted by an online node.
//!
//! Partial coverage is never ready: queries would silently miss data.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;
use warden_core::{Error, Result, SegmentId};
use warden_meta::{LeaderView, TargetScope, TargetSource};

use crate::liveness::LivenessGate;

/// Checks whether a leader serves everything its shard is supposed to serve.
#[derive(Clone)]
pub struct ReadinessChecker {
    liveness: LivenessGate,
    targets: Arc<dyn TargetSource>,
}

impl ReadinessChecker {
    /// Creates a checker.
    #[must_use]
    pub fn new(liveness: LivenessGate, targets: Arc<dyn TargetSource>) -> Self {
        Self { liveness, targets }
    }

    /// Checks a leader view against the target at the given scope.
    ///
    /// # Errors
    /// Returns `NodeOffline` for an offline leader or segment owner, or
    /// `SegmentLack` for the first expected segment missing from the view.
    pub fn check_shard_ready(&self, view: &LeaderView, scope: TargetScope) -> Result<()> {
        let expected =
            self.targets
                .sealed_segments_by_channel(view.collection_id, &view.channel, scope);
        self.check_against(view, &expected)
    }

    /// Checks a leader view against an explicit set of expected segments.
    ///
    /// Missing segments are reported before offline owners, lowest ID first.
    ///
    /// # Errors
    /// Same as [`Self::check_shard_ready`].
    pub fn check_against(&self, view: &LeaderView, expected: &HashSet<SegmentId>) -> Result<()> {
        if let Err(err) = self.liveness.check(view.leader_id) {
            debug!(
                leader_id = %view.leader_id,
                collection_id = %view.collection_id,
                error = %err,
                "leader is not available"
            );
            return Err(err);
        }

        let mut expected: Vec<SegmentId> = expected.iter().copied().collect();
        expected.sort_unstable();

        if let Some(&segment_id) = expected.iter().find(|id| !view.segments.contains_key(*id)) {
            debug!(
                leader_id = %view.leader_id,
                channel = %view.channel,
                segment_id = %segment_id,
                "leader is not available due to lack of segment"
            );
            return Err(Error::SegmentLack { segment_id });
        }

        let placements = expected.iter().filter_map(|id| view.segments.get(id));
        for placement in placements {
            if let Err(err) = self.liveness.check(placement.node_id) {
                debug!(
                    leader_id = %view.leader_id,
                    segment_id = %placement.segment_id,
                    error = %err,
                    "leader is not available due to worker node unavailable"
                );
                return Err(err);
            }
        }

        Ok(())
    }

    /// Records the readiness verdict on the view itself.
    ///
    /// Distribution handlers call this when a report arrives so the leader
    /// aggregator sees why a leader cannot serve. Returns true if ready.
    pub fn mark_serviceability(&self, view: &mut LeaderView, scope: TargetScope) -> bool {
        view.unserviceable_reason = self.check_shard_ready(view, scope).err();
        view.is_serviceable()
    }
}

impl fmt::Debug for ReadinessChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessChecker")
            .field("liveness", &self.liveness)
            .finish_non_exhaustive()
    }
}
