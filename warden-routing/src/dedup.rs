//! Leader deduplication.
//!
//! During a leader handoff a replica can briefly report two leaders for the
//! same channel. Routing to both would double-serve or reach a leader that is
//! about to retire, so only the highest-version view per replica and channel
//! survives.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};
use warden_core::{ChannelName, Error, ErrorCauses, NodeId, ReplicaId};
use warden_meta::{LeaderView, ReplicaSource};

use crate::config::TieBreak;

/// Collapses leader views to one per replica and channel.
#[derive(Clone)]
pub struct LeaderDeduplicator {
    replicas: Arc<dyn ReplicaSource>,
    tie_break: TieBreak,
}

impl LeaderDeduplicator {
    /// Creates a deduplicator.
    #[must_use]
    pub fn new(replicas: Arc<dyn ReplicaSource>, tie_break: TieBreak) -> Self {
        Self {
            replicas,
            tie_break,
        }
    }

    /// Keeps the highest-version view per replica and channel.
    ///
    /// Views whose leader belongs to no replica of the collection are stale and
    /// dropped. Survivors are keyed by leader node.
    pub fn dedup<I>(&self, views: I) -> BTreeMap<NodeId, LeaderView>
    where
        I: IntoIterator<Item = LeaderView>,
    {
        self.resolve(views, &mut ErrorCauses::new())
    }

    /// Same as [`Self::dedup`], recording an `InvalidLeaderView` cause for
    /// every view dropped because its leader has no replica.
    pub fn resolve<I>(&self, views: I, causes: &mut ErrorCauses) -> BTreeMap<NodeId, LeaderView>
    where
        I: IntoIterator<Item = LeaderView>,
    {
        let mut latest: HashMap<(ReplicaId, ChannelName), LeaderView> = HashMap::new();

        for view in views {
            let Some(replica) = self
                .replicas
                .by_collection_and_node(view.collection_id, view.leader_id)
            else {
                debug!(
                    leader_id = %view.leader_id,
                    collection_id = %view.collection_id,
                    "dropping leader view without replica"
                );
                causes.push(Error::InvalidLeaderView {
                    leader_id: view.leader_id,
                    reason: format!("no replica of {} contains the leader", view.collection_id),
                });
                continue;
            };

            match latest.entry((replica.replica_id, view.channel.clone())) {
                Entry::Vacant(slot) => {
                    slot.insert(view);
                }
                Entry::Occupied(mut slot) => {
                    if self.supersedes(&view, slot.get(), replica.replica_id) {
                        slot.insert(view);
                    }
                }
            }
        }

        latest
            .into_values()
            .map(|view| (view.leader_id, view))
            .collect()
    }

    fn supersedes(&self, candidate: &LeaderView, current: &LeaderView, replica_id: ReplicaId) -> bool {
        if candidate.version != current.version {
            return candidate.version > current.version;
        }
        if candidate.leader_id != current.leader_id {
            warn!(
                replica_id = %replica_id,
                channel = %candidate.channel,
                version = candidate.version,
                first = %current.leader_id,
                second = %candidate.leader_id,
                "two leaders report the same version"
            );
        }
        match self.tie_break {
            TieBreak::LowestNodeId => candidate.leader_id < current.leader_id,
            TieBreak::FirstSeen => false,
        }
    }
}

impl fmt::Debug for LeaderDeduplicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeaderDeduplicator")
            .field("tie_break", &self.tie_break)
            .finish_non_exhaustive()
    }
}
