//! Warden Meta - Cluster metadata model and read-only sources.
//!
//! This crate describes what Warden reads: node liveness, target assignment,
//! the live distribution of leader views, replica topology, and collection
//! load state. Each store is reached through a narrow source trait so the
//! availability checks can be driven by real stores or by the in-memory
//! implementations provided here.
//!
//! # Snapshot Semantics
//!
//! Sources return owned snapshots. Nothing here holds a lock across calls,
//! and a store may change between two reads made during one evaluation.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod memory;
mod source;
mod types;

pub use memory::{
    InMemoryCollectionStore, InMemoryDistribution, InMemoryNodeManager, InMemoryReplicaStore,
    InMemoryTargetStore,
};
pub use source::{
    CollectionSource, DistributionSource, LivenessSource, ReplicaSource, TargetSource,
};
pub use types::{
    Collection, DmChannel, LeaderView, LoadStatus, NodeRecord, Replica, RoutingEndpoint,
    SegmentPlacement, ShardRoutingList, TargetChannelSet, TargetScope,
};
