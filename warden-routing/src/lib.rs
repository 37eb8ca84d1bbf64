//! Warden Routing - Shard availability and leader routing.
//!
//! This crate decides whether a shard or a whole collection is safe to serve
//! reads from, and which leaders a query router may use for each shard. It
//! reconciles three independently changing views of the cluster: the target
//! assignment, the leader reports, and node liveness.
//!
//! # Components
//!
//! - **Liveness gate**: is a node online
//! - **Readiness checker**: does a leader serve every segment of its shard
//! - **Leader deduplicator**: one leader per replica and channel
//! - **Shard leader aggregator**: live routing endpoints per channel
//! - **Queryability evaluator**: per-collection verdicts and the periodic sweep
//!
//! # Design
//!
//! - **No internal state**: every call reads fresh snapshots, nothing is cached
//! - **All-or-nothing routing**: a partial routing table is never returned
//! - **Explicit time**: callers pass `current_time_us`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod aggregator;
mod availability;
mod config;
mod dedup;
mod liveness;
mod queryable;
mod readiness;

pub use aggregator::ShardLeaderAggregator;
pub use availability::{MetaSources, ShardAvailability};
pub use config::{AvailabilityConfig, TieBreak};
pub use dedup::LeaderDeduplicator;
pub use liveness::{check_node_available, LivenessGate};
pub use queryable::QueryabilityEvaluator;
pub use readiness::ReadinessChecker;
