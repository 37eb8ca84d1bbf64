//! Warden Core - Strongly-typed identifiers, limits, and errors for Warden.
//!
//! Warden decides whether a sharded, replicated collection is safe to serve
//! reads from. This crate holds the vocabulary shared by the metadata model
//! and the availability checks.
//!
//! # Design Principles
//!
//! - **Strongly-typed IDs**: Prevent mixing up `NodeId` with `SegmentId`
//! - **Explicit limits**: Every tunable has a bounded, validated value
//! - **Typed failures**: Every unavailability reason is a matchable variant

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod limits;
mod types;

pub use error::{Error, ErrorCauses, Result};
pub use limits::{Limits, COLLECTION_LOAD_STATUS_GRACE_US_DEFAULT, FULL_LOAD_PERCENTAGE};
pub use types::{ChannelName, CollectionId, NodeId, ReplicaId, SegmentId};
