//! Error types for Warden availability checks.
//!
//! Every availability failure is a typed, expected outcome describing
//! transient or structural unavailability. Callers retry them; none of them
//! are fatal to the process.

use std::fmt;

use thiserror::Error;

use crate::types::{ChannelName, CollectionId, NodeId, SegmentId};

/// The result type for Warden operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by availability checks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A node has no live record in the liveness tracker.
    #[error("node offline: {node_id}")]
    NodeOffline {
        /// The node that is offline.
        node_id: NodeId,
    },

    /// A segment expected by the target is missing from a leader's view.
    #[error("segment lacks: {segment_id}")]
    SegmentLack {
        /// The missing segment.
        segment_id: SegmentId,
    },

    /// A channel has no usable subscription.
    #[error("channel {channel} lacks: {reason}")]
    ChannelLack {
        /// The channel lacking a leader.
        channel: ChannelName,
        /// Why the channel is lacking.
        reason: String,
    },

    /// No replica can serve the channel.
    #[error("channel {channel} not available: {causes}")]
    ChannelNotAvailable {
        /// The unavailable channel.
        channel: ChannelName,
        /// Every cause collected while evaluating the channel.
        causes: ErrorCauses,
    },

    /// The collection's load progress is not tracked at all.
    #[error("collection not loaded: {collection_id}")]
    CollectionNotLoaded {
        /// The collection.
        collection_id: CollectionId,
    },

    /// The collection is tracked but has not finished loading.
    #[error("collection not fully loaded: {collection_id}{}", detail_suffix(.detail.as_deref()))]
    CollectionNotFullyLoaded {
        /// The collection.
        collection_id: CollectionId,
        /// Optional detail about what is still missing.
        detail: Option<String>,
    },

    /// The collection is loaded but its channel assignment has not caught up.
    #[error("collection on recovering: {collection_id}, {detail}")]
    CollectionOnRecovering {
        /// The collection.
        collection_id: CollectionId,
        /// What the recovery is waiting for.
        detail: String,
    },

    /// A leader view violates a structural invariant.
    #[error("invalid leader view from {leader_id}: {reason}")]
    InvalidLeaderView {
        /// The node that reported the view.
        leader_id: NodeId,
        /// The violated invariant.
        reason: String,
    },

    /// An invalid argument was provided.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// The name of the argument.
        name: &'static str,
        /// Why it was invalid.
        reason: &'static str,
    },
}

fn detail_suffix(detail: Option<&str>) -> String {
    detail.map_or_else(String::new, |detail| format!(", {detail}"))
}

impl Error {
    /// Returns true if retrying later may succeed.
    ///
    /// Availability failures clear up as nodes recover and reports arrive.
    /// Configuration errors and invariant violations do not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidArgument { .. } | Self::InvalidLeaderView { .. }
        )
    }

    /// Returns true if this error, or any cause nested inside it, matches.
    pub fn has_cause<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Self) -> bool + Copy,
    {
        if predicate(self) {
            return true;
        }
        match self {
            Self::ChannelNotAvailable { causes, .. } => causes.contains(predicate),
            _ => false,
        }
    }
}

/// An ordered collection of error causes.
///
/// Used where several independent failures explain one outcome, such as every
/// unserviceable leader of a channel. Callers can match on the contained
/// kinds instead of parsing a combined message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorCauses {
    causes: Vec<Error>,
}

impl ErrorCauses {
    /// Creates an empty set of causes.
    #[must_use]
    pub const fn new() -> Self {
        Self { causes: Vec::new() }
    }

    /// Appends a cause.
    pub fn push(&mut self, cause: Error) {
        self.causes.push(cause);
    }

    /// Returns true if no cause was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }

    /// Returns the number of recorded causes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.causes.len()
    }

    /// Returns an iterator over the causes in the order they were recorded.
    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.causes.iter()
    }

    /// Returns true if any cause, searched recursively, matches.
    pub fn contains<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Error) -> bool + Copy,
    {
        self.causes.iter().any(|cause| cause.has_cause(predicate))
    }
}

impl From<Error> for ErrorCauses {
    fn from(cause: Error) -> Self {
        Self {
            causes: vec![cause],
        }
    }
}

impl FromIterator<Error> for ErrorCauses {
    fn from_iter<I: IntoIterator<Item = Error>>(iter: I) -> Self {
        Self {
            causes: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ErrorCauses {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.causes.iter()
    }
}

impl fmt::Display for ErrorCauses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.causes.is_empty() {
            return f.write_str("no readable leader");
        }
        for (i, cause) in self.causes.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{cause}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NodeOffline {
            node_id: NodeId::new(3),
        };
        assert_eq!(format!("{err}"), "node offline: node-3");

        let err = Error::CollectionNotFullyLoaded {
            collection_id: CollectionId::new(1),
            detail: None,
        };
        assert_eq!(format!("{err}"), "collection not fully loaded: collection-1");

        let err = Error::CollectionNotFullyLoaded {
            collection_id: CollectionId::new(1),
            detail: Some("still have unwatched channels".to_string()),
        };
        assert_eq!(
            format!("{err}"),
            "collection not fully loaded: collection-1, still have unwatched channels"
        );
    }

    #[test]
    fn test_causes_display_joins_in_order() {
        let causes: ErrorCauses = vec![
            Error::SegmentLack {
                segment_id: SegmentId::new(2),
            },
            Error::NodeOffline {
                node_id: NodeId::new(9),
            },
        ]
        .into_iter()
        .collect();

        assert_eq!(causes.len(), 2);
        assert_eq!(format!("{causes}"), "segment lacks: segment-2; node offline: node-9");
        assert_eq!(format!("{}", ErrorCauses::new()), "no readable leader");
    }

    #[test]
    fn test_has_cause_searches_nested_causes() {
        let err = Error::ChannelNotAvailable {
            channel: ChannelName::from("ch1"),
            causes: Error::SegmentLack {
                segment_id: SegmentId::new(2),
            }
            .into(),
        };

        assert!(err.has_cause(|e| matches!(e, Error::ChannelNotAvailable { .. })));
        assert!(err.has_cause(
            |e| matches!(e, Error::SegmentLack { segment_id } if segment_id.get() == 2)
        ));
        assert!(!err.has_cause(|e| matches!(e, Error::NodeOffline { .. })));
    }

    #[test]
    fn test_retryable() {
        assert!(Error::CollectionNotLoaded {
            collection_id: CollectionId::new(1)
        }
        .is_retryable());
        assert!(!Error::InvalidArgument {
            name: "grace_interval_us",
            reason: "must be positive",
        }
        .is_retryable());
    }
}
