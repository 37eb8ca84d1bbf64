//! Strongly-typed identifiers for Warden entities.
//!
//! Explicit types prevent bugs from mixing up a node with the segment it
//! hosts. All numeric IDs are 64-bit to match the metadata stores.

use std::fmt;

/// Macro to generate strongly-typed ID wrappers.
///
/// Each ID type wraps a u64 and provides:
/// - Type safety (can't mix `NodeId` with `SegmentId`)
/// - Debug/Display formatting
/// - Zero-cost abstraction (same as raw u64)
macro_rules! define_id {
    ($name:ident, $prefix:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new ID from a raw u64 value.
            #[inline]
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw u64 value.
            #[inline]
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $prefix, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self::new(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.get()
            }
        }
    };
}

// Worker fleet.
define_id!(NodeId, "node", "Unique identifier for a worker node in the cluster.");
define_id!(ReplicaId, "replica", "Unique identifier for a replica of a collection.");

// Data layout.
define_id!(CollectionId, "collection", "Unique identifier for a collection.");
define_id!(SegmentId, "segment", "Unique identifier for an immutable data segment.");

/// Name of a channel: a logical partition of a collection's update stream.
///
/// A channel together with the segments assigned to it forms a shard.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ChannelName(String);

impl ChannelName {
    /// Creates a channel name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel({})", self.0)
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ChannelName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for ChannelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
