//! Configuration for availability checks.

use warden_core::{Error, Limits, Result, FULL_LOAD_PERCENTAGE};

/// How to pick between two leader views of the same replica and channel that
/// report the same version.
///
/// Versions are unique per replica and channel in steady state, so a tie
/// points at a reporting bug. Either way the choice is deterministic and the
/// tie is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Keep the view reported by the lower node ID.
    #[default]
    LowestNodeId,
    /// Keep the view encountered first in distribution order.
    FirstSeen,
}

/// Configuration for the availability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityConfig {
    /// How long a failing collection may go without a metadata refresh before
    /// the sweep escalates it, in microseconds.
    pub grace_interval_us: u64,
    /// Load percentage at which a collection counts as fully loaded.
    pub full_load_percentage: u32,
    /// Channels per collection above which the aggregator warns.
    pub max_channels_per_collection: u32,
    /// Leader views per channel above which the aggregator warns.
    pub max_leader_views_per_channel: u32,
    /// Resolution of equal-version leader views.
    pub tie_break: TieBreak,
}

impl AvailabilityConfig {
    /// Creates config from system limits.
    #[must_use]
    pub const fn from_limits(limits: &Limits) -> Self {
        Self {
            grace_interval_us: limits.collection_load_status_grace_us,
            full_load_percentage: limits.full_load_percentage,
            max_channels_per_collection: limits.max_channels_per_collection,
            max_leader_views_per_channel: limits.max_leader_views_per_channel,
            tie_break: TieBreak::LowestNodeId,
        }
    }

    /// Creates config for testing with a small fan-out bound.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            grace_interval_us: 60_000_000, // 1 minute.
            full_load_percentage: FULL_LOAD_PERCENTAGE,
            max_channels_per_collection: 64,
            max_leader_views_per_channel: 16,
            tie_break: TieBreak::LowestNodeId,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if any field is out of range.
    pub const fn validate(&self) -> Result<()> {
        if self.grace_interval_us == 0 {
            return Err(Error::InvalidArgument {
                name: "grace_interval_us",
                reason: "must be positive",
            });
        }
        if self.full_load_percentage == 0 || self.full_load_percentage > FULL_LOAD_PERCENTAGE {
            return Err(Error::InvalidArgument {
                name: "full_load_percentage",
                reason: "must be within 1..=100",
            });
        }
        if self.max_channels_per_collection == 0 {
            return Err(Error::InvalidArgument {
                name: "max_channels_per_collection",
                reason: "must be positive",
            });
        }
        if self.max_leader_views_per_channel == 0 {
            return Err(Error::InvalidArgument {
                name: "max_leader_views_per_channel",
                reason: "must be positive",
            });
        }
        Ok(())
    }
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self::from_limits(&Limits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AvailabilityConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grace_interval_us, 60_000_000);
        assert_eq!(config.tie_break, TieBreak::LowestNodeId);
    }

    #[test]
    fn test_from_limits() {
        let mut limits = Limits::new();
        limits.collection_load_status_grace_us = 5_000_000;
        limits.max_leader_views_per_channel = 8;

        let config = AvailabilityConfig::from_limits(&limits);
        assert_eq!(config.grace_interval_us, 5_000_000);
        assert_eq!(config.max_leader_views_per_channel, 8);
        assert_eq!(config.max_channels_per_collection, 1024);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AvailabilityConfig::for_testing();
        config.grace_interval_us = 0;
        assert!(config.validate().is_err());

        let mut config = AvailabilityConfig::for_testing();
        config.full_load_percentage = 150;
        assert!(config.validate().is_err());

        let mut config = AvailabilityConfig::for_testing();
        config.max_channels_per_collection = 0;
        assert_eq!(
            config.validate(),
            Err(Error::InvalidArgument {
                name: "max_channels_per_collection",
                reason: "must be positive",
            })
        );
    }
}
