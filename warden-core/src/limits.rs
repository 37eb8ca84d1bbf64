//! System limits and configuration bounds.
//!
//! Every tunable of the availability checks has an explicit default and an
//! explicit bound, so a misconfigured deployment fails at startup instead of
//! producing silent flapping verdicts.

/// Full load progress, in percent.
pub const FULL_LOAD_PERCENTAGE: u32 = 100;

/// Default grace window before an unavailable collection is escalated (1 minute).
pub const COLLECTION_LOAD_STATUS_GRACE_US_DEFAULT: u64 = 60 * 1_000_000;

/// System-wide limits for Warden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    // Queryability sweep.
    /// How long a failing collection may go without a metadata refresh
    /// before the sweep escalates it, in microseconds.
    pub collection_load_status_grace_us: u64,
    /// Load percentage at which a collection counts as fully loaded.
    pub full_load_percentage: u32,

    // Fan-out bounds.
    /// Maximum number of channels expected per collection.
    pub max_channels_per_collection: u32,
    /// Maximum number of leader views expected per channel.
    ///
    /// Exceeding it is not fatal but indicates stale reports piling up.
    pub max_leader_views_per_channel: u32,
}

impl Limits {
    /// Creates limits with safe defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            // Sweep: 1 minute grace, 100% means loaded.
            collection_load_status_grace_us: COLLECTION_LOAD_STATUS_GRACE_US_DEFAULT,
            full_load_percentage: FULL_LOAD_PERCENTAGE,

            // Fan-out: 1024 channels, 256 leader views per channel.
            max_channels_per_collection: 1024,
            max_leader_views_per_channel: 256,
        }
    }

    /// Validates that all limits are internally consistent.
    ///
    /// # Errors
    /// Returns an error if any limits are invalid or inconsistent.
    pub const fn validate(&self) -> crate::Result<()> {
        if self.collection_load_status_grace_us == 0 {
            return Err(crate::Error::InvalidArgument {
                name: "collection_load_status_grace_us",
                reason: "must be positive",
            });
        }

        if self.full_load_percentage == 0 || self.full_load_percentage > FULL_LOAD_PERCENTAGE {
            return Err(crate::Error::InvalidArgument {
                name: "full_load_percentage",
                reason: "must be within 1..=100",
            });
        }

        if self.max_channels_per_collection == 0 {
            return Err(crate::Error::InvalidArgument {
                name: "max_channels_per_collection",
                reason: "must be positive",
            });
        }

        if self.max_leader_views_per_channel == 0 {
            return Err(crate::Error::InvalidArgument {
                name: "max_leader_views_per_channel",
                reason: "must be positive",
            });
        }

        Ok(())
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits_are_valid() {
        let limits = Limits::new();
        assert!(limits.validate().is_ok());
        assert_eq!(limits.collection_load_status_grace_us, 60_000_000);
    }

    #[test]
    fn test_zero_grace_is_invalid() {
        let mut limits = Limits::new();
        limits.collection_load_status_grace_us = 0;
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_load_percentage_out_of_range() {
        let mut limits = Limits::new();
        limits.full_load_percentage = 101;
        assert!(limits.validate().is_err());

        limits.full_load_percentage = 0;
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_zero_fan_out_is_invalid() {
        let mut limits = Limits::new();
        limits.max_leader_views_per_channel = 0;
        assert!(matches!(
            limits.validate(),
            Err(crate::Error::InvalidArgument {
                name: "max_leader_views_per_channel",
                ..
            })
        ));
    }
}
