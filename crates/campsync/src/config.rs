//! Configuration for the unlock and sync policies.
//!
//! Every threshold the core uses (GPS accuracy, location staleness, the storage
//! cap, incremental-sync staleness tiers, cleanup warning levels) lives here
//! rather than in code. None of these values are laws; they are defaults that a
//! deployment is expected to tune.
//!
//! # Example
//!
//! ```rust
//! use campsync::Config;
//!
//! // Defaults
//! let config = Config::default();
//! assert_eq!(config.sync.system_cap_bytes, 2_000_000_000);
//!
//! // Builder
//! let config = Config::default()
//!     .with_system_cap(500_000_000)
//!     .with_max_accuracy(25.0);
//!
//! // From TOML
//! let config = Config::from_toml_str(r#"
//!     [unlock]
//!     max_accuracy_m = 30.0
//!
//!     [cleanup]
//!     warning_ratio = 0.8
//! "#).unwrap();
//! assert_eq!(config.unlock.max_location_age_secs, 300);
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::ContentPackage;
use crate::error::{Error, Result};
use crate::{
    DEFAULT_CRITICAL_RATIO, DEFAULT_MAX_ACCURACY_M, DEFAULT_MAX_LOCATION_AGE_SECS,
    DEFAULT_PROTECTED_PRIORITY, DEFAULT_SYSTEM_CAP_BYTES, DEFAULT_WARNING_RATIO,
};

/// Top-level configuration.
///
/// # Defaults
///
/// - `unlock.max_accuracy_m`: 50 m
/// - `unlock.max_location_age_secs`: 300 s
/// - `sync.system_cap_bytes`: 2,000,000,000 bytes
/// - `sync.incremental_tiers`: safety + performances after 24h, theme camps after 72h
/// - `cleanup.warning_ratio` / `cleanup.critical_ratio`: 0.90 / 0.95
/// - `cleanup.protected_priority`: 1
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Location-based unlock policy
    pub unlock: UnlockPolicy,
    /// Sync planning policy
    pub sync: SyncPolicy,
    /// Storage cleanup policy
    pub cleanup: CleanupPolicy,
}

/// Thresholds a location reading must meet to be trusted for geofence unlocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlockPolicy {
    /// Worst acceptable horizontal accuracy, in metres
    pub max_accuracy_m: f64,
    /// Oldest acceptable reading, in seconds before the evaluation instant
    pub max_location_age_secs: u64,
    /// Whether readings must come from GPS (rather than network/cell)
    pub require_gps: bool,
}

impl Default for UnlockPolicy {
    fn default() -> Self {
        Self {
            max_accuracy_m: DEFAULT_MAX_ACCURACY_M,
            max_location_age_secs: DEFAULT_MAX_LOCATION_AGE_SECS,
            require_gps: true,
        }
    }
}

impl UnlockPolicy {
    /// Maximum reading age in milliseconds
    #[must_use]
    pub fn max_location_age_ms(&self) -> i64 {
        i64::try_from(self.max_location_age_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

/// A staleness tier for incremental sync.
///
/// When more than `min_elapsed_secs` have passed since the last sync, every
/// package in the tier is included in the delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaTier {
    /// Elapsed time that must be strictly exceeded, in seconds
    pub min_elapsed_secs: u64,
    /// Delta packages fetched once the tier applies
    pub packages: Vec<ContentPackage>,
}

impl DeltaTier {
    /// Threshold in milliseconds
    #[must_use]
    pub fn min_elapsed_ms(&self) -> i64 {
        i64::try_from(self.min_elapsed_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

/// Sync planning policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    /// Hard ceiling on any requested storage budget, in bytes
    pub system_cap_bytes: u64,
    /// Incremental sync tiers, evaluated independently
    pub incremental_tiers: Vec<DeltaTier>,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            system_cap_bytes: DEFAULT_SYSTEM_CAP_BYTES,
            incremental_tiers: default_incremental_tiers(),
        }
    }
}

fn delta_package(id: &str, name: &str, priority: u32, size_bytes: u64) -> ContentPackage {
    ContentPackage {
        id: id.to_string(),
        name: name.to_string(),
        priority,
        size_bytes,
        version: 1,
        expires_at_ms: None,
    }
}

fn default_incremental_tiers() -> Vec<DeltaTier> {
    vec![
        DeltaTier {
            min_elapsed_secs: 24 * 60 * 60,
            packages: vec![
                delta_package("safety_updates", "Safety updates", 1, 1024 * 1024),
                delta_package(
                    "performances_delta",
                    "Performance schedule changes",
                    2,
                    5 * 1024 * 1024,
                ),
            ],
        },
        DeltaTier {
            min_elapsed_secs: 72 * 60 * 60,
            packages: vec![delta_package(
                "theme_camps_delta",
                "Theme camp changes",
                3,
                10 * 1024 * 1024,
            )],
        },
    ]
}

/// Storage cleanup policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupPolicy {
    /// Usage ratio at which cleanup starts
    pub warning_ratio: f64,
    /// Usage ratio reported as critical
    pub critical_ratio: f64,
    /// Packages at or above this importance (priority <= value) are never evicted
    pub protected_priority: u32,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            warning_ratio: DEFAULT_WARNING_RATIO,
            critical_ratio: DEFAULT_CRITICAL_RATIO,
            protected_priority: DEFAULT_PROTECTED_PRIORITY,
        }
    }
}

impl Config {
    /// Parse a configuration from TOML and validate it
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| Error::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check that thresholds are internally consistent
    pub fn validate(&self) -> Result<()> {
        if !(self.unlock.max_accuracy_m.is_finite() && self.unlock.max_accuracy_m > 0.0) {
            return Err(Error::config("unlock.max_accuracy_m must be > 0"));
        }
        if self.sync.system_cap_bytes == 0 {
            return Err(Error::config("sync.system_cap_bytes must be > 0"));
        }

        let mut seen = HashSet::new();
        for tier in &self.sync.incremental_tiers {
            for package in &tier.packages {
                if !seen.insert(package.id.as_str()) {
                    return Err(Error::config(format!(
                        "delta package '{}' appears in more than one tier",
                        package.id
                    )));
                }
            }
        }

        let cleanup = &self.cleanup;
        if !(cleanup.warning_ratio > 0.0 && cleanup.warning_ratio <= 1.0) {
            return Err(Error::config("cleanup.warning_ratio must be in (0, 1]"));
        }
        if !(cleanup.critical_ratio >= cleanup.warning_ratio && cleanup.critical_ratio <= 1.0) {
            return Err(Error::config(
                "cleanup.critical_ratio must be in [warning_ratio, 1]",
            ));
        }
        Ok(())
    }

    /// Set the hard storage cap
    #[must_use]
    pub const fn with_system_cap(mut self, bytes: u64) -> Self {
        self.sync.system_cap_bytes = bytes;
        self
    }

    /// Set the worst acceptable GPS accuracy
    #[must_use]
    pub fn with_max_accuracy(mut self, metres: f64) -> Self {
        self.unlock.max_accuracy_m = metres;
        self
    }

    /// Set the oldest acceptable location reading
    #[must_use]
    pub const fn with_max_location_age(mut self, secs: u64) -> Self {
        self.unlock.max_location_age_secs = secs;
        self
    }

    /// Replace the incremental sync tiers
    #[must_use]
    pub fn with_incremental_tiers(mut self, tiers: Vec<DeltaTier>) -> Self {
        self.sync.incremental_tiers = tiers;
        self
    }

    /// Set the cleanup warning and critical ratios
    #[must_use]
    pub fn with_cleanup_ratios(mut self, warning: f64, critical: f64) -> Self {
        self.cleanup.warning_ratio = warning;
        self.cleanup.critical_ratio = critical;
        self
    }
}
