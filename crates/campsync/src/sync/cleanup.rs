//! Storage cleanup: the inverse of sync selection.
//!
//! When installed content crosses the warning threshold of the device budget,
//! packages are evicted starting from the least important (the largest priority
//! number) until usage drops back below the warning threshold. The most
//! important tier (safety content by default) is never evicted automatically,
//! even if that leaves the device over budget.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::ContentPackage;
use crate::config::CleanupPolicy;
use crate::error::{Error, Result};

/// How full device storage is relative to its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageLevel {
    /// Below the warning threshold
    Ok,
    /// At or above the warning threshold
    Warning,
    /// At or above the critical threshold
    Critical,
}

/// Packages to evict and the usage that results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupPlan {
    /// Level before cleanup
    pub level: StorageLevel,
    /// Bytes in use before cleanup
    pub used_bytes: u64,
    /// Device budget
    pub budget_bytes: u64,
    /// Packages to evict, in eviction order
    pub evicted: Vec<ContentPackage>,
    /// Bytes freed by the evictions
    pub freed_bytes: u64,
    /// Bytes in use after cleanup
    pub remaining_bytes: u64,
}

/// Computes eviction plans under a [`CleanupPolicy`].
#[derive(Debug, Clone, Default)]
pub struct StorageCleaner {
    policy: CleanupPolicy,
}

impl StorageCleaner {
    /// Create a cleaner
    #[must_use]
    pub const fn new(policy: CleanupPolicy) -> Self {
        Self { policy }
    }

    /// Classify `used_bytes` against `budget_bytes`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn storage_level(&self, used_bytes: u64, budget_bytes: u64) -> StorageLevel {
        if budget_bytes == 0 {
            return StorageLevel::Critical;
        }
        let ratio = used_bytes as f64 / budget_bytes as f64;
        if ratio >= self.policy.critical_ratio {
            StorageLevel::Critical
        } else if ratio >= self.policy.warning_ratio {
            StorageLevel::Warning
        } else {
            StorageLevel::Ok
        }
    }

    /// Whether a package may be evicted automatically
    #[must_use]
    pub const fn is_evictable(&self, package: &ContentPackage) -> bool {
        package.priority > self.policy.protected_priority
    }

    /// Plan evictions for the `installed` packages under `budget_bytes`.
    ///
    /// Nothing is evicted while usage is below the warning threshold. Within a
    /// priority, larger packages go first.
    ///
    /// Fails with [`Error::Validation`] if the budget is zero or the installed
    /// sizes do not sum within `u64`.
    pub fn plan_cleanup(
        &self,
        installed: &[ContentPackage],
        budget_bytes: u64,
    ) -> Result<CleanupPlan> {
        if budget_bytes == 0 {
            return Err(Error::validation("storage budget must be > 0"));
        }

        let used_bytes = installed
            .iter()
            .try_fold(0u64, |acc, pkg| acc.checked_add(pkg.size_bytes))
            .ok_or_else(|| Error::validation("installed package sizes overflow u64"))?;
        let level = self.storage_level(used_bytes, budget_bytes);

        let mut plan = CleanupPlan {
            level,
            used_bytes,
            budget_bytes,
            evicted: Vec::new(),
            freed_bytes: 0,
            remaining_bytes: used_bytes,
        };
        if level == StorageLevel::Ok {
            return Ok(plan);
        }

        let mut candidates: Vec<&ContentPackage> =
            installed.iter().filter(|pkg| self.is_evictable(pkg)).collect();
        candidates.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.size_bytes.cmp(&a.size_bytes))
                .then_with(|| a.id.cmp(&b.id))
        });

        for pkg in candidates {
            if self.storage_level(plan.remaining_bytes, budget_bytes) == StorageLevel::Ok {
                break;
            }
            debug!(
                id = %pkg.id,
                priority = pkg.priority,
                size = pkg.size_bytes,
                "Evicting package"
            );
            // remaining_bytes + freed_bytes == used_bytes
            plan.remaining_bytes = plan.remaining_bytes.saturating_sub(pkg.size_bytes);
            plan.freed_bytes = plan.freed_bytes.saturating_add(pkg.size_bytes);
            plan.evicted.push(pkg.clone());
        }

        let after = self.storage_level(plan.remaining_bytes, budget_bytes);
        if after != StorageLevel::Ok {
            warn!(
                remaining_bytes = plan.remaining_bytes,
                budget_bytes,
                "Storage still above warning threshold after evicting all unprotected content"
            );
        }
        info!(
            ?level,
            evicted = plan.evicted.len(),
            freed_bytes = plan.freed_bytes,
            "Planned storage cleanup"
        );
        Ok(plan)
    }
}
