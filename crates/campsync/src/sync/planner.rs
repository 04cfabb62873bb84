//! Priority-ordered, storage-bounded sync planning.
//!
//! ## Full sync
//!
//! The catalog is ordered pinned-first, then by ascending priority, and walked
//! once. Every package that still fits in the remaining budget is taken; a package
//! that does not fit is skipped and the walk continues, so a later, smaller
//! package can still make it in.
//!
//! This is deliberately a greedy first-fit walk and not a knapsack solver. A
//! packing that fills the budget better by dropping a higher-priority package
//! would let map tiles crowd out safety information.
//!
//! ## Incremental sync
//!
//! Staleness tiers stand in for real change tracking: the longer a device has
//! been offline, the more delta packages it fetches. Tiers are ordered by content
//! category, so safety updates always come first.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::ContentPackage;
use crate::config::SyncPolicy;
use crate::error::{Error, Result};
use crate::EpochMs;

/// Packages selected for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPlan {
    /// Packages to fetch, in download order
    pub packages: Vec<ContentPackage>,
    /// Sum of selected package sizes
    pub total_size_bytes: u64,
    /// Budget the plan was computed against
    pub budget_bytes: u64,
}

impl SyncPlan {
    fn empty(budget_bytes: u64) -> Self {
        Self {
            packages: Vec::new(),
            total_size_bytes: 0,
            budget_bytes,
        }
    }

    /// Whether nothing needs to be fetched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Ids of the selected packages, in order
    #[must_use]
    pub fn package_ids(&self) -> Vec<&str> {
        self.packages.iter().map(|p| p.id.as_str()).collect()
    }
}

/// Computes sync plans under a [`SyncPolicy`].
#[derive(Debug, Clone, Default)]
pub struct SyncPlanner {
    policy: SyncPolicy,
}

impl SyncPlanner {
    /// Create a planner
    #[must_use]
    pub const fn new(policy: SyncPolicy) -> Self {
        Self { policy }
    }

    /// The policy in force
    #[must_use]
    pub const fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    /// Plan a full sync of `catalog` into `budget_bytes`.
    ///
    /// Packages whose name (or id) is in `pinned_names` are considered before all
    /// others. Fails with [`Error::BudgetExceedsSystemLimit`] if the budget is
    /// above the configured hard cap; the budget is never silently clamped.
    pub fn plan_full_sync(
        &self,
        catalog: &[ContentPackage],
        budget_bytes: u64,
        pinned_names: Option<&HashSet<String>>,
    ) -> Result<SyncPlan> {
        let limit = self.policy.system_cap_bytes;
        if budget_bytes > limit {
            return Err(Error::BudgetExceedsSystemLimit {
                requested: budget_bytes,
                limit,
            });
        }

        let is_pinned = |pkg: &ContentPackage| {
            pinned_names
                .is_some_and(|pinned| pinned.contains(&pkg.name) || pinned.contains(&pkg.id))
        };

        // Stable sort: equal keys keep catalog order.
        let mut ordered: Vec<&ContentPackage> = catalog.iter().collect();
        ordered.sort_by_key(|pkg| (!is_pinned(pkg), pkg.priority));

        let mut plan = SyncPlan::empty(budget_bytes);
        for pkg in ordered {
            match plan.total_size_bytes.checked_add(pkg.size_bytes) {
                Some(total) if total <= budget_bytes => {
                    plan.total_size_bytes = total;
                    plan.packages.push(pkg.clone());
                }
                _ => {
                    debug!(
                        id = %pkg.id,
                        size = pkg.size_bytes,
                        remaining = budget_bytes - plan.total_size_bytes,
                        "Package does not fit, skipping"
                    );
                }
            }
        }

        info!(
            selected = plan.packages.len(),
            candidates = catalog.len(),
            total_bytes = plan.total_size_bytes,
            budget_bytes,
            "Planned full sync"
        );
        Ok(plan)
    }

    /// Plan an incremental sync for a device last synced at `last_sync_ms`.
    ///
    /// Each tier whose threshold is strictly exceeded by the elapsed time
    /// contributes its delta packages. The result is ordered by priority.
    pub fn plan_incremental_sync(
        &self,
        last_sync_ms: EpochMs,
        now_ms: EpochMs,
    ) -> Result<SyncPlan> {
        if last_sync_ms < 0 {
            return Err(Error::validation(format!(
                "last sync timestamp must be >= 0, got {last_sync_ms}"
            )));
        }

        let elapsed_ms = now_ms.saturating_sub(last_sync_ms);
        let mut plan = SyncPlan::empty(self.policy.system_cap_bytes);

        for tier in &self.policy.incremental_tiers {
            if elapsed_ms <= tier.min_elapsed_ms() {
                continue;
            }
            for pkg in &tier.packages {
                plan.total_size_bytes = plan.total_size_bytes.saturating_add(pkg.size_bytes);
                plan.packages.push(pkg.clone());
            }
        }
        plan.packages.sort_by_key(|pkg| pkg.priority);

        debug!(
            elapsed_ms,
            packages = ?plan.package_ids(),
            "Planned incremental sync"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeltaTier;

    const MB: u64 = 1_000_000;
    const HOUR_MS: i64 = 60 * 60 * 1000;

    fn pkg(id: &str, priority: u32, size_bytes: u64) -> ContentPackage {
        ContentPackage::new(id, id, priority, size_bytes).unwrap()
    }

    fn planner() -> SyncPlanner {
        SyncPlanner::new(SyncPolicy::default())
    }

    #[test]
    fn test_priority_beats_capacity() {
        let catalog = vec![pkg("A", 1, 50 * MB), pkg("B", 2, 2000 * MB)];
        let plan = planner().plan_full_sync(&catalog, 100 * MB, None).unwrap();
        assert_eq!(plan.package_ids(), vec!["A"]);
        assert_eq!(plan.total_size_bytes, 50 * MB);
        assert_eq!(plan.budget_bytes, 100 * MB);
    }

    #[test]
    fn test_skips_oversized_and_keeps_scanning() {
        let catalog = vec![
            pkg("maps", 2, 80 * MB),
            pkg("safety", 1, 10 * MB),
            pkg("art", 3, 30 * MB),
            pkg("camps", 4, 5 * MB),
        ];
        let plan = planner().plan_full_sync(&catalog, 50 * MB, None).unwrap();
        assert_eq!(plan.package_ids(), vec!["safety", "art", "camps"]);
        assert_eq!(plan.total_size_bytes, 45 * MB);
    }

    #[test]
    fn test_pinned_packages_first() {
        let catalog = vec![
            pkg("safety", 1, 10 * MB),
            pkg("music", 5, 40 * MB),
            pkg("maps", 2, 30 * MB),
        ];
        let pinned: HashSet<String> = ["music".to_string()].into_iter().collect();

        let plan = planner()
            .plan_full_sync(&catalog, 60 * MB, Some(&pinned))
            .unwrap();
        assert_eq!(plan.package_ids(), vec!["music", "safety"]);
    }

    #[test]
    fn test_pinned_matches_name() {
        let catalog = vec![
            ContentPackage::new("pkg-1", "Safety", 1, 10).unwrap(),
            ContentPackage::new("pkg-2", "Music", 9, 10).unwrap(),
        ];
        let pinned: HashSet<String> = ["Music".to_string()].into_iter().collect();
        let plan = planner().plan_full_sync(&catalog, 10, Some(&pinned)).unwrap();
        assert_eq!(plan.package_ids(), vec!["pkg-2"]);
    }

    #[test]
    fn test_equal_priority_keeps_catalog_order() {
        let catalog = vec![pkg("b", 2, 1), pkg("a", 2, 1), pkg("c", 1, 1)];
        let plan = planner().plan_full_sync(&catalog, 10, None).unwrap();
        assert_eq!(plan.package_ids(), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_budget_above_system_cap() {
        let err = planner()
            .plan_full_sync(&[], 2_000_000_001, None)
            .unwrap_err();
        assert_eq!(
            err,
            Error::BudgetExceedsSystemLimit {
                requested: 2_000_000_001,
                limit: 2_000_000_000
            }
        );
        assert!(planner().plan_full_sync(&[], 2_000_000_000, None).is_ok());
    }

    #[test]
    fn test_system_cap_is_configurable() {
        let planner = SyncPlanner::new(SyncPolicy {
            system_cap_bytes: 100,
            ..SyncPolicy::default()
        });
        assert!(planner.plan_full_sync(&[], 101, None).is_err());
    }

    #[test]
    fn test_zero_budget_takes_only_empty_packages() {
        let catalog = vec![pkg("index", 1, 0), pkg("maps", 2, 1)];
        let plan = planner().plan_full_sync(&catalog, 0, None).unwrap();
        assert_eq!(plan.package_ids(), vec!["index"]);
    }

    #[test]
    fn test_full_sync_is_idempotent() {
        let catalog = vec![pkg("a", 3, 7), pkg("b", 1, 9), pkg("c", 2, 4)];
        let first = planner().plan_full_sync(&catalog, 15, None).unwrap();
        let second = planner().plan_full_sync(&catalog, 15, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_incremental_tiers() {
        let now = 1_000 * HOUR_MS;

        let plan = planner().plan_incremental_sync(now - HOUR_MS, now).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.total_size_bytes, 0);

        let plan = planner().plan_incremental_sync(now - 25 * HOUR_MS, now).unwrap();
        assert_eq!(plan.package_ids(), vec!["safety_updates", "performances_delta"]);

        let plan = planner().plan_incremental_sync(now - 73 * HOUR_MS, now).unwrap();
        assert_eq!(
            plan.package_ids(),
            vec!["safety_updates", "performances_delta", "theme_camps_delta"]
        );
        let expected: u64 = plan.packages.iter().map(|p| p.size_bytes).sum();
        assert_eq!(plan.total_size_bytes, expected);
    }

    #[test]
    fn test_incremental_thresholds_are_strict() {
        let now = 1_000 * HOUR_MS;
        let plan = planner().plan_incremental_sync(now - 24 * HOUR_MS, now).unwrap();
        assert!(plan.is_empty());

        let plan = planner().plan_incremental_sync(now - 72 * HOUR_MS, now).unwrap();
        assert_eq!(plan.packages.len(), 2);
    }

    #[test]
    fn test_incremental_orders_by_priority() {
        let planner = SyncPlanner::new(SyncPolicy {
            incremental_tiers: vec![
                DeltaTier {
                    min_elapsed_secs: 0,
                    packages: vec![pkg("camps", 3, 1)],
                },
                DeltaTier {
                    min_elapsed_secs: 0,
                    packages: vec![pkg("safety", 1, 1)],
                },
            ],
            ..SyncPolicy::default()
        });
        let plan = planner.plan_incremental_sync(0, 1).unwrap();
        assert_eq!(plan.package_ids(), vec!["safety", "camps"]);
    }

    #[test]
    fn test_incremental_rejects_negative_timestamp() {
        assert!(matches!(
            planner().plan_incremental_sync(-1, 0),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_incremental_future_last_sync_is_empty() {
        let plan = planner().plan_incremental_sync(10 * HOUR_MS, 0).unwrap();
        assert!(plan.is_empty());
    }
}
