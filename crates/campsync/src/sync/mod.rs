//! Content sync planning
//!
//! This module handles:
//! - Full and incremental sync planning under a storage budget
//! - Storage cleanup when installed content crosses the warning threshold

pub mod cleanup;
pub mod planner;

// Re-exports
pub use self::cleanup::{CleanupPlan, StorageCleaner, StorageLevel};
pub use self::planner::{SyncPlan, SyncPlanner};
