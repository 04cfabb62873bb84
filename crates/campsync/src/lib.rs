//! # campsync - Content unlock and sync planning for festival companion apps
//!
//! campsync holds the decision logic behind an offline-first festival app: when
//! gated content becomes visible, and which content packages a device should
//! download (or evict) under a storage budget.
//!
//! ## Features
//!
//! - **Geofence and time unlocks**: content opens when the event runs, after it
//!   ends, or when the user is inside the event geofence with a trustworthy fix.
//! - **Priority-first sync**: a greedy first-fit walk over a priority-ordered
//!   catalog. Safety content is never crowded out by content that packs better.
//! - **Staleness-tiered deltas**: incremental sync fetches more categories the
//!   longer a device has been offline.
//! - **Priority-ordered cleanup**: eviction runs in the reverse order of
//!   selection and never touches the safety tier.
//!
//! Everything here is pure and synchronous. Location fixes, the current event and
//! the content registry are supplied by the caller through the traits in
//! [`ports`].
//!
//! ## Quick Start
//!
//! ```rust
//! use campsync::{Config, ContentPackage, SyncPlanner};
//!
//! let config = Config::default();
//! let planner = SyncPlanner::new(config.sync.clone());
//!
//! let catalog = vec![
//!     ContentPackage::new("safety", "Safety info", 1, 50_000_000)?,
//!     ContentPackage::new("maps", "Offline maps", 2, 2_000_000_000)?,
//! ];
//! let plan = planner.plan_full_sync(&catalog, 100_000_000, None)?;
//! assert_eq!(plan.package_ids(), vec!["safety"]);
//! # Ok::<(), campsync::Error>(())
//! ```
//!
//! ## Module Overview
//!
//! - [`catalog`]: Content packages and the in-memory catalog
//! - [`config`]: Policies and thresholds
//! - [`content`]: Location-gated art installations and theme camps
//! - [`error`]: Error types and Result alias
//! - [`geo`]: Haversine distance and coordinate validation
//! - [`ports`]: Collaborator traits (location, event, catalog, clock)
//! - [`sync`]: Full/incremental sync planning and storage cleanup
//! - [`unlock`]: Unlock evaluation

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::all, clippy::pedantic)]

pub mod catalog;
pub mod config;
pub mod content;
pub mod error;
pub mod geo;
pub mod ports;
pub mod sync;
pub mod unlock;

pub use catalog::{ContentCatalog, ContentPackage, PackageRecord};
pub use config::{CleanupPolicy, Config, DeltaTier, SyncPolicy, UnlockPolicy};
pub use content::{ArtInstallation, ContentGate, Gated, ThemeCamp};
pub use error::{Error, Result};
pub use geo::{distance_km, Coordinate};
pub use ports::{Clock, ContentCatalogSource, EventRepository, LocationProvider};
pub use sync::{CleanupPlan, StorageCleaner, StorageLevel, SyncPlan, SyncPlanner};
pub use unlock::{
    EventWindow, UnlockCondition, UnlockDecision, UnlockEvaluator, UnlockReason, UserLocation,
};

/// Milliseconds since the Unix epoch.
pub type EpochMs = i64;

/// Default hard cap on any device storage budget, in bytes.
///
/// Requests above the cap are rejected, never clamped.
/// Can be configured via [`Config::with_system_cap`].
pub const DEFAULT_SYSTEM_CAP_BYTES: u64 = 2_000_000_000;

/// Default worst acceptable GPS accuracy for geofence unlocks, in metres.
pub const DEFAULT_MAX_ACCURACY_M: f64 = 50.0;

/// Default oldest acceptable location reading, in seconds.
pub const DEFAULT_MAX_LOCATION_AGE_SECS: u64 = 5 * 60;

/// Default storage usage ratio at which cleanup starts.
pub const DEFAULT_WARNING_RATIO: f64 = 0.90;

/// Default storage usage ratio reported as critical.
pub const DEFAULT_CRITICAL_RATIO: f64 = 0.95;

/// Default priority that is protected from automatic eviction (the safety tier).
pub const DEFAULT_PROTECTED_PRIORITY: u32 = 1;
