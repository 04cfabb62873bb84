//! campsync server library
//!
//! Re-exports the server modules for use by the binary and integration tests.

use std::sync::Arc;

use campsync::ports::StaticEventRepository;
use campsync::{
    ArtInstallation, Clock, Config, ContentCatalog, EventRepository, StorageCleaner,
    SyncPlanner, ThemeCamp, UnlockEvaluator,
};

pub mod api;
pub mod bundle;
pub mod error;

use bundle::ContentBundle;

/// Shared application state
pub struct AppState {
    /// Content packages offered for download
    pub catalog: Arc<ContentCatalog>,
    /// Source of the current event
    pub events: Arc<dyn EventRepository>,
    /// All art installations, hidden ones included
    pub art_installations: Vec<ArtInstallation>,
    /// All theme camps, hidden ones included
    pub theme_camps: Vec<ThemeCamp>,
    /// Server time
    pub clock: Arc<dyn Clock>,
    /// Prefix for package download URLs
    pub download_base_url: String,
    /// Full and incremental sync planning
    pub planner: SyncPlanner,
    /// Storage eviction planning
    pub cleaner: StorageCleaner,
    /// Unlock rules
    pub unlock: UnlockEvaluator,
}

impl AppState {
    /// Build state from a policy configuration and a loaded content bundle
    pub fn new(
        config: Config,
        bundle: ContentBundle,
        clock: Arc<dyn Clock>,
        download_base_url: impl Into<String>,
    ) -> Self {
        let download_base_url = download_base_url.into().trim_end_matches('/').to_string();
        Self {
            catalog: Arc::new(bundle.catalog),
            events: Arc::new(StaticEventRepository::new(bundle.event)),
            art_installations: bundle.art_installations,
            theme_camps: bundle.theme_camps,
            clock,
            download_base_url,
            planner: SyncPlanner::new(config.sync),
            cleaner: StorageCleaner::new(config.cleanup),
            unlock: UnlockEvaluator::new(config.unlock),
        }
    }

    /// Download URL for a package version
    pub fn download_url(&self, package_id: &str, version: u32) -> String {
        format!("{}/content/{package_id}/v{version}", self.download_base_url)
    }
}
