//! Content bundle: the event, package catalog and gated content served by the API
//!
//! A bundle is a TOML file standing in for the content registry. Timestamps are
//! RFC 3339 strings; everything is validated on load so that a bad record stops
//! the server at start-up instead of surfacing during a sync.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use campsync::{ArtInstallation, ContentCatalog, EventWindow, PackageRecord, ThemeCamp};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

/// Bundle compiled into the binary, used when no `--content` file is given
const BUILTIN_BUNDLE: &str = include_str!("../data/festival.toml");

#[derive(Debug, Deserialize)]
struct BundleFile {
    event: Option<EventSection>,
    #[serde(default)]
    packages: Vec<PackageSection>,
    #[serde(default)]
    art_installations: Vec<ArtInstallation>,
    #[serde(default)]
    theme_camps: Vec<ThemeCamp>,
}

#[derive(Debug, Deserialize)]
struct EventSection {
    name: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    unlock_radius_km: f64,
}

#[derive(Debug, Deserialize)]
struct PackageSection {
    id: String,
    name: String,
    priority: i64,
    size_bytes: i64,
    #[serde(default = "default_version")]
    version: i64,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

fn default_version() -> i64 {
    1
}

impl From<PackageSection> for PackageRecord {
    fn from(section: PackageSection) -> Self {
        Self {
            id: section.id,
            name: section.name,
            priority: section.priority,
            size_bytes: section.size_bytes,
            version: section.version,
            expires_at_ms: section.expires_at.map(|at| at.timestamp_millis()),
        }
    }
}

/// Content loaded from a bundle
pub struct ContentBundle {
    /// The configured event, if any
    pub event: Option<EventWindow>,
    /// Downloadable packages
    pub catalog: ContentCatalog,
    /// Art installations, hidden ones included
    pub art_installations: Vec<ArtInstallation>,
    /// Theme camps, hidden ones included
    pub theme_camps: Vec<ThemeCamp>,
}

impl ContentBundle {
    /// Parse and validate a bundle from TOML
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: BundleFile = toml::from_str(s).context("Failed to parse content bundle")?;

        let event = file
            .event
            .map(|e| {
                EventWindow::new(
                    e.start.timestamp_millis(),
                    e.end.timestamp_millis(),
                    e.latitude,
                    e.longitude,
                    e.unlock_radius_km,
                )
                .map(|window| window.with_name(e.name))
            })
            .transpose()
            .context("Invalid event in content bundle")?;

        let records = file.packages.into_iter().map(PackageRecord::from);
        let catalog =
            ContentCatalog::from_records(records).context("Invalid package in content bundle")?;

        let mut ids = HashSet::new();
        for art in &file.art_installations {
            check_entry(&mut ids, "art installation", &art.id, art.gate.radius_km)?;
        }
        ids.clear();
        for camp in &file.theme_camps {
            check_entry(&mut ids, "theme camp", &camp.id, camp.gate.radius_km)?;
        }

        Ok(Self {
            event,
            catalog,
            art_installations: file.art_installations,
            theme_camps: file.theme_camps,
        })
    }

    /// Load a bundle file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read content bundle {}", path.display()))?;
        let bundle = Self::from_toml_str(&contents)?;
        info!(path = %path.display(), packages = bundle.catalog.len(), "Content bundle loaded");
        Ok(bundle)
    }

    /// The bundle shipped with the server
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_BUNDLE)
    }
}

// Locations are range-checked when `Coordinate` deserializes
fn check_entry(ids: &mut HashSet<String>, kind: &str, id: &str, radius_km: f64) -> Result<()> {
    if !ids.insert(id.to_string()) {
        bail!("Duplicate {kind} id '{id}'");
    }
    if !(radius_km.is_finite() && radius_km > 0.0) {
        bail!("Gate radius for {kind} '{id}' must be > 0 km");
    }
    Ok(())
}
