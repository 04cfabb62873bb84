//! Content catalog: the packages a device can download for offline use.
//!
//! This module provides:
//! - `PackageRecord`: a raw catalog record as it arrives from a content registry
//! - `ContentPackage`: a validated catalog entry
//! - `ContentCatalog`: an in-memory store of packages keyed by id
//!
//! Records are validated when they enter the catalog. A malformed record (negative
//! size, priority below 1, missing id) is rejected with
//! [`Error::InvalidCatalogEntry`]; planning never has to second-guess its input.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::ports::ContentCatalogSource;
use crate::EpochMs;

/// A catalog record before validation.
///
/// Numeric fields are signed so that bad registry data (a negative size, a zero
/// priority) survives deserialization and can be reported instead of wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Unique package id
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Priority, 1 is the most important
    pub priority: i64,
    /// Package size in bytes
    pub size_bytes: i64,
    /// Content version
    #[serde(default = "default_version")]
    pub version: i64,
    /// Instant after which the package is stale and should not be planned
    #[serde(default)]
    pub expires_at_ms: Option<EpochMs>,
}

fn default_version() -> i64 {
    1
}

/// A validated content package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PackageRecord")]
pub struct ContentPackage {
    /// Unique package id
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Priority, 1 is the most important
    pub priority: u32,
    /// Package size in bytes
    pub size_bytes: u64,
    /// Content version
    pub version: u32,
    /// Instant after which the package is stale
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at_ms: Option<EpochMs>,
}

impl ContentPackage {
    /// Create a package from already-typed values.
    ///
    /// Fails if the id is empty or the priority is 0.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        priority: u32,
        size_bytes: u64,
    ) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::invalid_catalog_entry("", "id must not be empty"));
        }
        if priority < 1 {
            return Err(Error::invalid_catalog_entry(id, "priority must be >= 1"));
        }
        Ok(Self {
            id,
            name: name.into(),
            priority,
            size_bytes,
            version: 1,
            expires_at_ms: None,
        })
    }

    /// Set the content version
    #[must_use]
    pub const fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Set the expiry instant
    #[must_use]
    pub const fn with_expiry(mut self, expires_at_ms: EpochMs) -> Self {
        self.expires_at_ms = Some(expires_at_ms);
        self
    }

    /// Whether the package has expired at `now_ms`
    #[must_use]
    pub fn is_expired(&self, now_ms: EpochMs) -> bool {
        self.expires_at_ms.is_some_and(|at| now_ms >= at)
    }
}

impl TryFrom<PackageRecord> for ContentPackage {
    type Error = Error;

    fn try_from(record: PackageRecord) -> Result<Self> {
        let id = record.id;
        if id.trim().is_empty() {
            return Err(Error::invalid_catalog_entry("", "id must not be empty"));
        }
        if record.size_bytes < 0 {
            return Err(Error::invalid_catalog_entry(
                id,
                format!("size_bytes must be >= 0, got {}", record.size_bytes),
            ));
        }
        let priority = u32::try_from(record.priority)
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| {
                Error::invalid_catalog_entry(
                    id.clone(),
                    format!("priority must be >= 1, got {}", record.priority),
                )
            })?;
        let version = u32::try_from(record.version).map_err(|_| {
            Error::invalid_catalog_entry(
                id.clone(),
                format!("version must be >= 0, got {}", record.version),
            )
        })?;

        Ok(Self {
            id,
            name: record.name,
            priority,
            size_bytes: record.size_bytes.unsigned_abs(),
            version,
            expires_at_ms: record.expires_at_ms,
        })
    }
}

#[derive(Default)]
struct CatalogEntries {
    /// Packages in insertion order
    packages: Vec<ContentPackage>,
    /// Map of package id to position in `packages`
    index: HashMap<String, usize>,
}

impl CatalogEntries {
    fn reindex(&mut self) {
        self.index = self
            .packages
            .iter()
            .enumerate()
            .map(|(pos, pkg)| (pkg.id.clone(), pos))
            .collect();
    }
}

/// In-memory content catalog keyed by package id.
///
/// Insertion order is preserved; it is the tie-breaker when two packages share a
/// priority during sync planning.
pub struct ContentCatalog {
    entries: RwLock<CatalogEntries>,
}

impl ContentCatalog {
    /// Create a new empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(CatalogEntries::default()),
        }
    }

    /// Build a catalog from raw registry records.
    ///
    /// Every record is validated; the first malformed or duplicate record aborts
    /// ingestion with [`Error::InvalidCatalogEntry`].
    pub fn from_records(records: impl IntoIterator<Item = PackageRecord>) -> Result<Self> {
        let catalog = Self::new();
        for record in records {
            catalog.insert(ContentPackage::try_from(record)?)?;
        }
        info!(packages = catalog.len(), "Content catalog loaded");
        Ok(catalog)
    }

    /// Build a catalog from validated packages, rejecting duplicate ids
    pub fn from_packages(packages: impl IntoIterator<Item = ContentPackage>) -> Result<Self> {
        let catalog = Self::new();
        for package in packages {
            catalog.insert(package)?;
        }
        Ok(catalog)
    }

    /// Add a package, failing if its id is already present
    pub fn insert(&self, package: ContentPackage) -> Result<()> {
        let mut entries = self.entries.write();
        if entries.index.contains_key(&package.id) {
            return Err(Error::invalid_catalog_entry(
                package.id,
                "duplicate package id",
            ));
        }
        debug!(
            id = %package.id,
            priority = package.priority,
            size = package.size_bytes,
            "Adding package to catalog"
        );
        let pos = entries.packages.len();
        entries.index.insert(package.id.clone(), pos);
        entries.packages.push(package);
        Ok(())
    }

    /// Add or replace a package, keeping the original position on replace.
    ///
    /// Returns the previous entry if one was replaced.
    pub fn upsert(&self, package: ContentPackage) -> Option<ContentPackage> {
        let mut entries = self.entries.write();
        if let Some(&pos) = entries.index.get(&package.id) {
            debug!(id = %package.id, version = package.version, "Replacing catalog package");
            return Some(std::mem::replace(&mut entries.packages[pos], package));
        }
        let pos = entries.packages.len();
        entries.index.insert(package.id.clone(), pos);
        entries.packages.push(package);
        None
    }

    /// Remove a package by id
    pub fn remove(&self, id: &str) -> Option<ContentPackage> {
        let mut entries = self.entries.write();
        let pos = entries.index.remove(id)?;
        let removed = entries.packages.remove(pos);
        entries.reindex();
        Some(removed)
    }

    /// Get a package by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ContentPackage> {
        let entries = self.entries.read();
        entries.index.get(id).map(|&pos| entries.packages[pos].clone())
    }

    /// Check if a package id is present
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().index.contains_key(id)
    }

    /// All packages in insertion order
    #[must_use]
    pub fn list(&self) -> Vec<ContentPackage> {
        self.entries.read().packages.clone()
    }

    /// Packages that have not expired at `now_ms`, in insertion order
    #[must_use]
    pub fn live_packages(&self, now_ms: EpochMs) -> Vec<ContentPackage> {
        self.entries
            .read()
            .packages
            .iter()
            .filter(|pkg| !pkg.is_expired(now_ms))
            .cloned()
            .collect()
    }

    /// Number of packages
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().packages.len()
    }

    /// Check if the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().packages.is_empty()
    }
}

impl Default for ContentCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentCatalogSource for ContentCatalog {
    fn list_packages(&self) -> Vec<ContentPackage> {
        self.list()
    }
}
