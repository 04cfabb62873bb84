//! Error types for campsync.
//!
//! This module defines the [`enum@Error`] enum and [`Result`] type alias used throughout
//! the campsync library.
//!
//! # Error Categories
//!
//! None of these errors are transient. The unlock and sync components perform no
//! I/O, so every failure is a problem with the caller's input or with the data fed
//! into the library, and retrying with the same input yields the same error.
//!
//! - [`Error::InvalidCoordinate`] - Latitude/longitude outside the valid range
//! - [`Error::InvalidEventWindow`] - Event descriptor violates its invariants
//! - [`Error::Validation`] - Malformed request values (timestamps, budgets, ids)
//! - [`Error::BudgetExceedsSystemLimit`] - Requested budget above the hard cap
//! - [`Error::InvalidCatalogEntry`] - Catalog record rejected at ingestion
//! - [`Error::Config`] - Configuration issues
//!
//! Note that a missing location reading is *not* an error: it is a normal input
//! to [`UnlockEvaluator::evaluate`](crate::unlock::UnlockEvaluator::evaluate).
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashSet;
//! use campsync::{Error, SyncPlanner, SyncPolicy};
//!
//! let planner = SyncPlanner::new(SyncPolicy::default());
//! match planner.plan_full_sync(&[], 2_000_000_001, None::<&HashSet<String>>) {
//!     Err(Error::BudgetExceedsSystemLimit { requested, limit }) => {
//!         assert!(requested > limit);
//!     }
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::sync::Arc;
use thiserror::Error;

/// Result type alias for campsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in campsync operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A latitude or longitude is outside its valid range (or not finite)
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(Arc<str>),

    /// An event descriptor violates its invariants
    #[error("invalid event window: {0}")]
    InvalidEventWindow(Arc<str>),

    /// A request value failed validation
    #[error("validation failed: {0}")]
    Validation(Arc<str>),

    /// The requested storage budget is above the hard system cap
    #[error("storage budget of {requested} bytes exceeds the system limit of {limit} bytes")]
    BudgetExceedsSystemLimit {
        /// Budget requested by the caller
        requested: u64,
        /// Configured hard cap
        limit: u64,
    },

    /// A catalog record was rejected at ingestion time
    #[error("invalid catalog entry '{id}': {reason}")]
    InvalidCatalogEntry {
        /// Id of the offending record (may be empty if the id itself is missing)
        id: Arc<str>,
        /// Why the record was rejected
        reason: Arc<str>,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(Arc<str>),
}

impl Error {
    /// Create an invalid coordinate error
    #[inline]
    pub fn invalid_coordinate(msg: impl Into<String>) -> Self {
        Self::InvalidCoordinate(Arc::from(msg.into()))
    }

    /// Create an invalid event window error
    #[inline]
    pub fn invalid_event_window(msg: impl Into<String>) -> Self {
        Self::InvalidEventWindow(Arc::from(msg.into()))
    }

    /// Create a validation error
    #[inline]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(Arc::from(msg.into()))
    }

    /// Create an invalid catalog entry error
    #[inline]
    pub fn invalid_catalog_entry(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCatalogEntry {
            id: Arc::from(id.into()),
            reason: Arc::from(reason.into()),
        }
    }

    /// Create a configuration error
    #[inline]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(Arc::from(msg.into()))
    }

    /// Stable machine-readable code for this error, suitable for API responses
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidCoordinate(_) | Self::InvalidEventWindow(_) | Self::Validation(_) => {
                "validation_error"
            }
            Self::BudgetExceedsSystemLimit { .. } => "payload_too_large",
            Self::InvalidCatalogEntry { .. } => "invalid_catalog_entry",
            Self::Config(_) => "config_error",
        }
    }
}
