//! Collaborator interfaces consumed by the unlock and sync components.
//!
//! The core never reaches out for a location fix, the current event or the
//! content registry on its own. Callers inject implementations of these traits;
//! the static implementations here back tests and the demo server.

use chrono::Utc;

use crate::catalog::ContentPackage;
use crate::unlock::{EventWindow, UserLocation};
use crate::EpochMs;

/// Source of the device's current location.
pub trait LocationProvider: Send + Sync {
    /// Latest location fix, or `None` if permission is missing or no fix exists yet
    fn current_location(&self) -> Option<UserLocation>;
}

/// Source of the currently configured event.
pub trait EventRepository: Send + Sync {
    /// The active event, or `None` if no event is configured
    fn current_event(&self) -> Option<EventWindow>;
}

/// Source of downloadable content packages.
pub trait ContentCatalogSource: Send + Sync {
    /// All known packages
    fn list_packages(&self) -> Vec<ContentPackage>;
}

/// Wall clock, injectable so evaluations are deterministic under test.
pub trait Clock: Send + Sync {
    /// Current instant in epoch milliseconds
    fn now_ms(&self) -> EpochMs;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> EpochMs {
        Utc::now().timestamp_millis()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub EpochMs);

impl Clock for FixedClock {
    fn now_ms(&self) -> EpochMs {
        self.0
    }
}

/// Event repository holding a single, fixed event (or none).
#[derive(Debug, Clone, Default)]
pub struct StaticEventRepository {
    event: Option<EventWindow>,
}

impl StaticEventRepository {
    /// Repository that always returns `event`
    #[must_use]
    pub const fn new(event: Option<EventWindow>) -> Self {
        Self { event }
    }
}

impl EventRepository for StaticEventRepository {
    fn current_event(&self) -> Option<EventWindow> {
        self.event.clone()
    }
}

/// Location provider returning a fixed reading (or none).
#[derive(Debug, Clone, Default)]
pub struct StaticLocation {
    location: Option<UserLocation>,
}

impl StaticLocation {
    /// Provider that always returns `location`
    #[must_use]
    pub const fn new(location: Option<UserLocation>) -> Self {
        Self { location }
    }
}

impl LocationProvider for StaticLocation {
    fn current_location(&self) -> Option<UserLocation> {
        self.location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        assert_eq!(FixedClock(42).now_ms(), 42);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2024-01-01T00:00:00Z
        assert!(SystemClock.now_ms() > 1_704_067_200_000);
    }

    #[test]
    fn test_static_collaborators() {
        assert!(StaticEventRepository::default().current_event().is_none());
        assert!(StaticLocation::default().current_location().is_none());

        let location = UserLocation::new(-33.9, 18.4, Some(5.0), true, 0).unwrap();
        let provider = StaticLocation::new(Some(location.clone()));
        assert_eq!(provider.current_location(), Some(location));
    }
}
