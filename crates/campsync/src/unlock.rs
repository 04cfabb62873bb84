//! Geofence and time based content unlocking.
//!
//! Gated festival content becomes visible once any of these hold:
//!
//! 1. the event has ended (permanent, there is no path back to locked),
//! 2. the event is running,
//! 3. the user shares a trustworthy location inside the event geofence.
//!
//! Anything else yields [`UnlockDecision::Locked`] with the list of things the
//! user could do about it, most actionable first.
//!
//! # Example
//!
//! ```rust
//! use campsync::unlock::{
//!     EventWindow, UnlockDecision, UnlockEvaluator, UnlockReason, UserLocation,
//! };
//! use campsync::UnlockPolicy;
//!
//! const DAY_MS: i64 = 86_400_000;
//! let event = EventWindow::new(10 * DAY_MS, 17 * DAY_MS, -32.5, 19.9, 5.0).unwrap();
//! let evaluator = UnlockEvaluator::new(UnlockPolicy::default());
//!
//! let now = 3 * DAY_MS;
//! let fix = UserLocation::new(-32.5, 19.9, Some(8.0), true, now).unwrap();
//! let decision = evaluator.evaluate(Some(&event), Some(&fix), true, now);
//! assert!(matches!(
//!     decision,
//!     UnlockDecision::Unlocked { reason: UnlockReason::WithinBoundary, .. }
//! ));
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::UnlockPolicy;
use crate::error::{Error, Result};
use crate::geo::{self, Coordinate};
use crate::ports::{Clock, EventRepository, LocationProvider};
use crate::EpochMs;

/// Milliseconds in a day
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Time window and geofence of a festival event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EventWindowRecord")]
pub struct EventWindow {
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Event start
    pub start_ms: EpochMs,
    /// Event end
    pub end_ms: EpochMs,
    /// Geofence center
    pub center: Coordinate,
    /// Geofence radius in kilometres
    pub unlock_radius_km: f64,
}

impl EventWindow {
    /// Create an event window.
    ///
    /// Fails if `start_ms > end_ms`, the radius is not positive, or the center is
    /// not a valid coordinate.
    pub fn new(
        start_ms: EpochMs,
        end_ms: EpochMs,
        center_lat: f64,
        center_lng: f64,
        unlock_radius_km: f64,
    ) -> Result<Self> {
        let center = Coordinate::new(center_lat, center_lng)?;
        if start_ms > end_ms {
            return Err(Error::invalid_event_window(format!(
                "start {start_ms} is after end {end_ms}"
            )));
        }
        if !(unlock_radius_km.is_finite() && unlock_radius_km > 0.0) {
            return Err(Error::invalid_event_window(format!(
                "unlock radius must be > 0 km, got {unlock_radius_km}"
            )));
        }
        Ok(Self {
            name: None,
            start_ms,
            end_ms,
            center,
            unlock_radius_km,
        })
    }

    /// Set the display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether `now_ms` falls within `[start, end)`
    #[must_use]
    pub const fn is_active(&self, now_ms: EpochMs) -> bool {
        now_ms >= self.start_ms && now_ms < self.end_ms
    }

    /// Whether the event is over at `now_ms`
    #[must_use]
    pub const fn has_ended(&self, now_ms: EpochMs) -> bool {
        now_ms >= self.end_ms
    }
}

#[derive(Deserialize)]
struct EventWindowRecord {
    #[serde(default)]
    name: Option<String>,
    start_ms: EpochMs,
    end_ms: EpochMs,
    center: Coordinate,
    unlock_radius_km: f64,
}

impl TryFrom<EventWindowRecord> for EventWindow {
    type Error = Error;

    fn try_from(record: EventWindowRecord) -> Result<Self> {
        let mut window = Self::new(
            record.start_ms,
            record.end_ms,
            record.center.latitude,
            record.center.longitude,
            record.unlock_radius_km,
        )?;
        window.name = record.name;
        Ok(window)
    }
}

/// A location reading from the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UserLocationRecord")]
pub struct UserLocation {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Horizontal accuracy in metres, if the platform reported one
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    /// Whether the reading came from GPS rather than network positioning
    #[serde(default)]
    pub is_from_gps: bool,
    /// When the reading was taken
    pub timestamp_ms: EpochMs,
}

impl UserLocation {
    /// Create a reading, rejecting out-of-range coordinates
    pub fn new(
        latitude: f64,
        longitude: f64,
        accuracy_m: Option<f64>,
        is_from_gps: bool,
        timestamp_ms: EpochMs,
    ) -> Result<Self> {
        geo::validate(latitude, longitude)?;
        Ok(Self {
            latitude,
            longitude,
            accuracy_m,
            is_from_gps,
            timestamp_ms,
        })
    }

    /// The reading's position
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

#[derive(Deserialize)]
struct UserLocationRecord {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    accuracy_m: Option<f64>,
    #[serde(default)]
    is_from_gps: bool,
    timestamp_ms: EpochMs,
}

impl TryFrom<UserLocationRecord> for UserLocation {
    type Error = Error;

    fn try_from(record: UserLocationRecord) -> Result<Self> {
        Self::new(
            record.latitude,
            record.longitude,
            record.accuracy_m,
            record.is_from_gps,
            record.timestamp_ms,
        )
    }
}

/// Why content was unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockReason {
    /// The event is over
    EventEnded,
    /// The event is running
    EventActive,
    /// The user is inside the event geofence
    WithinBoundary,
}

/// Something the user can do to unlock content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnlockCondition {
    /// Turn on location sharing
    EnableLocation,
    /// Grant permission or wait for a first fix
    ProvideLocation,
    /// The reading is too coarse, too old, or not from GPS
    ImproveGpsAccuracy,
    /// Get within the geofence
    MoveCloser {
        /// Kilometres to the geofence edge
        remaining_km: f64,
    },
    /// Content opens when the event starts
    WaitForEvent {
        /// Whole days until the event starts, rounded up
        days_remaining: u32,
    },
}

/// Outcome of an unlock evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnlockDecision {
    /// Content is visible
    Unlocked {
        /// Why
        reason: UnlockReason,
        /// Instant the unlock took effect
        unlocked_at_ms: EpochMs,
    },
    /// Content is hidden
    Locked {
        /// What the user can do, most actionable first
        conditions: Vec<UnlockCondition>,
        /// When content opens without user action
        #[serde(default, skip_serializing_if = "Option::is_none")]
        estimated_unlock_ms: Option<EpochMs>,
    },
    /// No event is configured
    NoEvent,
}

impl UnlockDecision {
    /// Whether content is visible
    #[must_use]
    pub const fn is_unlocked(&self) -> bool {
        matches!(self, Self::Unlocked { .. })
    }
}

/// Whole days from `from_ms` until `to_ms`, rounded up, never negative
#[must_use]
pub fn days_until(from_ms: EpochMs, to_ms: EpochMs) -> u32 {
    let remaining = to_ms.saturating_sub(from_ms);
    if remaining <= 0 {
        return 0;
    }
    let days = remaining / DAY_MS + i64::from(remaining % DAY_MS != 0);
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// Evaluates unlock rules against a policy.
#[derive(Debug, Clone, Default)]
pub struct UnlockEvaluator {
    policy: UnlockPolicy,
}

impl UnlockEvaluator {
    /// Create an evaluator with the given location policy
    #[must_use]
    pub const fn new(policy: UnlockPolicy) -> Self {
        Self { policy }
    }

    /// The location policy in force
    #[must_use]
    pub const fn policy(&self) -> &UnlockPolicy {
        &self.policy
    }

    /// Whether a reading is accurate, GPS-sourced and fresh enough at `now_ms`.
    ///
    /// Readings stamped after `now_ms` are treated as fresh.
    #[must_use]
    pub fn is_location_valid(&self, location: &UserLocation, now_ms: EpochMs) -> bool {
        let accurate = location
            .accuracy_m
            .is_some_and(|acc| acc <= self.policy.max_accuracy_m);
        let gps = location.is_from_gps || !self.policy.require_gps;
        let age = now_ms.saturating_sub(location.timestamp_ms);
        accurate && gps && age <= self.policy.max_location_age_ms()
    }

    /// Decide whether gated content is visible.
    ///
    /// Rules are applied in order and the first match wins.
    #[must_use]
    pub fn evaluate(
        &self,
        event: Option<&EventWindow>,
        location: Option<&UserLocation>,
        location_sharing_enabled: bool,
        now_ms: EpochMs,
    ) -> UnlockDecision {
        let Some(event) = event else {
            return UnlockDecision::NoEvent;
        };

        if event.has_ended(now_ms) {
            return UnlockDecision::Unlocked {
                reason: UnlockReason::EventEnded,
                unlocked_at_ms: event.end_ms,
            };
        }

        if event.is_active(now_ms) {
            return UnlockDecision::Unlocked {
                reason: UnlockReason::EventActive,
                unlocked_at_ms: event.start_ms,
            };
        }

        let mut distance_km = None;
        if location_sharing_enabled {
            if let Some(location) = location {
                if !self.is_location_valid(location, now_ms) {
                    debug!(
                        accuracy_m = ?location.accuracy_m,
                        is_from_gps = location.is_from_gps,
                        age_ms = now_ms.saturating_sub(location.timestamp_ms),
                        "Location reading rejected"
                    );
                    return UnlockDecision::Locked {
                        conditions: vec![UnlockCondition::ImproveGpsAccuracy],
                        estimated_unlock_ms: Some(event.start_ms),
                    };
                }

                let distance = event.center.distance_km_to(&location.coordinate());
                if distance <= event.unlock_radius_km {
                    debug!(distance_km = distance, "User inside event geofence");
                    return UnlockDecision::Unlocked {
                        reason: UnlockReason::WithinBoundary,
                        unlocked_at_ms: now_ms,
                    };
                }
                distance_km = Some(distance);
            }
        }

        let first = if !location_sharing_enabled {
            UnlockCondition::EnableLocation
        } else {
            match distance_km {
                None => UnlockCondition::ProvideLocation,
                Some(distance) => UnlockCondition::MoveCloser {
                    remaining_km: distance - event.unlock_radius_km,
                },
            }
        };

        UnlockDecision::Locked {
            conditions: vec![
                first,
                UnlockCondition::WaitForEvent {
                    days_remaining: days_until(now_ms, event.start_ms),
                },
            ],
            estimated_unlock_ms: Some(event.start_ms),
        }
    }

    /// Evaluate using injected collaborators for the event, location and clock
    #[must_use]
    pub fn evaluate_current(
        &self,
        events: &dyn EventRepository,
        locations: &dyn LocationProvider,
        location_sharing_enabled: bool,
        clock: &dyn Clock,
    ) -> UnlockDecision {
        let event = events.current_event();
        let location = if location_sharing_enabled {
            locations.current_location()
        } else {
            None
        };
        self.evaluate(
            event.as_ref(),
            location.as_ref(),
            location_sharing_enabled,
            clock.now_ms(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, StaticEventRepository, StaticLocation};

    const START: i64 = 100 * DAY_MS;
    const END: i64 = 107 * DAY_MS;
    const CENTER: (f64, f64) = (-32.3, 19.8);

    fn event() -> EventWindow {
        EventWindow::new(START, END, CENTER.0, CENTER.1, 5.0).unwrap()
    }

    fn good_fix(lat: f64, lng: f64, now: i64) -> UserLocation {
        UserLocation::new(lat, lng, Some(10.0), true, now).unwrap()
    }

    fn evaluator() -> UnlockEvaluator {
        UnlockEvaluator::new(UnlockPolicy::default())
    }

    #[test]
    fn test_no_event() {
        let fix = good_fix(CENTER.0, CENTER.1, START);
        assert_eq!(
            evaluator().evaluate(None, Some(&fix), true, START),
            UnlockDecision::NoEvent
        );
    }

    #[test]
    fn test_event_ended_is_permanent() {
        let far = good_fix(51.5, -0.1, END + DAY_MS);
        for now in [END, END + 1, END + 365 * DAY_MS] {
            for sharing in [true, false] {
                let decision = evaluator().evaluate(Some(&event()), Some(&far), sharing, now);
                assert_eq!(
                    decision,
                    UnlockDecision::Unlocked {
                        reason: UnlockReason::EventEnded,
                        unlocked_at_ms: END
                    }
                );
            }
        }
    }

    #[test]
    fn test_event_active() {
        let decision = evaluator().evaluate(Some(&event()), None, false, START);
        assert_eq!(
            decision,
            UnlockDecision::Unlocked {
                reason: UnlockReason::EventActive,
                unlocked_at_ms: START
            }
        );
        assert!(evaluator()
            .evaluate(Some(&event()), None, false, END - 1)
            .is_unlocked());
    }

    #[test]
    fn test_within_boundary() {
        let now = START - 3 * DAY_MS;
        let fix = good_fix(CENTER.0 + 0.01, CENTER.1, now);
        let decision = evaluator().evaluate(Some(&event()), Some(&fix), true, now);
        assert_eq!(
            decision,
            UnlockDecision::Unlocked {
                reason: UnlockReason::WithinBoundary,
                unlocked_at_ms: now
            }
        );
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let now = START - DAY_MS;
        let point = (CENTER.0 + 0.05, CENTER.1 + 0.05);
        let exact = geo::distance_km(CENTER.0, CENTER.1, point.0, point.1);
        let fix = good_fix(point.0, point.1, now);

        let on_edge = EventWindow::new(START, END, CENTER.0, CENTER.1, exact).unwrap();
        assert!(evaluator()
            .evaluate(Some(&on_edge), Some(&fix), true, now)
            .is_unlocked());

        let just_short = EventWindow::new(START, END, CENTER.0, CENTER.1, exact - 1e-9).unwrap();
        assert!(!evaluator()
            .evaluate(Some(&just_short), Some(&fix), true, now)
            .is_unlocked());
    }

    #[test]
    fn test_move_closer() {
        let now = START - 2 * DAY_MS;
        let fix = good_fix(-33.9249, 18.4241, now);
        let decision = evaluator().evaluate(Some(&event()), Some(&fix), true, now);

        let UnlockDecision::Locked {
            conditions,
            estimated_unlock_ms,
        } = decision
        else {
            panic!("expected locked, got {decision:?}");
        };
        assert_eq!(estimated_unlock_ms, Some(START));
        assert_eq!(conditions.len(), 2);
        match conditions[0] {
            UnlockCondition::MoveCloser { remaining_km } => {
                let expected =
                    geo::distance_km(CENTER.0, CENTER.1, -33.9249, 18.4241) - 5.0;
                assert!((remaining_km - expected).abs() < 1e-9);
                assert!(remaining_km > 100.0);
            }
            ref other => panic!("unexpected condition {other:?}"),
        }
        assert_eq!(
            conditions[1],
            UnlockCondition::WaitForEvent { days_remaining: 2 }
        );
    }

    #[test]
    fn test_sharing_disabled() {
        let now = START - DAY_MS / 2;
        let inside = good_fix(CENTER.0, CENTER.1, now);
        let decision = evaluator().evaluate(Some(&event()), Some(&inside), false, now);
        assert_eq!(
            decision,
            UnlockDecision::Locked {
                conditions: vec![
                    UnlockCondition::EnableLocation,
                    UnlockCondition::WaitForEvent { days_remaining: 1 }
                ],
                estimated_unlock_ms: Some(START),
            }
        );
    }

    #[test]
    fn test_no_location_reading() {
        let now = START - 10 * DAY_MS;
        let decision = evaluator().evaluate(Some(&event()), None, true, now);
        assert_eq!(
            decision,
            UnlockDecision::Locked {
                conditions: vec![
                    UnlockCondition::ProvideLocation,
                    UnlockCondition::WaitForEvent { days_remaining: 10 }
                ],
                estimated_unlock_ms: Some(START),
            }
        );
    }

    #[test]
    fn test_invalid_readings_need_better_gps() {
        let now = START - DAY_MS;
        let at_center = |accuracy: Option<f64>, gps: bool, ts: i64| {
            UserLocation::new(CENTER.0, CENTER.1, accuracy, gps, ts).unwrap()
        };
        let expected = UnlockDecision::Locked {
            conditions: vec![UnlockCondition::ImproveGpsAccuracy],
            estimated_unlock_ms: Some(START),
        };

        let cases = [
            at_center(None, true, now),
            at_center(Some(50.1), true, now),
            at_center(Some(5.0), false, now),
            at_center(Some(5.0), true, now - 5 * 60 * 1000 - 1),
        ];
        for fix in &cases {
            assert_eq!(
                evaluator().evaluate(Some(&event()), Some(fix), true, now),
                expected,
                "fix {fix:?}"
            );
        }

        // Exactly at the thresholds is still acceptable
        let edge = at_center(Some(50.0), true, now - 5 * 60 * 1000);
        assert!(evaluator()
            .evaluate(Some(&event()), Some(&edge), true, now)
            .is_unlocked());
    }

    #[test]
    fn test_policy_is_configurable() {
        let now = START - DAY_MS;
        let network_fix = UserLocation::new(CENTER.0, CENTER.1, Some(80.0), false, now).unwrap();

        let strict = evaluator();
        assert!(!strict.is_location_valid(&network_fix, now));

        let relaxed = UnlockEvaluator::new(UnlockPolicy {
            max_accuracy_m: 100.0,
            max_location_age_secs: 60,
            require_gps: false,
        });
        assert!(relaxed.is_location_valid(&network_fix, now));
        assert!(!relaxed.is_location_valid(&network_fix, now + 61_000));
        assert!(relaxed
            .evaluate(Some(&event()), Some(&network_fix), true, now)
            .is_unlocked());
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        let now = START - DAY_MS;
        let fix = good_fix(CENTER.0, CENTER.1, now + 10_000);
        assert!(evaluator().is_location_valid(&fix, now));
    }

    #[test]
    fn test_days_until() {
        assert_eq!(days_until(0, 0), 0);
        assert_eq!(days_until(10, 0), 0);
        assert_eq!(days_until(0, 1), 1);
        assert_eq!(days_until(0, DAY_MS), 1);
        assert_eq!(days_until(0, DAY_MS + 1), 2);
    }

    #[test]
    fn test_event_window_invariants() {
        assert!(matches!(
            EventWindow::new(END, START, 0.0, 0.0, 1.0),
            Err(Error::InvalidEventWindow(_))
        ));
        assert!(EventWindow::new(START, END, 0.0, 0.0, 0.0).is_err());
        assert!(EventWindow::new(START, END, 0.0, 0.0, -1.0).is_err());
        assert!(matches!(
            EventWindow::new(START, END, 91.0, 0.0, 1.0),
            Err(Error::InvalidCoordinate(_))
        ));
        assert!(EventWindow::new(START, START, 0.0, 0.0, 1.0).is_ok());
    }

    #[test]
    fn test_user_location_rejects_bad_coordinates() {
        assert!(matches!(
            UserLocation::new(-91.0, 0.0, None, true, 0),
            Err(Error::InvalidCoordinate(_))
        ));
        assert!(UserLocation::new(0.0, 181.0, None, true, 0).is_err());
    }

    #[test]
    fn test_evaluate_current_uses_collaborators() {
        let now = START - DAY_MS;
        let events = StaticEventRepository::new(Some(event()));
        let locations = StaticLocation::new(Some(good_fix(CENTER.0, CENTER.1, now)));

        let decision =
            evaluator().evaluate_current(&events, &locations, true, &FixedClock(now));
        assert!(decision.is_unlocked());

        let decision =
            evaluator().evaluate_current(&events, &locations, false, &FixedClock(now));
        assert!(!decision.is_unlocked());

        let none = StaticEventRepository::default();
        assert_eq!(
            evaluator().evaluate_current(&none, &locations, true, &FixedClock(now)),
            UnlockDecision::NoEvent
        );
    }

    #[test]
    fn test_decision_serialization() {
        let decision = UnlockDecision::Locked {
            conditions: vec![
                UnlockCondition::MoveCloser { remaining_km: 2.5 },
                UnlockCondition::WaitForEvent { days_remaining: 3 },
            ],
            estimated_unlock_ms: Some(START),
        };
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["status"], "locked");
        assert_eq!(json["conditions"][0]["type"], "move_closer");
        assert_eq!(json["conditions"][0]["remaining_km"], 2.5);
        assert_eq!(json["conditions"][1]["days_remaining"], 3);

        let unlocked = serde_json::to_value(UnlockDecision::Unlocked {
            reason: UnlockReason::WithinBoundary,
            unlocked_at_ms: 7,
        })
        .unwrap();
        assert_eq!(unlocked["reason"], "within_boundary");

        assert_eq!(
            serde_json::to_value(UnlockDecision::NoEvent).unwrap()["status"],
            "no_event"
        );
    }

    #[test]
    fn test_event_window_deserialize_validates() {
        let json = serde_json::to_string(&event().with_name("Burn")).unwrap();
        let parsed: EventWindow = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event().with_name("Burn"));

        let backwards = serde_json::json!({
            "start_ms": END,
            "end_ms": START,
            "center": { "latitude": 0.0, "longitude": 0.0 },
            "unlock_radius_km": 5.0
        });
        assert!(serde_json::from_value::<EventWindow>(backwards).is_err());

        let no_radius = serde_json::json!({
            "start_ms": START,
            "end_ms": END,
            "center": { "latitude": 0.0, "longitude": 0.0 },
            "unlock_radius_km": 0.0
        });
        assert!(serde_json::from_value::<EventWindow>(no_radius).is_err());

        let bad_center = serde_json::json!({
            "start_ms": START,
            "end_ms": END,
            "center": { "latitude": -91.0, "longitude": 0.0 },
            "unlock_radius_km": 5.0
        });
        assert!(serde_json::from_value::<EventWindow>(bad_center).is_err());
    }

    #[test]
    fn test_user_location_deserialize_validates() {
        let parsed: UserLocation = serde_json::from_value(serde_json::json!({
            "latitude": -32.3,
            "longitude": 19.8,
            "accuracy_m": 12.0,
            "timestamp_ms": 5
        }))
        .unwrap();
        assert_eq!(parsed.accuracy_m, Some(12.0));
        assert!(!parsed.is_from_gps);

        let out_of_range = serde_json::json!({
            "latitude": 0.0,
            "longitude": 200.0,
            "timestamp_ms": 5
        });
        assert!(serde_json::from_value::<UserLocation>(out_of_range).is_err());
    }
}
