//! Property tests for unlock evaluation and distance computation
//!
//! Run: `cargo test -p campsync --test unlock_properties`

use campsync::unlock::DAY_MS;
use campsync::{
    distance_km, EventWindow, UnlockDecision, UnlockEvaluator, UnlockPolicy, UnlockReason,
    UserLocation,
};
use proptest::prelude::*;

const START: i64 = 1_000 * DAY_MS;
const END: i64 = 1_007 * DAY_MS;

fn arb_lat() -> impl Strategy<Value = f64> {
    -90.0f64..=90.0
}

fn arb_lng() -> impl Strategy<Value = f64> {
    -180.0f64..=180.0
}

fn arb_location() -> impl Strategy<Value = Option<UserLocation>> {
    prop::option::of(
        (arb_lat(), arb_lng(), prop::option::of(0.0f64..500.0), any::<bool>())
            .prop_map(|(lat, lng, acc, gps)| UserLocation::new(lat, lng, acc, gps, START).unwrap()),
    )
}

fn event() -> EventWindow {
    EventWindow::new(START, END, -32.3, 19.8, 5.0).unwrap()
}

fn evaluator() -> UnlockEvaluator {
    UnlockEvaluator::new(UnlockPolicy::default())
}

proptest! {
    #[test]
    fn ended_event_stays_unlocked(
        after in 0i64..(3650 * DAY_MS),
        location in arb_location(),
        sharing in any::<bool>(),
    ) {
        let now = END + after;
        let decision = evaluator().evaluate(Some(&event()), location.as_ref(), sharing, now);
        prop_assert_eq!(
            decision,
            UnlockDecision::Unlocked { reason: UnlockReason::EventEnded, unlocked_at_ms: END }
        );
    }

    #[test]
    fn active_event_is_unlocked_anywhere(
        offset in 0i64..(END - START),
        location in arb_location(),
        sharing in any::<bool>(),
    ) {
        let now = START + offset;
        let decision = evaluator().evaluate(Some(&event()), location.as_ref(), sharing, now);
        prop_assert_eq!(
            decision,
            UnlockDecision::Unlocked { reason: UnlockReason::EventActive, unlocked_at_ms: START }
        );
    }

    #[test]
    fn boundary_is_inclusive(
        lat in -60.0f64..60.0,
        lng in -170.0f64..170.0,
        dlat in 0.001f64..0.5,
    ) {
        let now = START - DAY_MS;
        let (plat, plng) = (lat + dlat, lng);
        let radius = distance_km(lat, lng, plat, plng);
        let fix = UserLocation::new(plat, plng, Some(5.0), true, now).unwrap();

        let on_edge = EventWindow::new(START, END, lat, lng, radius).unwrap();
        prop_assert!(evaluator().evaluate(Some(&on_edge), Some(&fix), true, now).is_unlocked());

        let inside = EventWindow::new(START, END, lat, lng, radius * (1.0 - 1e-9)).unwrap();
        prop_assert!(!evaluator().evaluate(Some(&inside), Some(&fix), true, now).is_unlocked());
    }

    #[test]
    fn distance_to_self_is_zero(lat in arb_lat(), lng in arb_lng()) {
        prop_assert_eq!(distance_km(lat, lng, lat, lng), 0.0);
    }

    #[test]
    fn distance_is_symmetric(a in (arb_lat(), arb_lng()), b in (arb_lat(), arb_lng())) {
        let ab = distance_km(a.0, a.1, b.0, b.1);
        let ba = distance_km(b.0, b.1, a.0, a.1);
        prop_assert!((ab - ba).abs() < 1e-6, "{} vs {}", ab, ba);
    }

    #[test]
    fn evaluation_is_idempotent(
        now in 0i64..(2_000 * DAY_MS),
        location in arb_location(),
        sharing in any::<bool>(),
    ) {
        let a = evaluator().evaluate(Some(&event()), location.as_ref(), sharing, now);
        let b = evaluator().evaluate(Some(&event()), location.as_ref(), sharing, now);
        prop_assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }
}
