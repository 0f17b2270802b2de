//! Property-based tests for the gauge calculators and blink controller.

use mdash_core::gauges::*;
use mdash_core::model::{SignalRequest, TrackInfo, TEXT_CAP};
use mdash_core::signals::{Blinker, TurnSignalState};
use mdash_core::wire::TrackUpdate;
use proptest::prelude::*;

proptest! {
    /// Gear never decreases as speed increases and stays within 0..=6.
    #[test]
    fn gear_is_monotonic(speed in 0u16..MAX_SPEED) {
        let here = calculate_gear(speed);
        let next = calculate_gear(speed + 1);
        prop_assert!(here <= 6);
        prop_assert!(here <= next);
    }

    /// RPM stays in range for every gear, including out-of-range ones.
    #[test]
    fn rpm_in_range(speed in 0u16..=MAX_SPEED, gear in 0u8..=10) {
        let rpm = calculate_rpm(speed, gear);
        prop_assert!((MIN_RPM..=MAX_RPM).contains(&rpm));
    }

    /// Lower gears spin the engine at least as fast as higher ones.
    #[test]
    fn lower_gear_higher_rpm(speed in 1u16..=MAX_SPEED, gear in 1u8..6) {
        prop_assert!(calculate_rpm(speed, gear) >= calculate_rpm(speed, gear + 1));
        prop_assert!(calculate_rpm(speed, 1) >= calculate_rpm(speed, 6));
    }

    /// Gear and RPM computed from the same speed always agree.
    #[test]
    fn rpm_consistent_with_gear(speed in 0u16..=MAX_SPEED) {
        let gear = calculate_gear(speed);
        let rpm = calculate_rpm(speed, gear);
        prop_assert_eq!(speed == 0, gear == 0);
        if speed == 0 {
            prop_assert_eq!(rpm, MIN_RPM);
        }
    }

    /// Zones are non-decreasing, so the bands never overlap or leave gaps.
    #[test]
    fn zones_are_monotonic(speed in 0u16..MAX_SPEED, rpm in MIN_RPM..MAX_RPM) {
        prop_assert!(speed_zone(speed) <= speed_zone(speed + 1));
        prop_assert!(rpm_zone(rpm) <= rpm_zone(rpm + 1));
    }

    /// With one side held on, it toggles exactly once per threshold ticks.
    #[test]
    fn blinker_toggle_cadence(threshold in 1u32..40, periods in 1u32..6) {
        let blinker = Blinker::new(threshold);
        let mut state = TurnSignalState::default();
        let mut toggles = 0;
        for _ in 0..threshold * periods {
            let before = state.left_blink_on;
            blinker.tick(&mut state, SignalRequest::Left);
            if state.left_blink_on != before {
                toggles += 1;
            }
            prop_assert!(state.blink_counter < threshold);
            prop_assert!(!state.right_blink_on);
        }
        prop_assert_eq!(toggles, periods);
    }

    /// Arbitrary inbound text never panics and never touches fields it lacks.
    #[test]
    fn track_parse_is_total(message in ".{0,200}") {
        let mut track = TrackInfo::default();
        let update = TrackUpdate::parse(&message);
        update.apply_to(&mut track);
        if !message.contains('|') {
            prop_assert_eq!(track.duration_sec, 0);
            prop_assert_eq!(track.artist, TrackInfo::default().artist);
        }
        prop_assert!(track.title.chars().count() <= TEXT_CAP);
    }
}
