//! Display sink contract and change detection
//!
//! The renderer is an external collaborator. It gets one call per changed
//! field per tick, with values already resolved to their final display form.

use crate::gauges::{self, RpmZone, SpeedZone};
use crate::model::VehicleTelemetry;
use crate::signals::TurnSignalState;

/// Banner text shown while the overspeed alert is active
pub const OVERSPEED_ALERT: &str = "OVERSPEED WARNING";

/// Receiver of resolved display values
pub trait DisplaySink: Send {
    fn set_speed(&mut self, speed: u16, zone: SpeedZone);
    fn set_gear(&mut self, gear: u8, zone: SpeedZone);
    fn set_rpm(&mut self, rpm: u8, zone: RpmZone);
    fn set_turn_signals(&mut self, left_on: bool, right_on: bool);
    fn set_track(&mut self, title: &str, artist: &str, album: &str);
    fn set_playback_progress(&mut self, position_sec: u32, duration_sec: u32, is_playing: bool);
    fn set_navigation(&mut self, distance_meters: u32, street: &str);
    fn set_odometer(&mut self, odometer: u32, trip: f64);
    fn set_alert(&mut self, active: bool, text: &str);
}

/// Values the cluster shows, excluding turn signals
#[derive(Debug, Clone, PartialEq)]
struct Shown {
    speed: (u16, SpeedZone),
    gear: (u8, SpeedZone),
    rpm: (u8, RpmZone),
    track: (String, String, String),
    progress: (u32, u32, bool),
    navigation: (u32, String),
    odometer: (u32, f64),
    alert: bool,
}

impl Shown {
    fn resolve(telemetry: &VehicleTelemetry, overspeed_limit: u16) -> Self {
        let zone = gauges::speed_zone(telemetry.speed);
        let track = &telemetry.track;
        Self {
            speed: (telemetry.speed, zone),
            // Gear is colored by the speed zone, same as the speed readout
            gear: (telemetry.gear, zone),
            rpm: (telemetry.rpm, gauges::rpm_zone(telemetry.rpm)),
            track: (track.title.clone(), track.artist.clone(), track.album.clone()),
            progress: (track.position_sec, track.duration_sec, track.is_playing),
            navigation: (
                telemetry.navigation.distance_meters,
                telemetry.navigation.street.clone(),
            ),
            odometer: (telemetry.odometer, telemetry.trip.0),
            alert: gauges::is_overspeed(telemetry.speed, overspeed_limit),
        }
    }
}

/// Pushes only what changed since the previous tick to a `DisplaySink`
#[derive(Debug)]
pub struct Presenter {
    overspeed_limit: u16,
    last: Option<Shown>,
}

impl Presenter {
    pub fn new(overspeed_limit: u16) -> Self {
        Self {
            overspeed_limit,
            last: None,
        }
    }

    /// Forget what was shown so the next `present` pushes every field
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    /// Push changed gauge, media, navigation and alert values
    ///
    /// Returns the number of sink calls made.
    pub fn present(&mut self, telemetry: &VehicleTelemetry, sink: &mut dyn DisplaySink) -> usize {
        let next = Shown::resolve(telemetry, self.overspeed_limit);
        let prev = self.last.as_ref();
        let mut calls = 0;

        if differs(prev, &next, |s| &s.speed) {
            sink.set_speed(next.speed.0, next.speed.1);
            calls += 1;
        }
        if differs(prev, &next, |s| &s.gear) {
            sink.set_gear(next.gear.0, next.gear.1);
            calls += 1;
        }
        if differs(prev, &next, |s| &s.rpm) {
            sink.set_rpm(next.rpm.0, next.rpm.1);
            calls += 1;
        }
        if differs(prev, &next, |s| &s.track) {
            let (title, artist, album) = &next.track;
            sink.set_track(title, artist, album);
            calls += 1;
        }
        if differs(prev, &next, |s| &s.progress) {
            let (position, duration, playing) = next.progress;
            sink.set_playback_progress(position, duration, playing);
            calls += 1;
        }
        if differs(prev, &next, |s| &s.navigation) {
            sink.set_navigation(next.navigation.0, &next.navigation.1);
            calls += 1;
        }
        if differs(prev, &next, |s| &s.odometer) {
            sink.set_odometer(next.odometer.0, next.odometer.1);
            calls += 1;
        }
        if differs(prev, &next, |s| &s.alert) {
            sink.set_alert(next.alert, OVERSPEED_ALERT);
            calls += 1;
        }

        self.last = Some(next);
        calls
    }

    /// Push the blink state; call only on ticks where the blinker toggled
    pub fn present_turn_signals(&self, signals: &TurnSignalState, sink: &mut dyn DisplaySink) {
        sink.set_turn_signals(signals.left_blink_on, signals.right_blink_on);
    }
}

fn differs<T: PartialEq>(prev: Option<&Shown>, next: &Shown, field: impl Fn(&Shown) -> &T) -> bool {
    prev.map_or(true, |p| field(p) != field(next))
}
