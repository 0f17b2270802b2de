//! Demo ride engine that synthesizes vehicle telemetry
//!
//! Walks the speed up to the top of the gauge and back down again with
//! asymmetric rates (braking is harder than accelerating), dwelling at top
//! speed and at a full stop. Along the way it accumulates trip and odometer
//! distance, derives gear and RPM, counts down a mock navigation hint, and
//! merges whatever the inbound transports delivered.
//!
//! In live mode the speed comes from the speed feed instead of the walk;
//! everything downstream of speed is identical.

use mdash_core::{
    gauges::{self, MAX_SPEED},
    model::{SignalRequest, VehicleTelemetry},
    persist::{OdometerRecord, OdometerStore},
    source::TelemetrySource,
    wire::{InboundMessage, TrackUpdate},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tick length the per-tick step sizes are tuned for
pub const REFERENCE_TICK: Duration = Duration::from_millis(16);

/// Messages read from one source in one tick
///
/// A producer that outpaces the tick can't stall it; whatever is still
/// queued is read on later ticks.
pub const MAX_DRAIN_PER_TICK: usize = 32;

// =============================================================================
// Tuning
// =============================================================================

/// Empirically tuned engine constants
///
/// Steps and distances are per `REFERENCE_TICK`; dwell times are in ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineTuning {
    /// Speed gained per tick while accelerating (km/h)
    pub accel_step: f32,
    /// Speed shed per tick while braking (km/h)
    pub brake_step: f32,
    /// Ticks spent cruising at top speed before braking
    pub top_dwell_ticks: u32,
    /// Ticks spent stopped before pulling away
    pub stop_dwell_ticks: u32,
    /// Distance covered per tick per km/h
    pub distance_scale: f64,
    /// Accumulated distance per odometer unit
    pub odometer_step: f64,
    /// Distance the mock route restarts from (meters)
    pub nav_reset_meters: f32,
    /// Meters counted down per tick per km/h
    pub nav_scale: f32,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            accel_step: 0.66,
            brake_step: 1.11,
            top_dwell_ticks: 30,
            stop_dwell_ticks: 60,
            distance_scale: 0.000_004_44,
            odometer_step: 0.2,
            nav_reset_meters: 500.0,
            nav_scale: 0.005,
        }
    }
}

/// Where the engine takes its speed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedMode {
    /// Synthetic accelerate/brake cycle
    #[default]
    Demo,
    /// Latest report from the speed feed
    Live,
}

/// Direction of the demo walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoPhase {
    Accelerating,
    Decelerating,
}

// =============================================================================
// DemoEngine
// =============================================================================

pub struct DemoEngine {
    tuning: EngineTuning,
    mode: SpeedMode,
    phase: DemoPhase,
    pause_remaining: u32,
    precise_speed: f32,
    odometer_accumulator: f64,
    nav_countdown: f32,
    live_speed: u16,
    sources: Vec<Box<dyn TelemetrySource>>,
    store: Box<dyn OdometerStore>,
}

impl DemoEngine {
    pub fn new(tuning: EngineTuning, store: Box<dyn OdometerStore>) -> Self {
        let nav_countdown = tuning.nav_reset_meters;
        Self {
            tuning,
            mode: SpeedMode::Demo,
            phase: DemoPhase::Accelerating,
            pause_remaining: 0,
            precise_speed: 0.0,
            odometer_accumulator: 0.0,
            nav_countdown,
            live_speed: 0,
            sources: Vec::new(),
            store,
        }
    }

    pub fn with_mode(mut self, mode: SpeedMode) -> Self {
        self.mode = mode;
        self
    }

    /// Register an inbound transport, drained once per tick
    pub fn add_source(&mut self, source: Box<dyn TelemetrySource>) {
        info!("Registered telemetry source {}", source.name());
        self.sources.push(source);
    }

    /// Initial telemetry seeded from the persisted odometer record
    pub fn initial_telemetry(&self) -> VehicleTelemetry {
        let record = self.store.load();
        info!(
            "Loaded odometer {} / trip {:.1}",
            record.odometer, record.trip
        );
        let mut telemetry = VehicleTelemetry::with_odometer(record.odometer, record.trip);
        telemetry.navigation.distance_meters = self.nav_countdown as u32;
        telemetry
    }

    pub fn mode(&self) -> SpeedMode {
        self.mode
    }

    pub fn phase(&self) -> DemoPhase {
        self.phase
    }

    pub fn pause_remaining(&self) -> u32 {
        self.pause_remaining
    }

    pub fn precise_speed(&self) -> f32 {
        self.precise_speed
    }

    pub fn tuning(&self) -> &EngineTuning {
        &self.tuning
    }

    pub fn store(&self) -> &dyn OdometerStore {
        self.store.as_ref()
    }

    /// Advance the telemetry by one tick
    pub fn advance(&mut self, state: &mut VehicleTelemetry, tick: Duration) {
        let scale = tick.as_secs_f32() / REFERENCE_TICK.as_secs_f32();
        let track = self.drain_sources();

        match self.mode {
            SpeedMode::Demo => self.step_demo(state, scale),
            SpeedMode::Live => self.step_live(state),
        }

        self.accumulate_distance(state, scale);

        state.gear = gauges::calculate_gear(state.speed);
        state.rpm = gauges::calculate_rpm(state.speed, state.gear);

        self.update_navigation(state, scale);

        if let Some(update) = track {
            update.apply_to(&mut state.track);
        }
    }

    /// Write the current readings regardless of the odometer step
    pub fn flush(&mut self, state: &VehicleTelemetry) {
        self.persist(state);
    }

    fn step_demo(&mut self, state: &mut VehicleTelemetry, scale: f32) {
        if self.pause_remaining > 0 {
            // Signals stay as they were for the whole pause
            self.pause_remaining -= 1;
        } else {
            match self.phase {
                DemoPhase::Accelerating => {
                    state.signal_request = SignalRequest::Left;
                    self.precise_speed += self.tuning.accel_step * scale;
                    if self.precise_speed >= f32::from(MAX_SPEED) {
                        self.precise_speed = f32::from(MAX_SPEED);
                        self.phase = DemoPhase::Decelerating;
                        self.pause_remaining = self.tuning.top_dwell_ticks;
                        debug!("Top speed reached, dwelling {} ticks", self.pause_remaining);
                    }
                }
                DemoPhase::Decelerating => {
                    state.signal_request = SignalRequest::Right;
                    self.precise_speed -= self.tuning.brake_step * scale;
                    if self.precise_speed <= 0.0 {
                        self.precise_speed = 0.0;
                        self.phase = DemoPhase::Accelerating;
                        self.pause_remaining = self.tuning.stop_dwell_ticks;
                        state.signal_request = SignalRequest::Off;
                        debug!("Stopped, dwelling {} ticks", self.pause_remaining);
                    }
                }
            }
        }
        state.speed = self.precise_speed.floor().clamp(0.0, f32::from(MAX_SPEED)) as u16;
    }

    fn step_live(&mut self, state: &mut VehicleTelemetry) {
        state.signal_request = SignalRequest::Off;
        state.speed = self.live_speed.min(MAX_SPEED);
        self.precise_speed = f32::from(state.speed);
    }

    fn accumulate_distance(&mut self, state: &mut VehicleTelemetry, scale: f32) {
        if state.speed == 0 {
            return;
        }
        let distance = f64::from(state.speed) * self.tuning.distance_scale * f64::from(scale);
        state.trip.advance(distance);

        self.odometer_accumulator += distance;
        let step = self.tuning.odometer_step;
        if step <= 0.0 || self.odometer_accumulator < step {
            return;
        }
        while self.odometer_accumulator >= step {
            state.odometer = state.odometer.saturating_add(1);
            self.odometer_accumulator -= step;
        }
        self.persist(state);
    }

    fn update_navigation(&mut self, state: &mut VehicleTelemetry, scale: f32) {
        if state.speed == 0 {
            return;
        }
        self.nav_countdown -= f32::from(state.speed) * self.tuning.nav_scale * scale;
        if self.nav_countdown <= 0.0 {
            // Mock route loops back to the start
            self.nav_countdown = self.tuning.nav_reset_meters;
        }
        state.navigation.distance_meters = self.nav_countdown as u32;
    }

    /// Drain every source, keeping only the newest message of each kind
    fn drain_sources(&mut self) -> Option<TrackUpdate> {
        let mut track = None;
        for source in self.sources.iter_mut() {
            for _ in 0..MAX_DRAIN_PER_TICK {
                let Some(message) = source.try_receive() else {
                    break;
                };
                match message {
                    InboundMessage::Track(update) => track = Some(update),
                    InboundMessage::Speed(speed) => self.live_speed = speed.min(MAX_SPEED),
                }
            }
        }
        track
    }

    fn persist(&mut self, state: &VehicleTelemetry) {
        let record = OdometerRecord::new(state.odometer, state.trip.0);
        if let Err(e) = self.store.save(record) {
            warn!("Failed to persist odometer: {}", e);
        }
    }
}
