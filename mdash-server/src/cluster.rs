//! The instrument cluster aggregate
//!
//! Owns the telemetry record and everything that mutates or shows it. One
//! `tick()` is one frame of the cluster: engine, blinker, display, snapshot.

use crate::config::DashConfig;
use mdash_adapters::DemoEngine;
use mdash_core::{
    display::{DisplaySink, Presenter},
    model::{ClusterSnapshot, VehicleTelemetry},
    signals::{Blinker, TurnSignalState},
};
use std::time::Duration;
use tracing::{info, trace};

pub struct Cluster {
    telemetry: VehicleTelemetry,
    signals: TurnSignalState,
    engine: DemoEngine,
    blinker: Blinker,
    presenter: Presenter,
    display: Box<dyn DisplaySink>,
    tick: Duration,
    tick_count: u64,
    overspeed_kph: u16,
}

impl Cluster {
    pub fn new(
        engine: DemoEngine,
        display: Box<dyn DisplaySink>,
        tick: Duration,
        blink_period: Duration,
        overspeed_kph: u16,
    ) -> Self {
        let telemetry = engine.initial_telemetry();
        let blinker = Blinker::for_tick(tick, blink_period);
        info!(
            "Cluster ready: tick {:?}, blink threshold {} ticks, {:?} mode",
            tick,
            blinker.threshold(),
            engine.mode()
        );
        Self {
            telemetry,
            signals: TurnSignalState::default(),
            engine,
            blinker,
            presenter: Presenter::new(overspeed_kph),
            display,
            tick,
            tick_count: 0,
            overspeed_kph,
        }
    }

    pub fn from_config(
        config: &DashConfig,
        engine: DemoEngine,
        display: Box<dyn DisplaySink>,
    ) -> Self {
        Self::new(
            engine,
            display,
            config.tick(),
            config.blink_period(),
            config.overspeed_kph,
        )
    }

    /// Run one frame and describe what the cluster now shows
    pub fn tick(&mut self) -> ClusterSnapshot {
        self.engine.advance(&mut self.telemetry, self.tick);

        if self
            .blinker
            .tick(&mut self.signals, self.telemetry.signal_request)
        {
            self.presenter
                .present_turn_signals(&self.signals, self.display.as_mut());
        }
        let calls = self.presenter.present(&self.telemetry, self.display.as_mut());

        self.tick_count += 1;
        trace!("Tick {} pushed {} display updates", self.tick_count, calls);

        ClusterSnapshot::capture(
            self.tick_count,
            &self.telemetry,
            &self.signals,
            self.overspeed_kph,
        )
    }

    pub fn telemetry(&self) -> &VehicleTelemetry {
        &self.telemetry
    }

    pub fn turn_signals(&self) -> &TurnSignalState {
        &self.signals
    }

    pub fn tick_period(&self) -> Duration {
        self.tick
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Persist the final odometer and trip readings
    pub fn shutdown(&mut self) {
        info!(
            "Saving odometer {} / trip {:.1}",
            self.telemetry.odometer, self.telemetry.trip.0
        );
        self.engine.flush(&self.telemetry);
    }
}
