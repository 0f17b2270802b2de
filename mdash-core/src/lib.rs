//! MotoDash Core Library
//!
//! This crate provides the instrument cluster data model, derived gauge
//! calculators, turn-signal timing and the wire contract shared by the
//! simulation engine, transports and runtime.

pub mod display;
pub mod gauges;
pub mod model;
pub mod persist;
pub mod signals;
pub mod source;
pub mod units;
pub mod wire;

pub use display::{DisplaySink, Presenter};
pub use model::{ClusterSnapshot, FieldMask, SignalRequest, VehicleTelemetry};
pub use persist::{OdometerRecord, OdometerStore};
pub use signals::{Blinker, TurnSignalState};
pub use source::{CommandSink, TelemetrySource};
pub use wire::{InboundMessage, PlaybackCommand, TrackUpdate};
