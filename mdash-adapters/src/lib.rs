//! Telemetry engine, transports and persistence for MotoDash

pub mod channel;
pub mod demo;
pub mod store;
#[cfg(unix)]
pub mod unix;

pub use channel::{ChannelSender, ChannelSource};
pub use demo::{DemoEngine, DemoPhase, EngineTuning, SpeedMode, MAX_DRAIN_PER_TICK};
pub use store::FileStore;
#[cfg(unix)]
pub use unix::{UnixCommandSink, UnixSpeedSource, UnixTrackSource};
