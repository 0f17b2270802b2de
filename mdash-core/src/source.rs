//! Transport traits the engine and runtime are built against
//!
//! Transports are injected so the engine never touches a socket directly,
//! and tests can drive it synchronously.

use crate::wire::{InboundMessage, PlaybackCommand};

/// Inbound best-effort channel (track metadata, speed reports)
///
/// Implementations must never block. Absence of a message is the normal
/// case, and a source that could not be opened simply yields nothing.
pub trait TelemetrySource: Send {
    /// Short name used in log messages (e.g. "track-socket")
    fn name(&self) -> &str;

    /// Take the next pending message without blocking
    ///
    /// Returns `None` once nothing is pending. Callers drain until `None`
    /// or a per-tick limit, and keep the newest message of each kind.
    fn try_receive(&mut self) -> Option<InboundMessage>;
}

/// Outbound fire-and-forget command channel
pub trait CommandSink: Send {
    /// Hand a command to the media player
    ///
    /// No acknowledgement is awaited and delivery failures are swallowed.
    fn send_command(&mut self, command: PlaybackCommand);
}

/// Command sink for when no media player is attached
#[derive(Debug, Default)]
pub struct NullCommandSink;

impl CommandSink for NullCommandSink {
    fn send_command(&mut self, _command: PlaybackCommand) {}
}
