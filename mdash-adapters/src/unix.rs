//! Unix datagram transports
//!
//! Path-addressed datagram sockets shared with the media and speed bridges:
//! - track socket: inbound `title|artist|album|dur|pos|status` text
//! - speed socket: inbound 4-byte little-endian speed
//! - command socket: outbound `NEXT` / `PREV` / `PLAYPAUSE`
//!
//! Everything here is best effort. A socket that can't be bound leaves the
//! source permanently empty, and the cluster keeps running on last-known
//! values.

use anyhow::{Context, Result};
use mdash_core::{
    source::{CommandSink, TelemetrySource},
    wire::{self, InboundMessage, PlaybackCommand, TrackUpdate},
};
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Largest datagram read; longer payloads are truncated by the kernel
const RECV_BUFFER: usize = 512;

/// Unusable datagrams skipped in one `try_receive` before giving up
const MAX_SKIPPED_DATAGRAMS: usize = 32;

/// Non-blocking bound datagram socket
struct BoundSocket {
    socket: UnixDatagram,
    path: PathBuf,
}

impl BoundSocket {
    fn bind(path: &Path) -> Result<Self> {
        // A stale socket file from a previous run would make bind fail
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("removing stale socket {}", path.display()))
            }
        }
        let socket = UnixDatagram::bind(path)
            .with_context(|| format!("binding datagram socket {}", path.display()))?;
        socket
            .set_nonblocking(true)
            .context("setting socket non-blocking")?;
        // Producers may run as another user
        if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o666)) {
            debug!("Could not relax permissions on {}: {}", path.display(), e);
        }
        Ok(Self {
            socket,
            path: path.to_path_buf(),
        })
    }

    /// Read one pending datagram, `None` when nothing is queued
    fn recv(&self, buf: &mut [u8]) -> Option<usize> {
        match self.socket.recv(buf) {
            Ok(n) => Some(n),
            Err(e) if e.kind() == ErrorKind::WouldBlock => None,
            Err(e) => {
                debug!("Receive on {} failed: {}", self.path.display(), e);
                None
            }
        }
    }
}

impl Drop for BoundSocket {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn bind_or_degrade(kind: &str, path: &Path) -> Option<BoundSocket> {
    match BoundSocket::bind(path) {
        Ok(socket) => {
            info!("Listening for {} on {}", kind, path.display());
            Some(socket)
        }
        Err(e) => {
            warn!("{} channel unavailable, continuing without it: {:#}", kind, e);
            None
        }
    }
}

// =============================================================================
// Track metadata
// =============================================================================

pub struct UnixTrackSource {
    socket: Option<BoundSocket>,
    buf: [u8; RECV_BUFFER],
}

impl UnixTrackSource {
    /// Bind the track socket, falling back to an empty source on failure
    pub fn bind(path: impl AsRef<Path>) -> Self {
        Self {
            socket: bind_or_degrade("track metadata", path.as_ref()),
            buf: [0; RECV_BUFFER],
        }
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }
}

impl TelemetrySource for UnixTrackSource {
    fn name(&self) -> &str {
        "track-socket"
    }

    fn try_receive(&mut self) -> Option<InboundMessage> {
        let socket = self.socket.as_ref()?;
        for _ in 0..MAX_SKIPPED_DATAGRAMS {
            let n = socket.recv(&mut self.buf)?;
            let update = TrackUpdate::parse_bytes(&self.buf[..n]);
            if !update.is_empty() {
                return Some(InboundMessage::Track(update));
            }
        }
        None
    }
}

// =============================================================================
// Speed feed
// =============================================================================

pub struct UnixSpeedSource {
    socket: Option<BoundSocket>,
    buf: [u8; RECV_BUFFER],
}

impl UnixSpeedSource {
    pub fn bind(path: impl AsRef<Path>) -> Self {
        Self {
            socket: bind_or_degrade("speed", path.as_ref()),
            buf: [0; RECV_BUFFER],
        }
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }
}

impl TelemetrySource for UnixSpeedSource {
    fn name(&self) -> &str {
        "speed-socket"
    }

    fn try_receive(&mut self) -> Option<InboundMessage> {
        let socket = self.socket.as_ref()?;
        for _ in 0..MAX_SKIPPED_DATAGRAMS {
            let n = socket.recv(&mut self.buf)?;
            match wire::decode_speed_frame(&self.buf[..n]) {
                Ok(speed) => return Some(InboundMessage::Speed(speed)),
                Err(e) => debug!("Dropping speed frame: {}", e),
            }
        }
        None
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Sends playback commands to the media bridge's socket
pub struct UnixCommandSink {
    socket: Option<UnixDatagram>,
    target: PathBuf,
}

impl UnixCommandSink {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        let socket = match UnixDatagram::unbound() {
            Ok(socket) => {
                if let Err(e) = socket.set_nonblocking(true) {
                    debug!("Command socket stays blocking: {}", e);
                }
                Some(socket)
            }
            Err(e) => {
                warn!("Command channel unavailable: {}", e);
                None
            }
        };
        Self {
            socket,
            target: target.into(),
        }
    }
}

impl CommandSink for UnixCommandSink {
    fn send_command(&mut self, command: PlaybackCommand) {
        let Some(socket) = &self.socket else {
            return;
        };
        match socket.send_to(command.as_str().as_bytes(), &self.target) {
            Ok(_) => debug!("Sent {} to {}", command, self.target.display()),
            // Nobody listening is routine: the media bridge may not be running
            Err(e) => debug!("Command {} not delivered: {}", command, e),
        }
    }
}
