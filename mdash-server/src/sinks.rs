//! Output sink implementations
//!
//! Two kinds of output leave the cluster:
//! - display updates, pushed field by field to a `DisplaySink`
//! - whole snapshots, forwarded to configured destinations (UDP, file)

use crate::state::{AppState, SinkConfig, SinkType};
use anyhow::{bail, Context, Result};
use mdash_core::{
    display::DisplaySink,
    gauges::{RpmZone, SpeedZone},
    model::{ClusterSnapshot, FieldMask},
};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// =============================================================================
// Display
// =============================================================================

/// Display sink that renders into the log
///
/// Stands in for a panel when the cluster runs headless.
#[derive(Debug, Default)]
pub struct TracingDisplay;

impl DisplaySink for TracingDisplay {
    fn set_speed(&mut self, speed: u16, zone: SpeedZone) {
        debug!(target: "display", "speed {} km/h ({:?})", speed, zone);
    }

    fn set_gear(&mut self, gear: u8, zone: SpeedZone) {
        match gear {
            0 => debug!(target: "display", "gear N ({:?})", zone),
            g => debug!(target: "display", "gear {} ({:?})", g, zone),
        }
    }

    fn set_rpm(&mut self, rpm: u8, zone: RpmZone) {
        debug!(target: "display", "rpm {}k ({:?})", rpm, zone);
    }

    fn set_turn_signals(&mut self, left_on: bool, right_on: bool) {
        debug!(target: "display", "signals left={} right={}", left_on, right_on);
    }

    fn set_track(&mut self, title: &str, artist: &str, album: &str) {
        info!(target: "display", "now playing {} - {} [{}]", artist, title, album);
    }

    fn set_playback_progress(&mut self, position_sec: u32, duration_sec: u32, is_playing: bool) {
        debug!(
            target: "display",
            "progress {}:{:02}/{}:{:02} {}",
            position_sec / 60,
            position_sec % 60,
            duration_sec / 60,
            duration_sec % 60,
            if is_playing { "playing" } else { "paused" }
        );
    }

    fn set_navigation(&mut self, distance_meters: u32, street: &str) {
        debug!(target: "display", "turn in {} m onto {}", distance_meters, street);
    }

    fn set_odometer(&mut self, odometer: u32, trip: f64) {
        debug!(target: "display", "odo {} trip {:.1}", odometer, trip);
    }

    fn set_alert(&mut self, active: bool, text: &str) {
        if active {
            warn!(target: "display", "{}", text);
        } else {
            debug!(target: "display", "alert cleared");
        }
    }
}

// =============================================================================
// Snapshot forwarding
// =============================================================================

/// Destination for published snapshots
pub trait Sink: Send {
    fn send(&mut self, snapshot: &ClusterSnapshot, mask: Option<&FieldMask>) -> Result<()>;
}

/// UDP sink, one JSON datagram per snapshot
pub struct UdpSink {
    socket: std::net::UdpSocket,
    addr: std::net::SocketAddr,
}

impl UdpSink {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let socket = std::net::UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        let addr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid UDP target {}:{}", host, port))?;
        Ok(Self { socket, addr })
    }
}

impl Sink for UdpSink {
    fn send(&mut self, snapshot: &ClusterSnapshot, mask: Option<&FieldMask>) -> Result<()> {
        let json = snapshot.to_json_filtered(mask)?;
        self.socket.send_to(json.as_bytes(), self.addr)?;
        Ok(())
    }
}

/// File sink (NDJSON)
pub struct FileSink {
    file: std::fs::File,
}

impl FileSink {
    pub fn new(path: &Path) -> Result<Self> {
        use std::fs::OpenOptions;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating sink directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening sink file {}", path.display()))?;
        Ok(Self { file })
    }
}

/// Resolve a file sink path inside `sink_dir`
///
/// Only plain relative paths are accepted: no root, no prefix, no `.` or `..`.
pub fn resolve_sink_path(sink_dir: &Path, path: &str) -> Result<PathBuf> {
    let relative = Path::new(path);
    if path.is_empty() {
        bail!("sink path is empty");
    }
    if !relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        bail!("sink path {} must be relative to the sink directory", path);
    }
    Ok(sink_dir.join(relative))
}

impl Sink for FileSink {
    fn send(&mut self, snapshot: &ClusterSnapshot, mask: Option<&FieldMask>) -> Result<()> {
        use std::io::Write;
        let json = snapshot.to_json_filtered(mask)?;
        writeln!(self.file, "{}", json)?;
        Ok(())
    }
}

/// Create a sink from configuration, placing file sinks under `sink_dir`
pub fn create_sink(config: &SinkConfig, sink_dir: &Path) -> Result<Box<dyn Sink>> {
    match &config.sink_type {
        SinkType::Udp { host, port } => Ok(Box::new(UdpSink::new(host, *port)?)),
        SinkType::File { path } => {
            let path = resolve_sink_path(sink_dir, path)?;
            Ok(Box::new(FileSink::new(&path)?))
        }
    }
}

struct OpenSink {
    config: SinkConfig,
    mask: Option<FieldMask>,
    sink: Box<dyn Sink>,
}

/// Forward every published snapshot to the configured sinks
///
/// The open set is reconciled with `AppState::sinks` before each snapshot,
/// so sinks added or removed over the API take effect on the next tick.
pub async fn run_forwarder(state: AppState, cancel: CancellationToken) {
    let mut rx = state.subscribe();
    let mut open: HashMap<String, OpenSink> = HashMap::new();

    loop {
        let snapshot = tokio::select! {
            _ = cancel.cancelled() => break,
            received = rx.recv() => match received {
                Ok(snapshot) => snapshot,
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Forwarder lagged, skipped {} snapshots", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
        };

        reconcile(&state, &mut open).await;

        for entry in open.values_mut() {
            if let Err(e) = entry.sink.send(&snapshot, entry.mask.as_ref()) {
                warn!("Sink {} failed: {:#}", entry.config.id, e);
            }
        }
    }

    debug!("Snapshot forwarder stopped");
}

async fn reconcile(state: &AppState, open: &mut HashMap<String, OpenSink>) {
    let configs = state.sinks.read().await;

    // Any edit to a config reopens its sink
    open.retain(|_, entry| configs.iter().any(|c| c == &entry.config));

    for config in configs.iter() {
        if open.contains_key(&config.id) {
            continue;
        }
        match create_sink(config, &state.sink_dir) {
            Ok(sink) => {
                info!("Opened sink {}", config.id);
                open.insert(
                    config.id.clone(),
                    OpenSink {
                        config: config.clone(),
                        mask: config.field_mask.as_deref().map(FieldMask::parse),
                        sink,
                    },
                );
            }
            // Retried on the next snapshot
            Err(e) => debug!("Sink {} unavailable: {:#}", config.id, e),
        }
    }
}
