//! Application state management

use mdash_adapters::ChannelSender;
use mdash_core::{
    model::ClusterSnapshot,
    source::{CommandSink, NullCommandSink},
    wire::PlaybackCommand,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

/// Snapshots kept for slow subscribers before they start lagging
const SNAPSHOT_CAPACITY: usize = 100;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Broadcast channel for cluster snapshots, one per tick
    pub snapshot_tx: broadcast::Sender<ClusterSnapshot>,

    /// Most recent snapshot, `None` until the first tick
    pub latest: Arc<RwLock<Option<ClusterSnapshot>>>,

    /// Outbound playback command channel
    pub commands: Arc<Mutex<Box<dyn CommandSink>>>,

    /// Injects track messages into the tick loop
    pub track_tx: Option<ChannelSender>,

    /// Sinks for forwarding snapshots
    pub sinks: Arc<RwLock<Vec<SinkConfig>>>,

    /// Root directory for file sink paths
    pub sink_dir: Arc<PathBuf>,
}

/// Configuration for an output sink
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub id: String,
    pub sink_type: SinkType,
    pub field_mask: Option<String>, // Comma-separated field names
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkType {
    Udp { host: String, port: u16 },
    /// Path relative to the sink directory
    File { path: String },
}

impl AppState {
    pub fn new() -> Self {
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CAPACITY);

        Self {
            snapshot_tx,
            latest: Arc::new(RwLock::new(None)),
            commands: Arc::new(Mutex::new(Box::new(NullCommandSink))),
            track_tx: None,
            sinks: Arc::new(RwLock::new(Vec::new())),
            sink_dir: Arc::new(std::env::temp_dir().join("mdash").join("sinks")),
        }
    }

    pub fn with_sink_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sink_dir = Arc::new(dir.into());
        self
    }

    pub fn with_command_sink(mut self, sink: Box<dyn CommandSink>) -> Self {
        self.commands = Arc::new(Mutex::new(sink));
        self
    }

    pub fn with_track_sender(mut self, tx: ChannelSender) -> Self {
        self.track_tx = Some(tx);
        self
    }

    /// Record and broadcast a freshly captured snapshot
    pub async fn publish(&self, snapshot: ClusterSnapshot) {
        *self.latest.write().await = Some(snapshot.clone());
        // No receivers is fine; they'll get the next one
        let _ = self.snapshot_tx.send(snapshot);
    }

    pub async fn send_command(&self, command: PlaybackCommand) {
        self.commands.lock().await.send_command(command);
    }

    /// Subscribe to cluster snapshots
    pub fn subscribe(&self) -> broadcast::Receiver<ClusterSnapshot> {
        self.snapshot_tx.subscribe()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
