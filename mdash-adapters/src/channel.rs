//! In-process telemetry source backed by a tokio channel
//!
//! Lets async producers (the HTTP API, tests) feed the synchronous tick
//! loop without blocking it.

use mdash_core::{source::TelemetrySource, wire::InboundMessage};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

/// Producer half of a `ChannelSource`
#[derive(Clone, Debug)]
pub struct ChannelSender {
    tx: UnboundedSender<InboundMessage>,
}

impl ChannelSender {
    /// Queue a message; returns false if the source was dropped
    pub fn send(&self, message: InboundMessage) -> bool {
        self.tx.send(message).is_ok()
    }
}

pub struct ChannelSource {
    name: String,
    rx: UnboundedReceiver<InboundMessage>,
}

impl ChannelSource {
    pub fn new(name: impl Into<String>) -> (ChannelSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ChannelSender { tx },
            Self {
                name: name.into(),
                rx,
            },
        )
    }
}

impl TelemetrySource for ChannelSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn try_receive(&mut self) -> Option<InboundMessage> {
        match self.rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}
