//! Wire contract for the local telemetry and command channels
//!
//! Inbound track messages are UTF-8 text with `|`-separated fields in the
//! order `title|artist|album|duration_sec|position_sec|status`. Any suffix
//! may be missing; a missing field leaves the current value alone.
//!
//! Inbound speed frames are a 4-byte little-endian unsigned integer (km/h).
//!
//! Outbound commands are the bare strings `NEXT`, `PREV` and `PLAYPAUSE`.

use crate::gauges::MAX_SPEED;
use crate::model::{TrackInfo, TEXT_CAP};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const FIELD_SEPARATOR: char = '|';

/// Size of an inbound speed frame
pub const SPEED_FRAME_LEN: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("speed frame too short: {0} bytes, expected {SPEED_FRAME_LEN}")]
    ShortSpeedFrame(usize),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown playback command: {0:?}")]
    Unknown(String),
}

/// Message received from an inbound channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Track(TrackUpdate),
    Speed(u16),
}

/// Partial track update; `None` fields were absent from the message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackUpdate {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_sec: Option<u32>,
    pub position_sec: Option<u32>,
    pub is_playing: Option<bool>,
}

impl TrackUpdate {
    /// Parse a track message
    ///
    /// Never fails. An empty message updates nothing. Fields are positional
    /// and independent: an empty text field clears that field, a non-numeric
    /// duration or position is skipped, and anything past the sixth field is
    /// ignored.
    pub fn parse(message: &str) -> Self {
        let message = message.trim_end_matches(['\r', '\n', '\0']);
        if message.is_empty() {
            return TrackUpdate::default();
        }
        let mut fields = message.split(FIELD_SEPARATOR);

        TrackUpdate {
            title: fields.next().map(cap_text),
            artist: fields.next().map(cap_text),
            album: fields.next().map(cap_text),
            duration_sec: fields.next().and_then(parse_seconds),
            position_sec: fields.next().and_then(parse_seconds),
            is_playing: fields.next().map(is_playing_status),
        }
    }

    /// Parse raw datagram bytes, replacing invalid UTF-8
    pub fn parse_bytes(bytes: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// Whether the update carries no fields at all
    pub fn is_empty(&self) -> bool {
        *self == TrackUpdate::default()
    }

    /// Overwrite the fields present in this update
    pub fn apply_to(&self, track: &mut TrackInfo) {
        if let Some(title) = &self.title {
            track.title.clone_from(title);
        }
        if let Some(artist) = &self.artist {
            track.artist.clone_from(artist);
        }
        if let Some(album) = &self.album {
            track.album.clone_from(album);
        }
        if let Some(duration) = self.duration_sec {
            track.duration_sec = duration;
        }
        if let Some(position) = self.position_sec {
            track.position_sec = position;
        }
        if let Some(playing) = self.is_playing {
            track.is_playing = playing;
        }
    }
}

fn cap_text(field: &str) -> String {
    field.chars().take(TEXT_CAP).collect()
}

fn parse_seconds(field: &str) -> Option<u32> {
    field.trim().parse().ok()
}

/// "Playing", "playing" and "PLAYING" all count; "Paused" or "Stopped" don't
fn is_playing_status(field: &str) -> bool {
    field.to_ascii_lowercase().contains("laying")
}

/// Decode a speed frame, clamping to the gauge range
pub fn decode_speed_frame(frame: &[u8]) -> Result<u16, WireError> {
    let bytes: [u8; SPEED_FRAME_LEN] = frame
        .get(..SPEED_FRAME_LEN)
        .and_then(|b| b.try_into().ok())
        .ok_or(WireError::ShortSpeedFrame(frame.len()))?;
    let speed = u32::from_le_bytes(bytes).min(u32::from(MAX_SPEED));
    Ok(speed as u16)
}

/// Encode a speed frame as the speed bridge sends it
pub fn encode_speed_frame(speed: u32) -> [u8; SPEED_FRAME_LEN] {
    speed.to_le_bytes()
}

/// Playback command sent to the media player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackCommand {
    Next,
    Prev,
    #[serde(rename = "PLAYPAUSE")]
    PlayPause,
}

impl PlaybackCommand {
    pub const ALL: [PlaybackCommand; 3] = [
        PlaybackCommand::Next,
        PlaybackCommand::Prev,
        PlaybackCommand::PlayPause,
    ];

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackCommand::Next => "NEXT",
            PlaybackCommand::Prev => "PREV",
            PlaybackCommand::PlayPause => "PLAYPAUSE",
        }
    }
}

impl fmt::Display for PlaybackCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaybackCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CommandError::Unknown(s.to_string()))
    }
}
