//! Instrument cluster data model
//!
//! Defines the shared `VehicleTelemetry` record mutated by the engine every
//! tick, and the `ClusterSnapshot` published to observers after each tick.

use crate::gauges::{self, RpmZone, SpeedZone};
use crate::signals::TurnSignalState;
use crate::units::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Maximum number of characters kept for inbound text fields
pub const TEXT_CAP: usize = 63;

/// Shared, mutable vehicle state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleTelemetry {
    /// Current speed (0-200 km/h)
    pub speed: u16,

    /// Current gear (0 = neutral, 1-6)
    pub gear: u8,

    /// Engine RPM (1-13, x1000)
    pub rpm: u8,

    /// Odometer reading, whole units, never decreases
    pub odometer: u32,

    /// Trip meter reading
    pub trip: Kilometers,

    /// Fuel level in bars (0-8), not simulated
    pub fuel_level: u8,

    /// Engine temperature, not simulated
    pub temperature: Celsius,

    /// Turn signal the engine wants lit
    pub signal_request: SignalRequest,

    /// Last known media player state
    pub track: TrackInfo,

    /// Mock navigation hint
    pub navigation: NavigationHint,
}

impl Default for VehicleTelemetry {
    fn default() -> Self {
        Self {
            speed: 0,
            gear: gauges::NEUTRAL,
            rpm: gauges::MIN_RPM,
            odometer: 0,
            trip: Kilometers(0.0),
            fuel_level: 5,
            temperature: Celsius(90.0),
            signal_request: SignalRequest::Off,
            track: TrackInfo::default(),
            navigation: NavigationHint::default(),
        }
    }
}

impl VehicleTelemetry {
    /// Fresh state seeded with persisted odometer and trip readings
    pub fn with_odometer(odometer: u32, trip: f64) -> Self {
        Self {
            odometer,
            trip: Kilometers(trip.max(0.0)),
            ..Self::default()
        }
    }

    pub fn left_signal_requested(&self) -> bool {
        self.signal_request.left()
    }

    pub fn right_signal_requested(&self) -> bool {
        self.signal_request.right()
    }
}

/// Turn signal requested by the engine
///
/// At most one side can be requested at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalRequest {
    #[default]
    Off,
    Left,
    Right,
}

impl SignalRequest {
    pub fn left(self) -> bool {
        self == SignalRequest::Left
    }

    pub fn right(self) -> bool {
        self == SignalRequest::Right
    }
}

/// Media player metadata, retained until a new message replaces it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_sec: u32,
    pub position_sec: u32,
    pub is_playing: bool,
}

impl Default for TrackInfo {
    fn default() -> Self {
        Self {
            title: "Not Playing".to_string(),
            artist: "Connect Phone".to_string(),
            album: String::new(),
            duration_sec: 0,
            position_sec: 0,
            is_playing: false,
        }
    }
}

/// Navigation hint for the next turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationHint {
    pub street: String,
    pub distance_meters: u32,
    pub icon: TurnIcon,
}

impl Default for NavigationHint {
    fn default() -> Self {
        Self {
            street: "Kings Road".to_string(),
            distance_meters: 500,
            icon: TurnIcon::Left,
        }
    }
}

/// Maneuver arrow shown next to the navigation hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnIcon {
    Left,
    Right,
    Straight,
}

/// Everything the cluster showed after one tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    /// When the tick finished
    pub timestamp: DateTime<Utc>,

    /// Tick counter since startup
    pub tick: u64,

    pub telemetry: VehicleTelemetry,
    pub turn_signals: TurnSignalState,
    pub speed_zone: SpeedZone,
    pub rpm_zone: RpmZone,
    pub overspeed: bool,
}

impl ClusterSnapshot {
    pub fn capture(
        tick: u64,
        telemetry: &VehicleTelemetry,
        turn_signals: &TurnSignalState,
        overspeed_limit: u16,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            tick,
            telemetry: telemetry.clone(),
            turn_signals: turn_signals.clone(),
            speed_zone: gauges::speed_zone(telemetry.speed),
            rpm_zone: gauges::rpm_zone(telemetry.rpm),
            overspeed: gauges::is_overspeed(telemetry.speed, overspeed_limit),
        }
    }
}

// === Field Masking for Selective Output ===

/// Specifies which snapshot fields to include in serialized output
///
/// Lets a client that only draws the speed arc skip the media and
/// navigation payload.
#[derive(Debug, Clone, Default)]
pub struct FieldMask {
    fields: HashSet<String>,
    include_all: bool,
}

impl FieldMask {
    /// Create a mask that includes all fields
    pub fn all() -> Self {
        Self {
            fields: HashSet::new(),
            include_all: true,
        }
    }

    /// Create a mask from a comma-separated list of field names
    pub fn parse(fields: &str) -> Self {
        let fields: HashSet<String> = fields
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            fields,
            include_all: false,
        }
    }

    /// Check if a field should be included
    pub fn includes(&self, field: &str) -> bool {
        self.include_all || self.fields.contains(&field.to_lowercase())
    }

    /// Check if all fields should be included
    pub fn is_all(&self) -> bool {
        self.include_all
    }
}

impl FromStr for FieldMask {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl ClusterSnapshot {
    /// Serialize this snapshot respecting the given field mask
    ///
    /// `timestamp` and `tick` are always present. Telemetry fields are
    /// flattened to the top level when a mask is applied.
    pub fn to_json_filtered(&self, mask: Option<&FieldMask>) -> serde_json::Result<String> {
        let mask = match mask {
            Some(mask) if !mask.is_all() => mask,
            _ => return serde_json::to_string(self),
        };

        let mut map = serde_json::Map::new();
        map.insert("timestamp".to_string(), serde_json::to_value(self.timestamp)?);
        map.insert("tick".to_string(), serde_json::to_value(self.tick)?);

        let t = &self.telemetry;
        let candidates: [(&str, serde_json::Value); 14] = [
            ("speed", serde_json::to_value(t.speed)?),
            ("gear", serde_json::to_value(t.gear)?),
            ("rpm", serde_json::to_value(t.rpm)?),
            ("odometer", serde_json::to_value(t.odometer)?),
            ("trip", serde_json::to_value(t.trip)?),
            ("fuel_level", serde_json::to_value(t.fuel_level)?),
            ("temperature", serde_json::to_value(t.temperature)?),
            ("signal_request", serde_json::to_value(t.signal_request)?),
            ("track", serde_json::to_value(&t.track)?),
            ("navigation", serde_json::to_value(&t.navigation)?),
            ("turn_signals", serde_json::to_value(&self.turn_signals)?),
            ("speed_zone", serde_json::to_value(self.speed_zone)?),
            ("rpm_zone", serde_json::to_value(self.rpm_zone)?),
            ("overspeed", serde_json::to_value(self.overspeed)?),
        ];

        for (name, value) in candidates {
            if mask.includes(name) {
                map.insert(name.to_string(), value);
            }
        }

        serde_json::to_string(&serde_json::Value::Object(map))
    }
}
