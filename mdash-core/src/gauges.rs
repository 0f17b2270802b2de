//! Derived gauge state
//!
//! Pure functions mapping raw speed to the values the cluster shows: gear,
//! engine RPM and the color zones used by the speed arc and RPM readout.
//! Every function is total over its input type.

use serde::{Deserialize, Serialize};

/// Highest speed the gauge can show (km/h)
pub const MAX_SPEED: u16 = 200;

/// Gear shown while stopped
pub const NEUTRAL: u8 = 0;

/// Lowest and highest RPM readout (x1000)
pub const MIN_RPM: u8 = 1;
pub const MAX_RPM: u8 = 13;

// Upper bounds (exclusive) for gears 1 through 5; anything above is 6th.
const GEAR_LIMITS: [u16; 5] = [25, 50, 80, 120, 160];

// RPM per km/h for gears 1 through 6
const GEAR_FACTORS: [f32; 6] = [0.20, 0.12, 0.08, 0.06, 0.05, 0.04];

/// Idle offset added to every geared RPM value (x1000)
const RPM_OFFSET: f32 = 2.0;

/// Speed zone upper bounds (inclusive)
pub const SPEED_ZONE_GREEN_MAX: u16 = 60;
pub const SPEED_ZONE_YELLOW_MAX: u16 = 120;
pub const SPEED_ZONE_ORANGE_MAX: u16 = 160;

/// RPM zone upper bounds (inclusive)
pub const RPM_ZONE_GREEN_MAX: u8 = 7;
pub const RPM_ZONE_ORANGE_MAX: u8 = 10;

const _: () = assert!(SPEED_ZONE_GREEN_MAX < SPEED_ZONE_YELLOW_MAX);
const _: () = assert!(SPEED_ZONE_YELLOW_MAX < SPEED_ZONE_ORANGE_MAX);
const _: () = assert!(SPEED_ZONE_ORANGE_MAX < MAX_SPEED);
const _: () = assert!(RPM_ZONE_GREEN_MAX < RPM_ZONE_ORANGE_MAX);
const _: () = assert!(RPM_ZONE_ORANGE_MAX < MAX_RPM);

/// Color band for the speed arc, digital speed and gear indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedZone {
    Green,
    Yellow,
    Orange,
    Red,
}

impl SpeedZone {
    /// Numeric index (0 = green .. 3 = red)
    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Color band for the RPM readout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpmZone {
    Green,
    Orange,
    Red,
}

impl RpmZone {
    /// Numeric index (0 = green .. 2 = red)
    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Gear for a given speed (0 = neutral, 1-6)
pub fn calculate_gear(speed: u16) -> u8 {
    if speed == 0 {
        return NEUTRAL;
    }
    GEAR_LIMITS
        .iter()
        .position(|&limit| speed < limit)
        .map(|idx| idx as u8 + 1)
        .unwrap_or(6)
}

/// Engine RPM (x1000) for a speed in a gear, clamped to 1..=13
///
/// Lower gears spin the engine faster for the same road speed. Gears
/// outside 1..=6 use the 4th gear factor.
pub fn calculate_rpm(speed: u16, gear: u8) -> u8 {
    if gear == NEUTRAL || speed == 0 {
        return MIN_RPM;
    }
    let factor = match gear {
        1..=6 => GEAR_FACTORS[usize::from(gear) - 1],
        _ => GEAR_FACTORS[3],
    };
    let rpm = (f32::from(speed) * factor + RPM_OFFSET).round();
    rpm.clamp(f32::from(MIN_RPM), f32::from(MAX_RPM)) as u8
}

/// Speed color zone
pub fn speed_zone(speed: u16) -> SpeedZone {
    match speed {
        s if s <= SPEED_ZONE_GREEN_MAX => SpeedZone::Green,
        s if s <= SPEED_ZONE_YELLOW_MAX => SpeedZone::Yellow,
        s if s <= SPEED_ZONE_ORANGE_MAX => SpeedZone::Orange,
        _ => SpeedZone::Red,
    }
}

/// RPM color zone
pub fn rpm_zone(rpm: u8) -> RpmZone {
    match rpm {
        r if r <= RPM_ZONE_GREEN_MAX => RpmZone::Green,
        r if r <= RPM_ZONE_ORANGE_MAX => RpmZone::Orange,
        _ => RpmZone::Red,
    }
}

/// Whether the speed is past the overspeed limit
pub fn is_overspeed(speed: u16, limit: u16) -> bool {
    speed > limit
}
