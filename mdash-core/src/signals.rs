//! Turn-signal blink controller
//!
//! The engine only says which side it wants lit. The blinker turns that
//! steady request into an on/off pattern with a fixed toggle period.

use crate::model::SignalRequest;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Time between blink toggles
pub const DEFAULT_BLINK_PERIOD: Duration = Duration::from_millis(480);

/// Display-facing turn signal state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSignalState {
    pub left_active: bool,
    pub right_active: bool,
    pub left_blink_on: bool,
    pub right_blink_on: bool,
    /// Ticks since the last toggle
    pub blink_counter: u32,
}

/// Fixed-cadence blink timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blinker {
    threshold: u32,
}

impl Blinker {
    /// Blinker that toggles every `threshold` ticks (at least 1)
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    /// Blinker whose toggle period is as close to `blink_period` as the
    /// tick period allows
    ///
    /// 16 ms ticks give a threshold of 30, 40 ms ticks give 12.
    pub fn for_tick(tick: Duration, blink_period: Duration) -> Self {
        if tick.is_zero() {
            return Self::new(1);
        }
        let ticks = (blink_period.as_secs_f64() / tick.as_secs_f64()).round();
        Self::new(ticks as u32)
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Advance one tick
    ///
    /// Returns true on toggle ticks, the only ticks where the display needs
    /// a turn signal update.
    pub fn tick(&self, state: &mut TurnSignalState, request: SignalRequest) -> bool {
        state.left_active = request.left();
        state.right_active = request.right();

        state.blink_counter += 1;
        if state.blink_counter < self.threshold {
            return false;
        }
        state.blink_counter = 0;

        // An inactive side goes dark right away instead of finishing its cycle
        state.left_blink_on = state.left_active && !state.left_blink_on;
        state.right_blink_on = state.right_active && !state.right_blink_on;
        true
    }
}

impl Default for Blinker {
    fn default() -> Self {
        Self::for_tick(Duration::from_millis(16), DEFAULT_BLINK_PERIOD)
    }
}
