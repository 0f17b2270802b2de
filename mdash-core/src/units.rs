//! Type-safe wrappers for physical units
//!
//! Newtypes so trip distances and temperatures can't be mixed up with raw
//! gauge values. Distances are f64: per-tick increments are a few
//! millionths of a kilometer and must still register on a trip in the
//! tens of thousands.
//!
//! Float units serialize with 4 decimal places to keep snapshot JSON small.

use serde::{Deserialize, Serialize};

/// Round f32 to 4 decimal places for compact JSON serialization
fn round4<S: serde::Serializer>(val: &f32, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f32((*val * 10000.0).round() / 10000.0)
}

fn round4_f64<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((*val * 10000.0).round() / 10000.0)
}

/// Kilometers (trip meter, accumulated distance)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Kilometers(#[serde(serialize_with = "round4_f64")] pub f64);

impl Kilometers {
    /// Add a distance, ignoring negative or non-finite deltas
    pub fn advance(&mut self, delta: f64) {
        if delta.is_finite() && delta > 0.0 {
            self.0 += delta;
        }
    }
}

/// Celsius
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Celsius(#[serde(serialize_with = "round4")] pub f32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kilometers_ignores_negative_and_nan() {
        let mut km = Kilometers(1.0);
        km.advance(-0.5);
        km.advance(f64::NAN);
        assert_eq!(km, Kilometers(1.0));
        km.advance(0.25);
        assert_eq!(km, Kilometers(1.25));
    }

    #[test]
    fn test_kilometers_serializes_rounded() {
        let json = serde_json::to_string(&Kilometers(12.345678)).unwrap();
        assert_eq!(json, "12.3457");
    }

    #[test]
    fn test_kilometers_keeps_tiny_steps_on_a_long_trip() {
        let mut km = Kilometers(20_000.0);
        for _ in 0..10_000 {
            km.advance(200.0 * 0.000_004_44);
        }
        assert!((km.0 - 20_008.88).abs() < 1e-6, "trip {}", km.0);
    }
}
