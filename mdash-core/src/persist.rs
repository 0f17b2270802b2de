//! Odometer persistence contract
//!
//! The record is two numbers in plain text, `"<odometer> <trip>"` with the
//! trip written to one decimal place, e.g. `"12345 123.4"`.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write odometer record: {0}")]
    Io(#[from] std::io::Error),
}

/// Persisted odometer and trip readings
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OdometerRecord {
    pub odometer: u32,
    pub trip: f64,
}

impl OdometerRecord {
    pub fn new(odometer: u32, trip: f64) -> Self {
        Self { odometer, trip }
    }

    /// Parse the textual record
    ///
    /// Returns `None` unless both fields are present and valid. Trailing
    /// content after the two fields is ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let mut fields = text.split_whitespace();
        let odometer = fields.next()?.parse().ok()?;
        let trip: f64 = fields.next()?.parse().ok()?;
        if !trip.is_finite() || trip < 0.0 {
            return None;
        }
        Some(Self { odometer, trip })
    }
}

impl fmt::Display for OdometerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.1}", self.odometer, self.trip)
    }
}

/// Durable odometer and trip storage
pub trait OdometerStore: Send {
    /// Load the persisted record
    ///
    /// Missing or corrupt data is not an error: it means "no prior state"
    /// and yields `OdometerRecord::default()`.
    fn load(&self) -> OdometerRecord;

    /// Overwrite the whole record
    fn save(&mut self, record: OdometerRecord) -> Result<(), StoreError>;
}

/// In-memory store, used when nothing should touch the disk
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Option<OdometerRecord>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a record, as if loaded from a previous run
    pub fn with_record(record: OdometerRecord) -> Self {
        Self {
            record: Some(record),
            saves: 0,
        }
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn record(&self) -> Option<OdometerRecord> {
        self.record
    }
}

impl OdometerStore for MemoryStore {
    fn load(&self) -> OdometerRecord {
        self.record.unwrap_or_default()
    }

    fn save(&mut self, record: OdometerRecord) -> Result<(), StoreError> {
        // Round-trip through the text format so precision matches a file
        self.record = OdometerRecord::parse(&record.to_string());
        self.saves += 1;
        Ok(())
    }
}
