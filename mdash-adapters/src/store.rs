//! File-backed odometer store
//!
//! The record is rewritten whole on every save: written to a sibling temp
//! file first, then renamed over the real one, so a crash mid-write leaves
//! the previous record intact.

use mdash_core::persist::{OdometerRecord, OdometerStore, StoreError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "vehicle_data".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl OdometerStore for FileStore {
    fn load(&self) -> OdometerRecord {
        match fs::read_to_string(&self.path) {
            Ok(text) => OdometerRecord::parse(&text).unwrap_or_else(|| {
                warn!(
                    "Odometer record {} is corrupt, starting from zero",
                    self.path.display()
                );
                OdometerRecord::default()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No odometer record at {}", self.path.display());
                OdometerRecord::default()
            }
            Err(e) => {
                warn!(
                    "Failed to read odometer record {}: {}",
                    self.path.display(),
                    e
                );
                OdometerRecord::default()
            }
        }
    }

    fn save(&mut self, record: OdometerRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let temp = self.temp_path();
        fs::write(&temp, record.to_string())?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}
