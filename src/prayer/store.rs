//! Prayer time store keyed by date.
//!
//! Records live in a single JSON object file mapping ISO dates
//! (`YYYY-MM-DD`) to the day's prayer times. The whole file is read and
//! rewritten on every change; the store holds at most a few hundred days.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PrayerTimeSet;

/// Masjid name used when a record does not carry one.
pub const DEFAULT_MASJID_NAME: &str = "Local Masjid";

/// Errors that can occur while reading or writing the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store file could not be read or written.
    #[error("failed to access prayer time store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file exists but is not valid JSON.
    #[error("prayer time store {0} is corrupt: {1}")]
    Corrupt(PathBuf, String),

    /// No record exists for the requested date.
    #[error("no prayer times found for {0}")]
    NotFound(NaiveDate),
}

impl StoreError {
    /// Returns true if the error is a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Io { .. } => "check permissions of the azaan data directory",
            Self::Corrupt(..) => "fix or remove the store file, then re-enter the times",
            Self::NotFound(_) => "add the times with 'azaan times set'",
        }
    }
}

/// Prayer times for one date at one masjid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerRecord {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub times: PrayerTimeSet,
    #[serde(default = "default_masjid_name")]
    pub masjid_name: String,
    /// Milliseconds since the Unix epoch of the last write.
    #[serde(default)]
    pub updated_at: i64,
}

fn default_masjid_name() -> String {
    DEFAULT_MASJID_NAME.to_string()
}

impl PrayerRecord {
    /// Creates a record stamped with the current time.
    pub fn new(date: NaiveDate, times: PrayerTimeSet, masjid_name: impl Into<String>) -> Self {
        Self {
            date,
            times,
            masjid_name: masjid_name.into(),
            updated_at: Utc::now().timestamp_millis(),
        }
    }
}

/// JSON file store of prayer records.
#[derive(Debug, Clone)]
pub struct PrayerTimeStore {
    path: PathBuf,
}

impl PrayerTimeStore {
    /// Creates a store backed by the given file. The file is created lazily.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Looks up the record for a date.
    pub fn get(&self, date: NaiveDate) -> Result<Option<PrayerRecord>, StoreError> {
        Ok(self.load()?.remove(&date))
    }

    /// Looks up the times for a date, failing with `NotFound` when absent.
    pub fn times_for(&self, date: NaiveDate) -> Result<PrayerTimeSet, StoreError> {
        self.get(date)?
            .map(|record| record.times)
            .ok_or(StoreError::NotFound(date))
    }

    /// Adds a record, replacing any record for the same date.
    pub fn add(&self, mut record: PrayerRecord) -> Result<PrayerRecord, StoreError> {
        let mut records = self.load()?;
        record.updated_at = Utc::now().timestamp_millis();
        records.insert(record.date, record.clone());
        self.save(&records)?;

        tracing::info!(date = %record.date, "prayer times added");
        Ok(record)
    }

    /// Updates an existing record.
    pub fn update(&self, mut record: PrayerRecord) -> Result<PrayerRecord, StoreError> {
        let mut records = self.load()?;
        if !records.contains_key(&record.date) {
            return Err(StoreError::NotFound(record.date));
        }

        record.updated_at = Utc::now().timestamp_millis();
        records.insert(record.date, record.clone());
        self.save(&records)?;

        tracing::info!(date = %record.date, "prayer times updated");
        Ok(record)
    }

    /// Deletes the record for a date.
    pub fn delete(&self, date: NaiveDate) -> Result<PrayerRecord, StoreError> {
        let mut records = self.load()?;
        let removed = records.remove(&date).ok_or(StoreError::NotFound(date))?;
        self.save(&records)?;

        tracing::info!(date = %date, "prayer times deleted");
        Ok(removed)
    }

    /// Returns every record, oldest date first.
    pub fn list(&self) -> Result<Vec<PrayerRecord>, StoreError> {
        Ok(self.load()?.into_values().collect())
    }

    fn load(&self) -> Result<BTreeMap<NaiveDate, PrayerRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let raw = std::fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt(self.path.clone(), e.to_string()))
    }

    fn save(&self, records: &BTreeMap<NaiveDate, PrayerRecord>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(records)
            .map_err(|e| StoreError::Corrupt(self.path.clone(), e.to_string()))?;
        std::fs::write(&self.path, json).map_err(io_err)
    }
}

// ============================================================================
// Tests
// ============================================================================
