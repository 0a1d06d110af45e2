//! Prayer time evaluation and storage.
//!
//! - `evaluator`: current/next prayer and countdown for a given time of day
//! - `store`: JSON file store of prayer times keyed by date

pub mod evaluator;
pub mod store;

pub use evaluator::{
    daily_rows, evaluate, format_countdown, sorted_by_time, PrayerRow, PrayerSlot, PrayerStatus,
};
pub use store::{PrayerRecord, PrayerTimeStore, StoreError, DEFAULT_MASJID_NAME};
