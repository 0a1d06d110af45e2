//! Wall-clock source and fire-instant computation.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeDelta, TimeZone};

use crate::types::PrayerTime;

/// Source of "now" for the scheduler.
pub trait Clock: Send + Sync + 'static {
    type Tz: TimeZone + Send + Sync + 'static;

    fn now(&self) -> DateTime<Self::Tz>;
}

/// The device's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = chrono::Local;

    fn now(&self) -> DateTime<chrono::Local> {
        chrono::Local::now()
    }
}

/// A clock frozen at one instant, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<chrono::Utc>);

impl FixedClock {
    /// Creates a clock at `date` (`YYYY-MM-DD`) and `HH:MM:SS` UTC.
    pub fn at(date: &str, time: &str) -> Result<Self, chrono::ParseError> {
        let naive = NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S")?;
        Ok(Self(chrono::Utc.from_utc_datetime(&naive)))
    }
}

impl Clock for FixedClock {
    type Tz = chrono::Utc;

    fn now(&self) -> DateTime<chrono::Utc> {
        self.0
    }
}

/// Returns the next instant `time` occurs: today if still ahead of `now`,
/// otherwise tomorrow.
pub fn fire_instant<Tz: TimeZone>(time: PrayerTime, now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    let candidate = resolve_local(&tz, today.and_time(time.time()));

    if candidate > *now {
        return candidate;
    }

    match today.succ_opt() {
        Some(tomorrow) => resolve_local(&tz, tomorrow.and_time(time.time())),
        None => candidate,
    }
}

/// Maps a local wall-clock time to an instant. Ambiguous times (clocks
/// going back) take the earlier instant; skipped times (clocks going
/// forward) move one hour later.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(instant) => instant,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + TimeDelta::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}

// ============================================================================
// Tests
// ============================================================================
