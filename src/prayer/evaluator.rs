//! Time-of-day evaluator.
//!
//! Pure functions mapping a `PrayerTimeSet` and the current wall-clock time
//! to the current prayer, the next prayer and a countdown string. Prayers are
//! ordered by time of day, not by canonical sequence; equal times keep the
//! canonical sequence because the sort is stable.

use chrono::{NaiveTime, Timelike};

use crate::types::{PrayerName, PrayerTime, PrayerTimeSet};

/// Minutes in a day.
const MINUTES_PER_DAY: i64 = 24 * 60;

/// A prayer together with its time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrayerSlot {
    pub prayer: PrayerName,
    pub time: PrayerTime,
}

/// Result of evaluating a set against "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrayerStatus {
    /// Most recent prayer whose time has passed.
    pub current: PrayerSlot,
    /// First prayer whose time has not passed yet.
    pub next: PrayerSlot,
    /// Whole minutes until `next`, always in `1..=1440`.
    pub minutes_until_next: u32,
    /// True when `next` wrapped to tomorrow.
    pub next_is_tomorrow: bool,
}

impl PrayerStatus {
    /// Countdown to the next prayer in `"{h}h {m}m"` form.
    pub fn countdown(&self) -> String {
        format_countdown(self.minutes_until_next)
    }
}

/// One row of the daily table shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrayerRow {
    pub slot: PrayerSlot,
    pub is_passed: bool,
    pub is_current: bool,
    pub is_next: bool,
}

/// Returns the five prayers sorted by time of day.
pub fn sorted_by_time(times: &PrayerTimeSet) -> [PrayerSlot; 5] {
    let mut slots = times
        .entries()
        .map(|(prayer, time)| PrayerSlot { prayer, time });
    // Stable: equal times stay in canonical order
    slots.sort_by_key(|slot| slot.time.minutes_of_day());
    slots
}

/// Determines the current and next prayer at `now`.
pub fn evaluate(times: &PrayerTimeSet, now: NaiveTime) -> PrayerStatus {
    let now_minutes = now.hour() * 60 + now.minute();
    let slots = sorted_by_time(times);

    let mut current = slots[slots.len() - 1];
    let mut next = slots[0];
    let mut next_is_tomorrow = true;

    for (i, slot) in slots.iter().enumerate() {
        if now_minutes < slot.time.minutes_of_day() {
            next = *slot;
            next_is_tomorrow = false;
            if i > 0 {
                current = slots[i - 1];
            }
            break;
        }
    }

    let mut minutes_until = i64::from(next.time.minutes_of_day()) - i64::from(now_minutes);
    if minutes_until <= 0 {
        minutes_until += MINUTES_PER_DAY;
    }

    PrayerStatus {
        current,
        next,
        minutes_until_next: u32::try_from(minutes_until).unwrap_or(0),
        next_is_tomorrow,
    }
}

/// Builds the daily table in canonical order, flagging passed/current/next.
///
/// A prayer whose minute equals `now` counts as passed, so it is marked
/// passed and current together. Only a strictly later minute is upcoming,
/// which keeps `is_passed` consistent with the current prayer.
pub fn daily_rows(times: &PrayerTimeSet, now: NaiveTime) -> Vec<PrayerRow> {
    let status = evaluate(times, now);
    let now_minutes = now.hour() * 60 + now.minute();

    times
        .entries()
        .into_iter()
        .map(|(prayer, time)| PrayerRow {
            slot: PrayerSlot { prayer, time },
            is_passed: now_minutes >= time.minutes_of_day(),
            is_current: status.current.prayer == prayer,
            is_next: status.next.prayer == prayer,
        })
        .collect()
}

/// Formats minutes as `"{h}h {m}m"`, or `"{m}m"` under an hour.
pub fn format_countdown(total_minutes: u32) -> String {
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_set() -> PrayerTimeSet {
        PrayerTimeSet::parse("05:30", "12:30", "15:45", "18:15", "19:30").unwrap()
    }

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    mod evaluate_tests {
        use super::*;

        #[test]
        fn test_afternoon_between_dhuhr_and_asr() {
            let status = evaluate(&sample_set(), at(14, 0));

            assert_eq!(status.current.prayer, PrayerName::Dhuhr);
            assert_eq!(status.next.prayer, PrayerName::Asr);
            assert_eq!(status.countdown(), "1h 45m");
            assert!(!status.next_is_tomorrow);
        }

        #[test]
        fn test_late_night_wraps_to_fajr() {
            let status = evaluate(&sample_set(), at(23, 50));

            assert_eq!(status.current.prayer, PrayerName::Isha);
            assert_eq!(status.next.prayer, PrayerName::Fajr);
            assert_eq!(status.countdown(), "5h 40m");
            assert!(status.next_is_tomorrow);
        }

        #[test]
        fn test_before_fajr_current_is_previous_isha() {
            let status = evaluate(&sample_set(), at(3, 0));

            assert_eq!(status.current.prayer, PrayerName::Isha);
            assert_eq!(status.next.prayer, PrayerName::Fajr);
            assert_eq!(status.countdown(), "2h 30m");
            assert!(!status.next_is_tomorrow);
        }

        #[test]
        fn test_exact_prayer_minute_counts_as_passed() {
            let status = evaluate(&sample_set(), at(15, 45));

            assert_eq!(status.current.prayer, PrayerName::Asr);
            assert_eq!(status.next.prayer, PrayerName::Maghrib);
            assert_eq!(status.countdown(), "2h 30m");
        }

        #[test]
        fn test_seconds_are_ignored() {
            let now = NaiveTime::from_hms_opt(15, 44, 59).unwrap();
            let status = evaluate(&sample_set(), now);

            assert_eq!(status.next.prayer, PrayerName::Asr);
            assert_eq!(status.countdown(), "1m");
        }

        #[test]
        fn test_out_of_order_times_sorted_by_value() {
            // Asr entered before Dhuhr
            let set = PrayerTimeSet::parse("05:30", "15:45", "12:30", "18:15", "19:30").unwrap();
            let status = evaluate(&set, at(14, 0));

            assert_eq!(status.current.prayer, PrayerName::Asr);
            assert_eq!(status.next.prayer, PrayerName::Dhuhr);
        }

        #[test]
        fn test_equal_times_keep_canonical_order() {
            let set = PrayerTimeSet::parse("05:30", "12:30", "12:30", "18:15", "19:30").unwrap();

            let slots = sorted_by_time(&set);
            assert_eq!(slots[1].prayer, PrayerName::Dhuhr);
            assert_eq!(slots[2].prayer, PrayerName::Asr);

            let status = evaluate(&set, at(10, 0));
            assert_eq!(status.next.prayer, PrayerName::Dhuhr);
        }

        #[test]
        fn test_all_equal_at_now_wraps_full_day() {
            let set = PrayerTimeSet::parse("12:00", "12:00", "12:00", "12:00", "12:00").unwrap();
            let status = evaluate(&set, at(12, 0));

            assert_eq!(status.next.prayer, PrayerName::Fajr);
            assert_eq!(status.current.prayer, PrayerName::Isha);
            assert_eq!(status.countdown(), "24h 0m");
        }
    }

    mod daily_rows_tests {
        use super::*;

        #[test]
        fn test_rows_in_canonical_order_with_flags() {
            let rows = daily_rows(&sample_set(), at(14, 0));

            assert_eq!(rows.len(), 5);
            assert_eq!(rows[0].slot.prayer, PrayerName::Fajr);
            assert!(rows[0].is_passed);
            assert!(rows[1].is_current);
            assert!(rows[2].is_next);
            assert!(!rows[2].is_passed);
            assert!(!rows[4].is_passed);
        }

        #[test]
        fn test_prayer_at_now_is_passed_and_current() {
            let rows = daily_rows(&sample_set(), at(15, 45));

            assert!(rows[2].is_passed);
            assert!(rows[2].is_current);
            assert!(rows[3].is_next);
        }

        #[test]
        fn test_prayer_one_minute_ahead_is_not_passed() {
            let rows = daily_rows(&sample_set(), at(15, 44));

            assert!(!rows[2].is_passed);
            assert!(rows[2].is_next);
            assert!(rows[1].is_current);
        }
    }

    mod format_countdown_tests {
        use super::*;

        #[test]
        fn test_minutes_only() {
            assert_eq!(format_countdown(0), "0m");
            assert_eq!(format_countdown(59), "59m");
        }

        #[test]
        fn test_hours_and_minutes() {
            assert_eq!(format_countdown(60), "1h 0m");
            assert_eq!(format_countdown(105), "1h 45m");
            assert_eq!(format_countdown(340), "5h 40m");
        }
    }

    fn arb_time() -> impl Strategy<Value = PrayerTime> {
        (0u32..24, 0u32..60).prop_map(|(h, m)| PrayerTime::from_hm(h, m).unwrap())
    }

    proptest! {
        #[test]
        fn countdown_lands_on_next_prayer(
            fajr in arb_time(),
            dhuhr in arb_time(),
            asr in arb_time(),
            maghrib in arb_time(),
            isha in arb_time(),
            now_h in 0u32..24,
            now_m in 0u32..60,
        ) {
            let set = PrayerTimeSet { fajr, dhuhr, asr, maghrib, isha };
            let now = at(now_h, now_m);
            let status = evaluate(&set, now);

            prop_assert!(status.minutes_until_next >= 1);
            prop_assert!(status.minutes_until_next <= 24 * 60);

            let arrival = (now_h * 60 + now_m + status.minutes_until_next) % (24 * 60);
            prop_assert_eq!(arrival, status.next.time.minutes_of_day());
        }
    }
}
