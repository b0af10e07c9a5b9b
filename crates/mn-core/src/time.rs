//! Wall-clock helpers.
//!
//! Event times are fractional Unix seconds. Snapshots and listings render
//! them as UTC ISO-8601 without pulling in a date crate.

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds per hour.
pub const HOUR_SECS: f64 = 3600.0;

const DAY_SECS: i64 = 86_400;

/// Current time as fractional Unix seconds. A clock set before 1970 reads 0.
pub fn now_unix_secs_f64() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Current time as whole Unix seconds (shell file names).
pub fn now_unix_secs() -> u64 {
    now_unix_secs_f64() as u64
}

pub fn now_iso8601() -> String {
    format_timestamp(now_unix_secs_f64())
}

/// Render an event timestamp as `YYYY-MM-DDTHH:MM:SSZ`, truncating to whole
/// seconds. Negative or non-finite input renders as the epoch.
pub fn format_timestamp(secs: f64) -> String {
    let whole = if secs.is_finite() && secs > 0.0 {
        secs.floor() as i64
    } else {
        0
    };
    let date = CivilDate::from_epoch_days(whole.div_euclid(DAY_SECS));
    let clock = whole.rem_euclid(DAY_SECS);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        date.year,
        date.month,
        date.day,
        clock / 3600,
        clock % 3600 / 60,
        clock % 60
    )
}

struct CivilDate {
    year: i64,
    month: i64,
    day: i64,
}

impl CivilDate {
    /// Proleptic Gregorian date for days since 1970-01-01, counted in
    /// 400-year eras of March-based years (Hinnant's days-to-civil).
    fn from_epoch_days(days: i64) -> Self {
        // Days since 0000-03-01.
        let shifted = days + 719_468;
        let era = shifted.div_euclid(146_097);
        let day_of_era = shifted.rem_euclid(146_097);
        let year_of_era =
            (day_of_era - day_of_era / 1_460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
        let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
        // 0 = March, 11 = February.
        let month_index = (5 * day_of_year + 2) / 153;
        let day = day_of_year - (153 * month_index + 2) / 5 + 1;
        let month = if month_index < 10 {
            month_index + 3
        } else {
            month_index - 9
        };
        let year = era * 400 + year_of_era + i64::from(month <= 2);
        Self { year, month, day }
    }
}
