//! Wall clock and calendar-day boundaries in a fixed UTC offset
//! (no chrono dependency).
//!
//! The scheduling core never reads the clock; these helpers produce the
//! `now` and end-of-day values it is given.

use std::time::{SystemTime, UNIX_EPOCH};

use recall_core::{MS_PER_DAY, Timestamp};

const MS_PER_HOUR: i64 = 3_600_000;

/// Current UTC time as epoch milliseconds.
pub fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Last millisecond of the local calendar day containing `now`.
pub fn end_of_day(now: Timestamp, utc_offset_hours: i32) -> Timestamp {
    let offset = i64::from(utc_offset_hours) * MS_PER_HOUR;
    let local_day_start = (now + offset).div_euclid(MS_PER_DAY) * MS_PER_DAY;
    local_day_start + MS_PER_DAY - 1 - offset
}

/// Render `ts` as local ISO-8601 with the offset, e.g. `2026-01-01T09:00:00+09:00`.
pub fn format_timestamp(ts: Timestamp, utc_offset_hours: i32) -> String {
    let local_secs = (ts + i64::from(utc_offset_hours) * MS_PER_HOUR).div_euclid(1000);
    let days = local_secs.div_euclid(86_400);
    let time_of_day = local_secs.rem_euclid(86_400);
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let (y, m, d) = civil_from_days(days);
    let sign = if utc_offset_hours < 0 { '-' } else { '+' };
    let off = utc_offset_hours.unsigned_abs();
    format!("{y:04}-{m:02}-{d:02}T{hours:02}:{minutes:02}:{seconds:02}{sign}{off:02}:00")
}

/// Howard Hinnant's civil_from_days: Unix epoch days → (year, month, day).
fn civil_from_days(days: i64) -> (i64, u64, u64) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}
