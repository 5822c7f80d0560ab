//! Local-calendar-day to UTC instant-range resolution.
//!
//! Providers report data bucketed by the user's local day; intraday
//! fetches and storage need UTC instants. [`resolve`] converts a local
//! date plus an IANA zone name into the `[start, end)` UTC window for
//! that day, clamping the end to "now" while the day is still in
//! progress.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::types::Timestamp;

/// Zone used when the provider-reported timezone is absent or invalid.
pub const DEFAULT_TZ: Tz = chrono_tz::UTC;

/// The resolved UTC window for one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayWindow {
    /// Local midnight at the start of the day, as a UTC instant.
    pub start_utc: Timestamp,
    /// Local midnight at the end of the day (exclusive), clamped to `now`
    /// when the day is still in progress in its zone.
    pub end_utc: Timestamp,
    /// The zone actually used for the conversion.
    pub tz: Tz,
    /// True when the requested zone name was missing or unparseable and
    /// [`DEFAULT_TZ`] was substituted. Callers log this.
    pub tz_fallback: bool,
}

/// Compute the `[start, end)` UTC range covering `date_local` in `tz_name`.
///
/// `now` is injected so the clamp is deterministic under test. An unknown
/// or absent zone falls back to [`DEFAULT_TZ`]; the fallback is marked on
/// the returned window rather than silently absorbed.
pub fn resolve(date_local: NaiveDate, tz_name: Option<&str>, now: Timestamp) -> DayWindow {
    let (tz, tz_fallback) = match tz_name {
        Some(name) => match name.parse::<Tz>() {
            Ok(tz) => (tz, false),
            Err(_) => (DEFAULT_TZ, true),
        },
        None => (DEFAULT_TZ, true),
    };

    let start_utc = local_midnight_utc(date_local, tz);
    let next_midnight = local_midnight_utc(date_local + Duration::days(1), tz);

    // Clamp to now only while the day is in progress in its own zone.
    let end_utc = if now.with_timezone(&tz).date_naive() == date_local {
        next_midnight.min(now)
    } else {
        next_midnight
    };

    DayWindow {
        start_utc,
        end_utc,
        tz,
        tz_fallback,
    }
}

/// UTC instant of local midnight on `date` in `tz`.
///
/// A midnight that falls inside a DST gap resolves to the first valid
/// instant after it; an ambiguous midnight (fold) takes the earlier
/// occurrence.
fn local_midnight_utc(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).expect("midnight is a valid time");
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        LocalResult::None => {
            // DST gap: probe forward in 15-minute steps for the first
            // representable local time on this date.
            let mut probe = naive;
            loop {
                probe += Duration::minutes(15);
                if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
                    return dt.with_timezone(&Utc);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn utc_day_is_midnight_to_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let w = resolve(date(2024, 6, 3), Some("UTC"), now);
        assert_eq!(w.start_utc, Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap());
        assert_eq!(w.end_utc, Utc.with_ymd_and_hms(2024, 6, 4, 0, 0, 0).unwrap());
        assert!(!w.tz_fallback);
    }

    #[test]
    fn zone_offset_shifts_window() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        // New York in June is UTC-4.
        let w = resolve(date(2024, 6, 3), Some("America/New_York"), now);
        assert_eq!(w.start_utc, Utc.with_ymd_and_hms(2024, 6, 3, 4, 0, 0).unwrap());
        assert_eq!(w.end_utc, Utc.with_ymd_and_hms(2024, 6, 4, 4, 0, 0).unwrap());
    }

    #[test]
    fn current_day_end_clamps_to_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 10, 30, 0).unwrap();
        let w = resolve(date(2024, 6, 3), Some("UTC"), now);
        assert_eq!(w.end_utc, now);
    }

    #[test]
    fn past_day_is_not_clamped() {
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 10, 30, 0).unwrap();
        let w = resolve(date(2024, 6, 2), Some("UTC"), now);
        assert_eq!(w.end_utc, Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn invalid_zone_falls_back_to_default() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let w = resolve(date(2024, 6, 3), Some("Mars/Olympus_Mons"), now);
        assert!(w.tz_fallback);
        assert_eq!(w.tz, DEFAULT_TZ);
        assert_eq!(w.start_utc, Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn missing_zone_falls_back_to_default() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let w = resolve(date(2024, 6, 3), None, now);
        assert!(w.tz_fallback);
    }

    #[test]
    fn dst_gap_midnight_resolves_forward() {
        // Santiago springs forward at 2023-09-03 00:00 -> 01:00; local
        // midnight does not exist on that date.
        let now = Utc.with_ymd_and_hms(2023, 9, 10, 12, 0, 0).unwrap();
        let w = resolve(date(2023, 9, 3), Some("America/Santiago"), now);
        assert_eq!(w.start_utc, Utc.with_ymd_and_hms(2023, 9, 3, 4, 0, 0).unwrap());
    }
}
