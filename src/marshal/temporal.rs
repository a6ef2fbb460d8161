//! Epoch arithmetic between host ticks and native milliseconds.
//!
//! Host ticks count 100 ns intervals since 0001-01-01T00:00:00; native values count
//! milliseconds since 1970-01-01T00:00:00. Both sides are treated as the same wall
//! clock; timezone normalization is left to the caller.

use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, Timelike};

use crate::error::Db2Error;
use crate::native::{NativeDate, NativeTime, NativeTimestamp};

/// Milliseconds between 0001-01-01 and 1970-01-01.
pub const JAVA_EPOCH_OFFSET_MILLIS: i64 = 62_135_596_800_000;
pub const TICKS_PER_MILLISECOND: i64 = 10_000;
const TICKS_PER_SECOND: i64 = 10_000_000;
const EPOCH_OFFSET_SECONDS: i64 = JAVA_EPOCH_OFFSET_MILLIS / 1000;

/// Host ticks for a timestamp.
///
/// # Errors
///
/// Returns `Db2Error::ConversionError` for years outside 1..=9999, where the tick count
/// is negative or past the host calendar.
pub fn host_ticks(value: NaiveDateTime) -> Result<i64, Db2Error> {
    if !(1..=9999).contains(&value.year()) {
        return Err(out_of_range(value));
    }
    let utc = value.and_utc();
    utc.timestamp()
        .checked_add(EPOCH_OFFSET_SECONDS)
        .and_then(|s| s.checked_mul(TICKS_PER_SECOND))
        .and_then(|t| t.checked_add(i64::from(utc.timestamp_subsec_nanos() / 100)))
        .ok_or_else(|| out_of_range(value))
}

fn out_of_range(value: NaiveDateTime) -> Db2Error {
    Db2Error::ConversionError(format!("{value} is outside the 0001-9999 timestamp range"))
}

/// Timestamp for a host tick count.
///
/// # Errors
///
/// Returns `Db2Error::ConversionError` if the ticks fall outside the representable calendar.
pub fn from_host_ticks(ticks: i64) -> Result<NaiveDateTime, Db2Error> {
    let seconds = ticks.div_euclid(TICKS_PER_SECOND) - EPOCH_OFFSET_SECONDS;
    // rem_euclid keeps the sub-second part in 0..TICKS_PER_SECOND
    let nanos = (ticks.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    DateTime::from_timestamp(seconds, nanos)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| Db2Error::ConversionError(format!("{ticks} ticks is not a valid timestamp")))
}

/// Host timestamp to native seconds + nanos; precision is cut to whole milliseconds.
///
/// # Errors
///
/// Returns `Db2Error::ConversionError` when the timestamp has no host tick count.
pub fn to_native_timestamp(value: NaiveDateTime) -> Result<NativeTimestamp, Db2Error> {
    let millis = host_ticks(value)? / TICKS_PER_MILLISECOND - JAVA_EPOCH_OFFSET_MILLIS;
    Ok(NativeTimestamp {
        seconds: millis.div_euclid(1000),
        nanos: (millis.rem_euclid(1000) * 1_000_000) as u32,
    })
}

/// Native milliseconds since 1970 back to a host timestamp.
///
/// # Errors
///
/// Returns `Db2Error::ConversionError` if the value overflows the host range.
pub fn from_native_millis(millis: i64) -> Result<NaiveDateTime, Db2Error> {
    let ticks = millis
        .checked_add(JAVA_EPOCH_OFFSET_MILLIS)
        .and_then(|m| m.checked_mul(TICKS_PER_MILLISECOND))
        .ok_or_else(|| Db2Error::ConversionError(format!("{millis} ms is out of range")))?;
    from_host_ticks(ticks)
}

/// # Errors
///
/// Returns `Db2Error::ConversionError` if the value overflows the host range.
pub fn from_native_timestamp(value: NativeTimestamp) -> Result<NaiveDateTime, Db2Error> {
    let millis = value.millis().ok_or_else(|| {
        Db2Error::ConversionError(format!("{}s {}ns is out of range", value.seconds, value.nanos))
    })?;
    from_native_millis(millis)
}

/// # Errors
///
/// Returns `Db2Error::ConversionError` if the value overflows the host range.
pub fn from_native_date(value: NativeDate) -> Result<NaiveDateTime, Db2Error> {
    from_native_millis(value.millis)
}

/// Time of day to the native time; sub-second precision is dropped.
#[must_use]
pub fn to_native_time(value: NaiveTime) -> NativeTime {
    NativeTime {
        hour: value.hour(),
        minute: value.minute(),
        second: value.second(),
    }
}

/// # Errors
///
/// Returns `Db2Error::ConversionError` for an impossible hour/minute/second triple.
pub fn from_native_time(value: NativeTime) -> Result<NaiveTime, Db2Error> {
    NaiveTime::from_hms_opt(value.hour, value.minute, value.second).ok_or_else(|| {
        Db2Error::ConversionError(format!(
            "{:02}:{:02}:{:02} is not a valid time of day",
            value.hour, value.minute, value.second
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_milli_opt(h, mi, s, ms)
            .unwrap()
    }

    fn round_trip(value: NaiveDateTime) -> NaiveDateTime {
        from_native_timestamp(to_native_timestamp(value).unwrap()).unwrap()
    }

    #[test]
    fn unix_epoch_is_zero_millis() {
        let ts = to_native_timestamp(at(1970, 1, 1, 0, 0, 0, 0)).unwrap();
        assert_eq!(ts, NativeTimestamp { seconds: 0, nanos: 0 });
        assert_eq!(host_ticks(at(1970, 1, 1, 0, 0, 0, 0)).unwrap(), 621_355_968_000_000_000);
    }

    #[test]
    fn round_trips_before_and_after_epoch() {
        for value in [
            at(1933, 9, 30, 0, 0, 0, 0),
            at(1969, 12, 31, 23, 59, 59, 999),
            at(2016, 6, 20, 16, 49, 5, 57),
        ] {
            assert_eq!(round_trip(value), value);
        }
    }

    #[test]
    fn pre_epoch_nanos_stay_non_negative() {
        let ts = to_native_timestamp(at(1969, 12, 31, 23, 59, 59, 750)).unwrap();
        assert_eq!(ts.seconds, -1);
        assert_eq!(ts.nanos, 750_000_000);
    }

    #[test]
    fn round_trips_calendar_limits() {
        let min = at(1, 1, 1, 0, 0, 0, 0);
        let max = at(9999, 12, 31, 23, 59, 59, 999);
        assert_eq!(host_ticks(min).unwrap(), 0);
        assert_eq!(round_trip(min), min);
        assert_eq!(round_trip(max), max);
    }

    #[test]
    fn years_past_the_calendar_are_conversion_errors() {
        for year in [0, 10_000, 40_000, -40_000] {
            let value = NaiveDate::from_ymd_opt(year, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
            assert!(matches!(host_ticks(value), Err(Db2Error::ConversionError(_))), "year {year}");
            assert!(matches!(to_native_timestamp(value), Err(Db2Error::ConversionError(_))), "year {year}");
        }
    }

    #[test]
    fn huge_native_seconds_are_conversion_errors() {
        for seconds in [i64::MAX, i64::MIN, i64::MAX / 1000 + 1] {
            let ts = NativeTimestamp { seconds, nanos: 999_000_000 };
            assert!(matches!(from_native_timestamp(ts), Err(Db2Error::ConversionError(_))), "{seconds}");
        }
    }

    #[test]
    fn truncates_below_millisecond() {
        let precise = NaiveDate::from_ymd_opt(2020, 2, 29)
            .unwrap()
            .and_hms_nano_opt(10, 0, 0, 123_456_789)
            .unwrap();
        assert_eq!(round_trip(precise), at(2020, 2, 29, 10, 0, 0, 123));
    }

    #[test]
    fn native_date_reads_as_midnight() {
        let millis = to_native_timestamp(at(2001, 5, 7, 0, 0, 0, 0)).unwrap().millis().unwrap();
        let value = from_native_date(NativeDate { millis }).unwrap();
        assert_eq!(value, at(2001, 5, 7, 0, 0, 0, 0));
    }

    #[test]
    fn time_of_day_drops_fraction() {
        let t = NaiveTime::from_hms_milli_opt(13, 45, 30, 999).unwrap();
        let native = to_native_time(t);
        assert_eq!(from_native_time(native).unwrap(), NaiveTime::from_hms_opt(13, 45, 30).unwrap());
        assert!(from_native_time(NativeTime { hour: 25, minute: 0, second: 0 }).is_err());
    }
}
