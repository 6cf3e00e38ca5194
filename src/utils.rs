use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{MseedError, Result};

/// 将秒数转换为chrono时长（纳秒精度）
pub fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::nanoseconds((seconds * 1e9).round() as i64)
}

/// Signed number of seconds from `earlier` to `later`
pub fn seconds_between(earlier: &NaiveDateTime, later: &NaiveDateTime) -> f64 {
    let delta = later.signed_duration_since(*earlier);
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        // 超出i64纳秒范围时退回到毫秒精度
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

/// Nominal sample rate from the SEED factor/multiplier pair
pub fn nominal_sample_rate(factor: i16, multiplier: i16) -> f64 {
    let f = factor as f64;
    let m = multiplier as f64;
    match (factor, multiplier) {
        (f0, m0) if f0 > 0 && m0 > 0 => f * m,
        (f0, m0) if f0 > 0 && m0 < 0 => -f / m,
        (f0, m0) if f0 < 0 && m0 > 0 => -m / f,
        (f0, m0) if f0 < 0 && m0 < 0 => 1.0 / (f * m),
        _ => 0.0,
    }
}

/// Converts the fields of a SEED BTIME to a timestamp
///
/// `fract` is in units of 0.0001 s. A second value of 60 (leap second)
/// rolls over into the next minute.
pub fn btime_to_datetime(
    year: u16,
    day_of_year: u16,
    hour: u8,
    minute: u8,
    second: u8,
    fract: u16,
) -> Result<NaiveDateTime> {
    let date = NaiveDate::from_yo_opt(year as i32, day_of_year as u32).ok_or_else(|| {
        MseedError::InvalidTime(format!("year {} day {}", year, day_of_year))
    })?;
    let base = date
        .and_hms_opt(hour as u32, minute as u32, 0)
        .ok_or_else(|| MseedError::InvalidTime(format!("{:02}:{:02}", hour, minute)))?;
    Ok(base + Duration::seconds(second as i64) + Duration::microseconds(fract as i64 * 100))
}

/// Splits a timestamp into BTIME fields, truncating to 0.0001 s
pub fn datetime_to_btime(t: &NaiveDateTime) -> (u16, u16, u8, u8, u8, u16) {
    (
        t.year() as u16,
        t.ordinal() as u16,
        t.hour() as u8,
        t.minute() as u8,
        t.second() as u8,
        (t.nanosecond() / 100_000) as u16,
    )
}

/// ISO-8601 rendering with microseconds, `2015-01-03T00:00:00.000000Z`
pub fn format_timestamp(t: &NaiveDateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Plural suffix for a count: empty for exactly one, "s" otherwise
pub fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Sign-extends the low `bits` bits of `value`
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominal_sample_rate() {
        assert_eq!(nominal_sample_rate(100, 1), 100.0);
        assert_eq!(nominal_sample_rate(1, -10), 0.1);
        assert_eq!(nominal_sample_rate(-10, 1), 0.1);
        assert_eq!(nominal_sample_rate(-10, -10), 0.01);
        assert_eq!(nominal_sample_rate(0, 1), 0.0);
    }

    #[test]
    fn test_btime_round_trip_fields() {
        let t = btime_to_datetime(2015, 3, 12, 30, 15, 2500).unwrap();
        assert_eq!(t.to_string(), "2015-01-03 12:30:15.250");
        assert_eq!(datetime_to_btime(&t), (2015, 3, 12, 30, 15, 2500));
    }

    #[test]
    fn test_btime_leap_second_rolls_over() {
        let t = btime_to_datetime(2016, 366, 23, 59, 60, 0).unwrap();
        assert_eq!(t.to_string(), "2017-01-01 00:00:00");
    }

    #[test]
    fn test_btime_rejects_bad_day() {
        assert!(btime_to_datetime(2015, 366, 0, 0, 0, 0).is_err());
        assert!(btime_to_datetime(2015, 0, 0, 0, 0, 0).is_err());
    }

    #[test]
    fn test_seconds_between() {
        let a = btime_to_datetime(2015, 3, 0, 0, 10, 0).unwrap();
        let b = btime_to_datetime(2015, 3, 0, 0, 11, 500).unwrap();
        assert!((seconds_between(&a, &b) - 1.05).abs() < 1e-9);
        assert!((seconds_between(&b, &a) + 1.05).abs() < 1e-9);
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(0), "s");
        assert_eq!(plural(1), "");
        assert_eq!(plural(2), "s");
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0xff, 8), -1);
        assert_eq!(sign_extend(0x7f, 8), 127);
        assert_eq!(sign_extend(0x20, 6), -32);
        assert_eq!(sign_extend(0x3fff_ffff, 30), -1);
    }
}
