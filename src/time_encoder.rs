use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

const SECONDS_PER_DAY: i64 = 86_400;

/// Offset between chrono's day count from 0001-01-01 (day 1) and the Julian day number.
const JULIAN_DAY_CE_OFFSET: i64 = 1_721_425;

/// Julian day number of a proleptic Gregorian calendar date.
pub fn julian_day_number(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce()) + JULIAN_DAY_CE_OFFSET
}

/// Fraction of the astronomical day elapsed at `time`; zero at local noon.
///
/// Seconds before noon wrap into the top of the range, so 11:59:59 yields
/// `86399 / 86400`.
pub fn noon_day_fraction(time: NaiveDateTime) -> f64 {
    let since_noon = (i64::from(time.hour()) - 12) * 3600
        + i64::from(time.minute()) * 60
        + i64::from(time.second());
    since_noon.rem_euclid(SECONDS_PER_DAY) as f64 / SECONDS_PER_DAY as f64
}

/// Record timestamp for a local wall-clock instant.
pub fn encode(time: NaiveDateTime) -> f64 {
    julian_day_number(time.date()) as f64 + noon_day_fraction(time)
}
