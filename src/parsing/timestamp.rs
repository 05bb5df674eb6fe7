
use once_cell::sync::Lazy;
use regex::Regex;
use time::{Date, Month, PrimitiveDateTime, Time};

/// Resolves a date/time literal, as matched by the tokenizer's
/// sub-grammar, to seconds relative to the Unix epoch. Returns `None`
/// when the digits do not form a real calendar date or clock time.
///
/// Accepted shapes: `YYYY-MM-DD` with one- or two-digit month and
/// day, optionally followed by `T` or a single space and
/// `HH:MM[:SS[.fff]]`.
pub fn resolve_date_literal(literal: &str) -> Option<f64> {
  static RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T ](\d{1,2}):(\d{2})(?::(\d{2})(\.\d+)?)?)?$").unwrap()
  });
  let captures = RE.captures(literal)?;
  let year: i32 = captures.get(1)?.as_str().parse().ok()?;
  let month: u8 = captures.get(2)?.as_str().parse().ok()?;
  let day: u8 = captures.get(3)?.as_str().parse().ok()?;
  let hour: u8 = captures.get(4).map_or(Ok(0), |m| m.as_str().parse()).ok()?;
  let minute: u8 = captures.get(5).map_or(Ok(0), |m| m.as_str().parse()).ok()?;
  let second: u8 = captures.get(6).map_or(Ok(0), |m| m.as_str().parse()).ok()?;
  let fraction: f64 = captures.get(7).map_or(Ok(0.0), |m| m.as_str().parse()).ok()?;
  instant_seconds(year, month, day, hour, minute, second, fraction)
}

/// Reinterprets an integer in shift-origin position as a packed
/// `YYYYMMDD` date, as in `days since 20231225`. Only exact integers
/// with eight digits and a valid calendar reading qualify.
pub fn resolve_packed_date(value: f64) -> Option<f64> {
  if value.fract() != 0.0 || !(10_000_101.0..=99_991_231.0).contains(&value) {
    return None;
  }
  let packed = value as i64;
  let year = (packed / 10_000) as i32;
  let month = ((packed / 100) % 100) as u8;
  let day = (packed % 100) as u8;
  instant_seconds(year, month, day, 0, 0, 0, 0.0)
}

fn instant_seconds(
  year: i32,
  month: u8,
  day: u8,
  hour: u8,
  minute: u8,
  second: u8,
  fraction: f64,
) -> Option<f64> {
  let month = Month::try_from(month).ok()?;
  let date = Date::from_calendar_date(year, month, day).ok()?;
  let time = Time::from_hms(hour, minute, second).ok()?;
  let datetime = PrimitiveDateTime::new(date, time);
  Some(datetime.assume_utc().unix_timestamp() as f64 + fraction)
}
