//! ISO-8601 durations

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Months, NaiveDateTime, TimeDelta};
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// A string was not an ISO-8601 duration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid ISO-8601 duration: {0}")]
pub struct DurationParseError(pub String);

/// An ISO-8601 duration: calendar years and months plus an exact remainder
///
/// Years and months only have a fixed length when applied to a date, so
/// they are kept apart from the exact part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IsoDuration {
    years: u32,
    months: u32,
    delta: TimeDelta,
}

fn duration_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:[.,](\d+))?S)?)?$",
            )
            .ok()
        })
        .as_ref()
}

impl IsoDuration {
    pub fn new(years: u32, months: u32, delta: TimeDelta) -> Self {
        Self { years, months, delta }
    }

    /// An exact duration with no calendar part
    pub fn from_delta(delta: TimeDelta) -> Self {
        Self { years: 0, months: 0, delta }
    }

    pub fn years(&self) -> u32 {
        self.years
    }

    pub fn months(&self) -> u32 {
        self.months
    }

    /// The exact part below months
    pub fn delta(&self) -> TimeDelta {
        self.delta
    }

    pub fn is_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.delta.is_zero()
    }

    /// Fixed-length approximation: years are 365 days, months 30
    ///
    /// Saturates at `TimeDelta::MAX`.
    pub fn approximate(&self) -> TimeDelta {
        let calendar_days = 365 * i64::from(self.years) + 30 * i64::from(self.months);
        TimeDelta::try_days(calendar_days)
            .and_then(|days| days.checked_add(&self.delta))
            .unwrap_or(TimeDelta::MAX)
    }

    fn calendar_months(&self) -> Months {
        Months::new(self.years.saturating_mul(12).saturating_add(self.months))
    }

    /// `start + self` on the calendar
    pub fn after(&self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        start
            .checked_add_months(self.calendar_months())?
            .checked_add_signed(self.delta)
    }

    /// `end - self` on the calendar
    pub fn before(&self, end: NaiveDateTime) -> Option<NaiveDateTime> {
        end.checked_sub_months(self.calendar_months())?
            .checked_sub_signed(self.delta)
    }

    pub fn parse(text: &str) -> Result<Self, DurationParseError> {
        let invalid = || DurationParseError(text.to_string());
        let captures = duration_pattern()
            .and_then(|pattern| pattern.captures(text))
            .ok_or_else(invalid)?;

        // "P" and "PT" alone match the pattern but name no unit
        if captures.iter().skip(1).all(|group| group.is_none()) || text.ends_with('T') {
            return Err(invalid());
        }

        let number = |index: usize| -> Result<i64, DurationParseError> {
            captures
                .get(index)
                .map_or(Ok(0), |m| m.as_str().parse::<i64>().map_err(|_| invalid()))
        };
        let years = u32::try_from(number(1)?).map_err(|_| invalid())?;
        let months = u32::try_from(number(2)?).map_err(|_| invalid())?;
        let (weeks, days) = (number(3)?, number(4)?);
        let days = weeks
            .checked_mul(7)
            .and_then(|weeks| weeks.checked_add(days))
            .ok_or_else(invalid)?;
        let fraction = match captures.get(8) {
            Some(digits) => {
                let digits = digits.as_str();
                let padded = format!("{:0<9}", &digits[..digits.len().min(9)]);
                padded.parse::<i64>().map_err(|_| invalid())?
            }
            None => 0,
        };

        let delta = TimeDelta::try_days(days)
            .zip(TimeDelta::try_hours(number(5)?))
            .zip(TimeDelta::try_minutes(number(6)?))
            .zip(TimeDelta::try_seconds(number(7)?))
            .and_then(|(((d, h), m), s)| {
                d.checked_add(&h)?
                    .checked_add(&m)?
                    .checked_add(&s)?
                    .checked_add(&TimeDelta::nanoseconds(fraction))
            })
            .ok_or_else(invalid)?;

        Ok(Self { years, months, delta })
    }
}

impl From<TimeDelta> for IsoDuration {
    fn from(delta: TimeDelta) -> Self {
        Self::from_delta(delta)
    }
}

impl FromStr for IsoDuration {
    type Err = DurationParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl fmt::Display for IsoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("P0D");
        }
        f.write_str("P")?;
        if self.years > 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months > 0 {
            write!(f, "{}M", self.months)?;
        }

        let days = self.delta.num_days();
        if days > 0 {
            write!(f, "{}D", days)?;
        }
        let rest = self.delta - TimeDelta::days(days);
        let seconds = rest.num_seconds();
        let nanos = (rest - TimeDelta::seconds(seconds)).num_nanoseconds().unwrap_or(0);
        let (hours, minutes, seconds) = (seconds / 3600, seconds % 3600 / 60, seconds % 60);
        if hours == 0 && minutes == 0 && seconds == 0 && nanos == 0 {
            return Ok(());
        }

        f.write_str("T")?;
        if hours > 0 {
            write!(f, "{}H", hours)?;
        }
        if minutes > 0 {
            write!(f, "{}M", minutes)?;
        }
        if nanos > 0 {
            let fraction = format!("{:09}", nanos.rem_euclid(NANOS_PER_SECOND));
            write!(f, "{}.{}S", seconds, fraction.trim_end_matches('0'))?;
        } else if seconds > 0 {
            write!(f, "{}S", seconds)?;
        }
        Ok(())
    }
}

impl Serialize for IsoDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Duration given as separate units
///
/// Weeks and smaller units are exact; years and months stay calendar
/// units. Units are unsigned, so a duration can never be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationUnits {
    pub years: u32,
    pub months: u32,
    pub weeks: u64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub milliseconds: u64,
}

impl DurationUnits {
    pub fn days(days: u64) -> Self {
        Self { days, ..Default::default() }
    }

    pub fn hours(hours: u64) -> Self {
        Self { hours, ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fails when the exact part does not fit a `TimeDelta`
    pub fn to_duration(&self) -> Result<IsoDuration, DurationParseError> {
        let out_of_range = || DurationParseError(format!("{self:?} is out of range"));
        let unit = |value: u64, make: fn(i64) -> Option<TimeDelta>| {
            i64::try_from(value).ok().and_then(make)
        };

        let days = self
            .weeks
            .checked_mul(7)
            .and_then(|weeks| weeks.checked_add(self.days))
            .ok_or_else(out_of_range)?;
        let delta = unit(days, TimeDelta::try_days)
            .zip(unit(self.hours, TimeDelta::try_hours))
            .zip(unit(self.minutes, TimeDelta::try_minutes))
            .zip(unit(self.seconds, TimeDelta::try_seconds))
            .zip(unit(self.milliseconds, TimeDelta::try_milliseconds))
            .and_then(|((((d, h), m), s), ms)| {
                d.checked_add(&h)?
                    .checked_add(&m)?
                    .checked_add(&s)?
                    .checked_add(&ms)
            })
            .ok_or_else(out_of_range)?;
        Ok(IsoDuration::new(self.years, self.months, delta))
    }
}

impl TryFrom<DurationUnits> for IsoDuration {
    type Error = DurationParseError;

    fn try_from(units: DurationUnits) -> Result<Self, Self::Error> {
        units.to_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        for text in ["P7D", "P2Y", "P5Y3M25D", "PT1H", "PT15M", "P1DT12H", "PT13.987S", "P1M"] {
            assert_eq!(IsoDuration::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_weeks_become_days() {
        assert_eq!(IsoDuration::parse("P1W").unwrap().to_string(), "P7D");
    }

    #[test]
    fn test_invalid_durations() {
        for text in ["P2Z", "P", "PT", "7D", "P1DT", ""] {
            assert!(IsoDuration::parse(text).is_err(), "{text} should not parse");
        }
    }

    #[test]
    fn test_zero_formats_as_zero_days() {
        assert_eq!(IsoDuration::default().to_string(), "P0D");
    }

    #[test]
    fn test_oversized_durations_fail() {
        for text in [
            "P9223372036854775807W",
            "P100000000000DT2562047788015H",
            "PT9223372036854775807S",
            "P99999999999999999999D",
            "P4294967296Y",
        ] {
            assert!(IsoDuration::parse(text).is_err(), "{text} should not parse");
        }
    }

    #[test]
    fn test_units() {
        let units = DurationUnits { years: 5, months: 3, days: 25, ..Default::default() };
        assert_eq!(units.to_duration().unwrap().to_string(), "P5Y3M25D");
        let week = DurationUnits { weeks: 1, ..Default::default() };
        assert_eq!(week.to_duration().unwrap().to_string(), "P7D");
        let millis = DurationUnits { seconds: 13, milliseconds: 987, ..Default::default() };
        assert_eq!(millis.to_duration().unwrap().to_string(), "PT13.987S");
    }

    #[test]
    fn test_oversized_units_fail() {
        assert!(DurationUnits::days(u64::MAX).to_duration().is_err());
        assert!(DurationUnits::days(i64::MAX as u64).to_duration().is_err());
        let weeks = DurationUnits { weeks: u64::MAX / 2, ..Default::default() };
        assert!(weeks.to_duration().is_err());
        let sum = DurationUnits { days: 100_000_000_000, hours: 2_562_047_788_015, ..Default::default() };
        assert!(sum.to_duration().is_err());
        assert!(IsoDuration::try_from(DurationUnits::hours(6)).is_ok());
    }

    #[test]
    fn test_approximate_saturates() {
        let huge = IsoDuration::new(u32::MAX, 0, TimeDelta::MAX);
        assert_eq!(huge.approximate(), TimeDelta::MAX);
    }

    #[test]
    fn test_approximate_and_calendar() {
        let duration = IsoDuration::parse("P1Y1M1D").unwrap();
        assert_eq!(duration.approximate(), TimeDelta::days(396));

        let start = chrono::NaiveDate::from_ymd_opt(2020, 1, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let one_month = IsoDuration::parse("P1M").unwrap();
        assert_eq!(one_month.after(start).unwrap().to_string(), "2020-02-29 00:00:00");
    }
}
