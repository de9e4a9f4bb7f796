//! ISO-8601 intervals

use std::fmt;

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta,
    Timelike, Utc,
};
use serde::{Deserialize, Serialize};

use super::duration::{DurationUnits, IsoDuration};
use crate::record::SchemaError;

const FAMILY: &str = "interval";

fn invalid(text: &str, message: impl Into<String>) -> SchemaError {
    SchemaError::invalid_value(FAMILY, text, "interval", message)
}

/// A timestamp as written in an interval, with its offset if it had one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    pub local: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl Stamp {
    /// The instant on the UTC timeline; offset-less stamps are taken as UTC
    pub fn utc(&self) -> NaiveDateTime {
        match self.offset {
            Some(offset) => self.local - TimeDelta::seconds(i64::from(offset.local_minus_utc())),
            None => self.local,
        }
    }

    fn with_local(&self, local: NaiveDateTime) -> Self {
        Self { local, offset: self.offset }
    }

    fn render(&self) -> String {
        match self.offset.and_then(|offset| self.local.and_local_timezone(offset).single()) {
            Some(zoned) => zoned.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            None => render_naive(self.local),
        }
    }
}

fn render_naive(local: NaiveDateTime) -> String {
    local.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Parse an ISO-8601 date or datetime
pub fn parse_timestamp(text: &str) -> Option<Stamp> {
    if let Ok(zoned) = DateTime::parse_from_rfc3339(text) {
        return Some(Stamp { local: zoned.naive_local(), offset: Some(*zoned.offset()) });
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(local) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Stamp { local, offset: None });
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| Stamp { local: date.and_time(NaiveTime::MIN), offset: None })
}

enum Part {
    Duration(IsoDuration),
    Stamp(Stamp),
}

fn parse_part(text: &str) -> Option<Part> {
    if let Ok(duration) = IsoDuration::parse(text) {
        return Some(Part::Duration(duration));
    }
    parse_timestamp(text).map(Part::Stamp)
}

/// Start and end of an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub start: Stamp,
    pub end: Stamp,
}

impl Bounds {
    pub fn duration(&self) -> TimeDelta {
        self.end.utc() - self.start.utc()
    }
}

/// An ISO-8601 interval string, always parseable as one
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Interval(String);

impl Interval {
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        let interval = Self(text.to_string());
        interval.bounds()?;
        Ok(interval)
    }

    pub fn builder() -> IntervalBuilder {
        IntervalBuilder::default()
    }

    pub fn between(
        start: impl Into<IntervalPoint>,
        end: impl Into<IntervalPoint>,
    ) -> Result<Self, SchemaError> {
        Self::builder().start(start).end(end).build()
    }

    pub fn starting(
        start: impl Into<IntervalPoint>,
        duration: impl Into<IsoDuration>,
    ) -> Result<Self, SchemaError> {
        Self::builder().start(start).duration(duration).build()
    }

    pub fn ending(
        duration: impl Into<IsoDuration>,
        end: impl Into<IntervalPoint>,
    ) -> Result<Self, SchemaError> {
        Self::builder().duration(duration).end(end).build()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve both ends, applying a duration on the calendar
    pub fn bounds(&self) -> Result<Bounds, SchemaError> {
        let text = self.0.as_str();
        let (left, right) = text
            .split_once('/')
            .filter(|(_, right)| !right.contains('/'))
            .ok_or_else(|| invalid(text, "expected two parts separated by '/'"))?;
        let left = parse_part(left).ok_or_else(|| invalid(text, format!("cannot parse {left}")))?;
        let right =
            parse_part(right).ok_or_else(|| invalid(text, format!("cannot parse {right}")))?;
        let out_of_range = || invalid(text, "duration is out of range");

        match (left, right) {
            (Part::Duration(duration), Part::Stamp(end)) => {
                let start = duration.before(end.local).ok_or_else(out_of_range)?;
                Ok(Bounds { start: end.with_local(start), end })
            }
            (Part::Stamp(start), Part::Duration(duration)) => {
                let end = duration.after(start.local).ok_or_else(out_of_range)?;
                Ok(Bounds { start, end: start.with_local(end) })
            }
            (Part::Stamp(start), Part::Stamp(end)) => Ok(Bounds { start, end }),
            (Part::Duration(_), Part::Duration(_)) => {
                Err(invalid(text, "an interval needs at least one timestamp"))
            }
        }
    }

    pub fn duration(&self) -> Result<TimeDelta, SchemaError> {
        Ok(self.bounds()?.duration())
    }

    /// True if both intervals cover the same span, however written
    pub fn equivalent(&self, other: &Interval) -> bool {
        match (self.bounds(), other.bounds()) {
            (Ok(a), Ok(b)) => a.start.utc() == b.start.utc() && a.end.utc() == b.end.utc(),
            _ => false,
        }
    }

    /// Widen to bucket boundaries of `width`
    ///
    /// The start is floored and the end ceiled to the largest whole unit
    /// (day, hour, minute, second) in `width`. Widths under a second
    /// leave the interval unchanged.
    pub fn pad(&self, width: TimeDelta) -> Result<Self, SchemaError> {
        let Some(unit) = PadUnit::of(width) else {
            return Ok(self.clone());
        };
        let bounds = self.bounds()?;
        let start = bounds.start.with_local(unit.floor(bounds.start.local));
        let end = bounds.end.with_local(unit.ceil(bounds.end.local));
        Ok(Self(format!("{}/{}", start.render(), end.render())))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Interval {
    type Error = SchemaError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::parse(&text)
    }
}

impl From<Interval> for String {
    fn from(interval: Interval) -> Self {
        interval.0
    }
}

impl PartialEq<&str> for Interval {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Debug, Clone, Copy)]
enum PadUnit {
    Day,
    Hour,
    Minute,
    Second,
}

impl PadUnit {
    fn of(width: TimeDelta) -> Option<Self> {
        [PadUnit::Day, PadUnit::Hour, PadUnit::Minute, PadUnit::Second]
            .into_iter()
            .find(|unit| width >= unit.delta())
    }

    fn delta(&self) -> TimeDelta {
        match self {
            PadUnit::Day => TimeDelta::days(1),
            PadUnit::Hour => TimeDelta::hours(1),
            PadUnit::Minute => TimeDelta::minutes(1),
            PadUnit::Second => TimeDelta::seconds(1),
        }
    }

    fn floor(&self, local: NaiveDateTime) -> NaiveDateTime {
        let (hour, minute, second) = (local.hour(), local.minute(), local.second());
        let time = match self {
            PadUnit::Day => Some(NaiveTime::MIN),
            PadUnit::Hour => NaiveTime::from_hms_opt(hour, 0, 0),
            PadUnit::Minute => NaiveTime::from_hms_opt(hour, minute, 0),
            PadUnit::Second => NaiveTime::from_hms_opt(hour, minute, second),
        };
        time.map_or(local, |time| local.date().and_time(time))
    }

    fn ceil(&self, local: NaiveDateTime) -> NaiveDateTime {
        let floored = self.floor(local);
        if floored == local {
            local
        } else {
            floored + self.delta()
        }
    }
}

/// A point accepted when building an interval
#[derive(Debug, Clone, PartialEq)]
pub enum IntervalPoint {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
    /// Used verbatim
    Text(String),
}

impl IntervalPoint {
    fn render(&self) -> String {
        match self {
            IntervalPoint::Date(date) => date.format("%Y-%m-%d").to_string(),
            IntervalPoint::DateTime(local) => render_naive(*local),
            IntervalPoint::Zoned(zoned) => zoned.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            IntervalPoint::Text(text) => text.clone(),
        }
    }
}

impl From<NaiveDate> for IntervalPoint {
    fn from(date: NaiveDate) -> Self {
        IntervalPoint::Date(date)
    }
}

impl From<NaiveDateTime> for IntervalPoint {
    fn from(local: NaiveDateTime) -> Self {
        IntervalPoint::DateTime(local)
    }
}

impl From<DateTime<FixedOffset>> for IntervalPoint {
    fn from(zoned: DateTime<FixedOffset>) -> Self {
        IntervalPoint::Zoned(zoned)
    }
}

impl From<DateTime<Utc>> for IntervalPoint {
    fn from(zoned: DateTime<Utc>) -> Self {
        IntervalPoint::Zoned(zoned.fixed_offset())
    }
}

impl From<&str> for IntervalPoint {
    fn from(text: &str) -> Self {
        IntervalPoint::Text(text.to_string())
    }
}

impl From<String> for IntervalPoint {
    fn from(text: String) -> Self {
        IntervalPoint::Text(text)
    }
}

/// Builds an interval from any supported combination of parts
///
/// With a start or a duration the interval is two-part: start/end,
/// start/duration or duration/end, in that order of preference. A lone
/// start or duration is closed by "now". Otherwise an explicit interval
/// string is used.
#[derive(Debug, Clone, Default)]
pub struct IntervalBuilder {
    interval: Option<String>,
    start: Option<IntervalPoint>,
    end: Option<IntervalPoint>,
    duration: Option<IsoDuration>,
    units: DurationUnits,
}

impl IntervalBuilder {
    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(interval.into());
        self
    }

    pub fn start(mut self, start: impl Into<IntervalPoint>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn end(mut self, end: impl Into<IntervalPoint>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn duration(mut self, duration: impl Into<IsoDuration>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    /// Duration given as units; an explicit `duration` takes precedence
    pub fn units(mut self, units: DurationUnits) -> Self {
        self.units = units;
        self
    }

    pub fn build(self) -> Result<Interval, SchemaError> {
        self.build_at(Local::now().naive_local())
    }

    /// Build, closing open-ended intervals at `now`
    pub fn build_at(self, now: NaiveDateTime) -> Result<Interval, SchemaError> {
        let duration = match self.duration {
            Some(duration) => Some(duration),
            None if !self.units.is_empty() => Some(
                self.units
                    .to_duration()
                    .map_err(|e| invalid("", e.to_string()))?,
            ),
            None => None,
        };
        let now = IntervalPoint::DateTime(now);

        let text = match (&self.start, &self.end, duration) {
            (Some(start), Some(end), _) => format!("{}/{}", start.render(), end.render()),
            (Some(start), None, Some(duration)) => format!("{}/{}", start.render(), duration),
            (None, Some(end), Some(duration)) => format!("{}/{}", duration, end.render()),
            (Some(start), None, None) => format!("{}/{}", start.render(), now.render()),
            (None, None, Some(duration)) => format!("{}/{}", duration, now.render()),
            (None, _, None) => match self.interval {
                Some(interval) => interval,
                None => {
                    return Err(invalid(
                        "",
                        format!(
                            "Invalid interval arguments: start={:?}, end={:?}, duration=None",
                            self.start, self.end
                        ),
                    ))
                }
            },
        };
        Interval::parse(&text)
    }
}

/// One interval or several, as queries accept either
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Intervals {
    One(Interval),
    Many(Vec<Interval>),
}

impl Intervals {
    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        match self {
            Intervals::One(interval) => std::slice::from_ref(interval).iter(),
            Intervals::Many(intervals) => intervals.iter(),
        }
    }

    /// Pad every interval, keeping the one-or-many shape
    pub fn pad(&self, width: TimeDelta) -> Result<Self, SchemaError> {
        match self {
            Intervals::One(interval) => Ok(Intervals::One(interval.pad(width)?)),
            Intervals::Many(intervals) => intervals
                .iter()
                .map(|interval| interval.pad(width))
                .collect::<Result<Vec<_>, _>>()
                .map(Intervals::Many),
        }
    }
}

impl From<Interval> for Intervals {
    fn from(interval: Interval) -> Self {
        Intervals::One(interval)
    }
}

impl From<Vec<Interval>> for Intervals {
    fn from(intervals: Vec<Interval>) -> Self {
        Intervals::Many(intervals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn test_start_and_end_dates() {
        let start = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(1970, 1, 8).unwrap();
        assert_eq!(Interval::between(start, end).unwrap(), "1970-01-01/1970-01-08");
    }

    #[test]
    fn test_lone_duration_closes_at_now() {
        let interval = Interval::builder()
            .units(DurationUnits { weeks: 1, ..Default::default() })
            .build_at(at("1970-01-01T00:00:00"))
            .unwrap();
        assert_eq!(interval, "P7D/1970-01-01T00:00:00");
    }

    #[test]
    fn test_units_before_end() {
        let interval = Interval::builder()
            .units(DurationUnits { years: 5, months: 3, days: 25, ..Default::default() })
            .end(at("2014-09-27T00:00:00"))
            .build()
            .unwrap();
        assert_eq!(interval, "P5Y3M25D/2014-09-27T00:00:00");
    }

    #[test]
    fn test_explicit_string_and_missing_arguments() {
        let interval = Interval::builder().interval("2014-09-27/P1D").build().unwrap();
        assert_eq!(interval.as_str(), "2014-09-27/P1D");
        assert!(Interval::builder().build().is_err());
        assert!(Interval::parse("not an interval").is_err());
        assert!(Interval::parse("P1D/P2D").is_err());
    }

    #[test]
    fn test_bounds_apply_durations() {
        let bounds = Interval::parse("P20D/2017-02-03").unwrap().bounds().unwrap();
        assert_eq!(bounds.start.local, at("2017-01-14T00:00:00"));
        assert_eq!(bounds.duration(), TimeDelta::days(20));
    }

    #[test]
    fn test_zoned_stamps() {
        let interval = Interval::parse("2014-09-27T00:00:00Z/2014-09-27T02:00:00+01:00").unwrap();
        assert_eq!(interval.duration().unwrap(), TimeDelta::hours(1));
    }

    #[test]
    fn test_pad() {
        let interval = Interval::between(at("2014-09-27T16:22:47"), at("2014-09-30T08:17:02")).unwrap();
        assert_eq!(
            interval.pad(TimeDelta::days(12)).unwrap(),
            "2014-09-27T00:00:00/2014-10-01T00:00:00"
        );
        assert_eq!(
            interval.pad(TimeDelta::hours(12)).unwrap(),
            "2014-09-27T16:00:00/2014-09-30T09:00:00"
        );
        assert_eq!(
            interval.pad(TimeDelta::minutes(12)).unwrap(),
            "2014-09-27T16:22:00/2014-09-30T08:18:00"
        );
        assert_eq!(interval.pad(TimeDelta::milliseconds(5)).unwrap(), interval);
    }

    #[test]
    fn test_pad_is_noop_when_aligned() {
        let interval = Interval::parse("2014-09-27T00:00:00/2014-10-01T00:00:00").unwrap();
        assert_eq!(interval.pad(TimeDelta::days(1)).unwrap(), interval);
    }
}
