//! Time bucketing granularities

use std::fmt;
use std::str::FromStr;

use chrono::TimeDelta;
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use super::duration::{DurationUnits, IsoDuration};
use super::interval::parse_timestamp;
use crate::record::{kind_name, SchemaError, Violation};

const FAMILY: &str = "granularity";

fn invalid(variant: &str, field: &str, value: &str) -> SchemaError {
    SchemaError::invalid_value(FAMILY, variant, field, format!("Invalid {field}: {value}"))
}

fn validate_origin(variant: &str, origin: &str) -> Result<(), SchemaError> {
    match parse_timestamp(origin) {
        Some(_) => Ok(()),
        None => Err(invalid(variant, "origin", origin)),
    }
}

/// One of the named granularities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimpleGranularity {
    All,
    Day,
    FifteenMinute,
    Hour,
    Minute,
    None,
    Second,
    ThirtyMinute,
    Week,
    Year,
}

impl SimpleGranularity {
    pub const ALL: [SimpleGranularity; 10] = [
        SimpleGranularity::All,
        SimpleGranularity::Day,
        SimpleGranularity::FifteenMinute,
        SimpleGranularity::Hour,
        SimpleGranularity::Minute,
        SimpleGranularity::None,
        SimpleGranularity::Second,
        SimpleGranularity::ThirtyMinute,
        SimpleGranularity::Week,
        SimpleGranularity::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SimpleGranularity::All => "all",
            SimpleGranularity::Day => "day",
            SimpleGranularity::FifteenMinute => "fifteen_minute",
            SimpleGranularity::Hour => "hour",
            SimpleGranularity::Minute => "minute",
            SimpleGranularity::None => "none",
            SimpleGranularity::Second => "second",
            SimpleGranularity::ThirtyMinute => "thirty_minute",
            SimpleGranularity::Week => "week",
            SimpleGranularity::Year => "year",
        }
    }

    /// Bucket width; `all` and `none` have none
    pub fn width(&self) -> Option<TimeDelta> {
        match self {
            SimpleGranularity::All | SimpleGranularity::None => None,
            SimpleGranularity::Day => Some(TimeDelta::days(1)),
            SimpleGranularity::FifteenMinute => Some(TimeDelta::minutes(15)),
            SimpleGranularity::Hour => Some(TimeDelta::hours(1)),
            SimpleGranularity::Minute => Some(TimeDelta::minutes(1)),
            SimpleGranularity::Second => Some(TimeDelta::seconds(1)),
            SimpleGranularity::ThirtyMinute => Some(TimeDelta::minutes(30)),
            SimpleGranularity::Week => Some(TimeDelta::weeks(1)),
            SimpleGranularity::Year => Some(TimeDelta::days(365)),
        }
    }
}

impl FromStr for SimpleGranularity {
    type Err = SchemaError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|granularity| granularity.as_str() == text)
            .ok_or_else(|| invalid("simple", "granularity", text))
    }
}

impl fmt::Display for SimpleGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-width buckets given in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "duration")]
pub struct DurationGranularity {
    duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<String>,
}

impl DurationGranularity {
    pub fn new(duration_ms: u64) -> Self {
        Self { duration: duration_ms, origin: None }
    }

    /// Anchor buckets at `origin`, an ISO-8601 datetime
    pub fn with_origin(mut self, origin: &str) -> Result<Self, SchemaError> {
        validate_origin("duration", origin)?;
        self.origin = Some(origin.to_string());
        Ok(self)
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn width(&self) -> TimeDelta {
        TimeDelta::milliseconds(i64::try_from(self.duration).unwrap_or(i64::MAX))
    }
}

/// Calendar-aware buckets given as an ISO-8601 period
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "period", rename_all = "camelCase")]
pub struct PeriodGranularity {
    period: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

impl PeriodGranularity {
    pub fn new(period: &str) -> Result<Self, SchemaError> {
        IsoDuration::parse(period).map_err(|_| invalid("period", "period", period))?;
        Ok(Self { period: period.to_string(), origin: None, time_zone: None })
    }

    pub fn from_units(units: DurationUnits) -> Result<Self, SchemaError> {
        let period = units
            .to_duration()
            .map_err(|e| SchemaError::invalid_value(FAMILY, "period", "period", e.to_string()))?;
        Ok(Self { period: period.to_string(), origin: None, time_zone: None })
    }

    pub fn with_origin(mut self, origin: &str) -> Result<Self, SchemaError> {
        validate_origin("period", origin)?;
        self.origin = Some(origin.to_string());
        Ok(self)
    }

    /// Bucket in `time_zone`, an IANA zone name
    pub fn with_time_zone(mut self, time_zone: &str) -> Result<Self, SchemaError> {
        time_zone
            .parse::<Tz>()
            .map_err(|_| invalid("period", "timeZone", time_zone))?;
        self.time_zone = Some(time_zone.to_string());
        Ok(self)
    }

    pub fn period(&self) -> &str {
        &self.period
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn time_zone(&self) -> Option<&str> {
        self.time_zone.as_deref()
    }

    /// Approximate width: years count 365 days, months 30
    pub fn width(&self) -> Option<TimeDelta> {
        IsoDuration::parse(&self.period).ok().map(|d| d.approximate())
    }
}

/// Any granularity a query accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Granularity {
    Simple(SimpleGranularity),
    Duration(DurationGranularity),
    Period(PeriodGranularity),
}

impl Granularity {
    pub fn all() -> Self {
        Granularity::Simple(SimpleGranularity::All)
    }

    /// Bucket width, if the granularity has one
    pub fn width(&self) -> Option<TimeDelta> {
        match self {
            Granularity::Simple(simple) => simple.width(),
            Granularity::Duration(duration) => Some(duration.width()),
            Granularity::Period(period) => period.width(),
        }
    }

    /// Read and validate a granularity in wire form
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let object = match value {
            Value::String(name) => return name.parse().map(Granularity::Simple),
            Value::Object(object) => object,
            other => {
                return Err(SchemaError::new(
                    FAMILY,
                    "",
                    vec![Violation::NotAnObject { found: kind_name(other) }],
                ))
            }
        };
        let text = |key: &str| field(object, key);

        match text("type") {
            Some("duration") => {
                let duration = object
                    .get("duration")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| invalid("duration", "duration", &value.to_string()))?;
                let granularity = DurationGranularity::new(duration);
                match text("origin") {
                    Some(origin) => granularity.with_origin(origin).map(Granularity::Duration),
                    None => Ok(Granularity::Duration(granularity)),
                }
            }
            Some("period") => {
                let period = text("period").ok_or_else(|| SchemaError::new(
                    FAMILY,
                    "period",
                    vec![Violation::MissingField { field: "period", variant: "period".into() }],
                ))?;
                let mut granularity = PeriodGranularity::new(period)?;
                if let Some(origin) = text("origin") {
                    granularity = granularity.with_origin(origin)?;
                }
                if let Some(time_zone) = text("timeZone").or_else(|| text("time_zone")) {
                    granularity = granularity.with_time_zone(time_zone)?;
                }
                Ok(Granularity::Period(granularity))
            }
            Some(other) => Err(invalid(other, "type", other)),
            None => Err(SchemaError::new(
                FAMILY,
                "",
                vec![Violation::MissingField { field: "type", variant: String::new() }],
            )),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Granularity::Simple(simple) => Value::String(simple.as_str().to_string()),
            Granularity::Duration(duration) => {
                let mut map = Map::new();
                map.insert("type".into(), json!("duration"));
                map.insert("duration".into(), json!(duration.duration));
                if let Some(origin) = &duration.origin {
                    map.insert("origin".into(), json!(origin));
                }
                Value::Object(map)
            }
            Granularity::Period(period) => {
                let mut map = Map::new();
                map.insert("type".into(), json!("period"));
                map.insert("period".into(), json!(period.period));
                if let Some(origin) = &period.origin {
                    map.insert("origin".into(), json!(origin));
                }
                if let Some(time_zone) = &period.time_zone {
                    map.insert("timeZone".into(), json!(time_zone));
                }
                Value::Object(map)
            }
        }
    }
}

fn field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

impl From<SimpleGranularity> for Granularity {
    fn from(simple: SimpleGranularity) -> Self {
        Granularity::Simple(simple)
    }
}

impl From<DurationGranularity> for Granularity {
    fn from(duration: DurationGranularity) -> Self {
        Granularity::Duration(duration)
    }
}

impl From<PeriodGranularity> for Granularity {
    fn from(period: PeriodGranularity) -> Self {
        Granularity::Period(period)
    }
}

impl From<&Granularity> for Value {
    fn from(granularity: &Granularity) -> Self {
        granularity.to_value()
    }
}

impl<'de> Deserialize<'de> for Granularity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Granularity::from_value(&value).map_err(serde::de::Error::custom)
    }
}
