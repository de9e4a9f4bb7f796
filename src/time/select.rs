//! Granularity selection for a target bucket count

use std::str::FromStr;

use chrono::TimeDelta;
use tracing::debug;

use super::duration::IsoDuration;
use super::granularity::{Granularity, PeriodGranularity, SimpleGranularity};
use super::interval::Interval;
use crate::record::SchemaError;

const FAMILY: &str = "granularity";

/// What to divide: an interval, or a span given directly
#[derive(Debug, Clone, Copy)]
pub enum Span<'a> {
    Interval(&'a Interval),
    Width(TimeDelta),
}

impl<'a> From<&'a Interval> for Span<'a> {
    fn from(interval: &'a Interval) -> Self {
        Span::Interval(interval)
    }
}

impl From<TimeDelta> for Span<'_> {
    fn from(width: TimeDelta) -> Self {
        Span::Width(width)
    }
}

/// Outcome of `select_granularity`
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// A single bucket
    All,
    /// One of the offered choices, as given
    Choice(String),
    /// A computed bucket width
    Width(TimeDelta),
}

impl Selection {
    /// ISO-8601 or granularity name for the selection
    pub fn to_iso(&self) -> String {
        match self {
            Selection::All => SimpleGranularity::All.to_string(),
            Selection::Choice(choice) => choice.clone(),
            Selection::Width(width) => IsoDuration::from_delta(*width).to_string(),
        }
    }

    pub fn into_granularity(self) -> Result<Granularity, SchemaError> {
        match self {
            Selection::All => Ok(Granularity::all()),
            Selection::Choice(choice) => match SimpleGranularity::from_str(&choice) {
                Ok(simple) => Ok(Granularity::Simple(simple)),
                Err(_) => PeriodGranularity::new(&choice).map(Granularity::Period),
            },
            Selection::Width(width) => {
                PeriodGranularity::new(&IsoDuration::from_delta(width).to_string())
                    .map(Granularity::Period)
            }
        }
    }
}

/// Width of a choice given as an ISO-8601 duration or granularity name
fn choice_width(choice: &str) -> Result<TimeDelta, SchemaError> {
    if let Ok(duration) = IsoDuration::parse(choice) {
        return Ok(duration.approximate());
    }
    SimpleGranularity::from_str(choice)?
        .width()
        .filter(|width| !width.is_zero())
        .ok_or_else(|| {
            SchemaError::invalid_value(FAMILY, choice, "choice", format!("{choice} has no width"))
        })
}

fn seconds(width: TimeDelta) -> f64 {
    width.num_nanoseconds().map_or(width.num_seconds() as f64, |n| n as f64 / 1e9)
}

/// Pick the choice whose width is closest to `exact`, first one on ties
pub fn find_closest_duration<'c>(exact: TimeDelta, choices: &[&'c str]) -> Result<&'c str, SchemaError> {
    let exact_seconds = seconds(exact);
    let mut best: Option<(&'c str, f64)> = None;
    for choice in choices {
        let distance = (seconds(choice_width(choice)?) / exact_seconds - 1.0).abs();
        if best.map_or(true, |(_, closest)| distance < closest) {
            best = Some((*choice, distance));
        }
    }
    best.map(|(choice, _)| choice).ok_or_else(|| {
        SchemaError::invalid_value(FAMILY, "", "choices", "no choices to select from")
    })
}

/// Round `width` to the nearest multiple of `resolution`
pub fn round_duration(width: TimeDelta, resolution: &str) -> Result<TimeDelta, SchemaError> {
    let step = choice_width(resolution)?;
    let multiples = (seconds(width) / seconds(step)).round();
    let nanos = multiples * seconds(step) * 1e9;
    Ok(TimeDelta::nanoseconds(nanos as i64))
}

/// Choose a granularity dividing `span` into about `n_buckets` buckets
///
/// One bucket is always `all`. With `choices` the closest choice wins;
/// with `resolution` the exact width is rounded to it; otherwise the
/// exact width is returned.
pub fn select_granularity<'a>(
    span: impl Into<Span<'a>>,
    n_buckets: u32,
    resolution: Option<&str>,
    choices: Option<&[&str]>,
) -> Result<Selection, SchemaError> {
    if n_buckets == 1 {
        return Ok(Selection::All);
    }
    let buckets = i32::try_from(n_buckets)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            SchemaError::invalid_value(FAMILY, "", "nBuckets", format!("cannot make {n_buckets} buckets"))
        })?;

    let total = match span.into() {
        Span::Interval(interval) => interval.duration()?,
        Span::Width(width) => width,
    };
    let exact = total / buckets;

    let selection = if let Some(choices) = choices {
        Selection::Choice(find_closest_duration(exact, choices)?.to_string())
    } else if let Some(resolution) = resolution {
        Selection::Width(round_duration(exact, resolution)?)
    } else {
        Selection::Width(exact)
    };
    debug!(n_buckets, selected = %selection.to_iso(), "selected granularity");
    Ok(selection)
}
