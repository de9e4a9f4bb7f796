//! Time values (noun module)
//!
//! ISO-8601 durations and intervals, bucketing granularities, and the
//! helpers that relate them: interval padding and granularity selection.

mod duration;
mod granularity;
mod interval;
mod select;

pub use duration::{DurationParseError, DurationUnits, IsoDuration};
pub use granularity::{DurationGranularity, Granularity, PeriodGranularity, SimpleGranularity};
pub use interval::{parse_timestamp, Bounds, Interval, IntervalBuilder, IntervalPoint, Intervals, Stamp};
pub use select::{find_closest_duration, round_duration, select_granularity, Selection, Span};
