//! Data-source descriptions (noun module)
//!
//! A `DataSourceView` declares the dimensions and metrics of one data
//! source and turns requests for metrics, splits and filters into
//! queries.

mod dimension;
mod error;
mod metric;
mod view;

pub use dimension::{Dimension, DimensionKind, RangeSelector, DEFAULT_SEPARATOR};
pub use error::ViewError;
pub use metric::ComplexMetric;
pub use view::{DataSourceView, QueryOptions};
