//! Metric declarations

use serde::{Deserialize, Serialize};

use crate::aggregation::{Aggregation, PostAggregation};

/// A metric built from aggregations and post-aggregations
///
/// Requesting the metric adds all of its parts to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexMetric {
    /// Key the metric is requested by
    pub metric: String,
    /// Display name; defaults to `metric`
    pub name: Option<String>,
    #[serde(default)]
    pub aggregations: Vec<Aggregation>,
    #[serde(default)]
    pub post_aggregations: Vec<PostAggregation>,
    pub unit: Option<String>,
}

impl ComplexMetric {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            name: None,
            aggregations: Vec::new(),
            post_aggregations: Vec::new(),
            unit: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregations.push(aggregation);
        self
    }

    pub fn post_aggregation(mut self, post_aggregation: PostAggregation) -> Self {
        self.post_aggregations.push(post_aggregation);
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.metric)
    }
}
