//! Dimension declarations

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::{BoundFilter, BoundOrdering, Filter};
use crate::record::SchemaError;

pub const DEFAULT_SEPARATOR: &str = "___";

/// How a dimension's values are compared and offered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionKind {
    #[default]
    Standard,
    /// Bounds compare numerically
    Numeric,
    /// Values come from a fixed list of choices
    Categorical,
}

/// A dimension of a data source: something to filter or split on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Column name in the data source
    pub dimension: String,
    #[serde(default, rename = "type")]
    pub kind: DimensionKind,
    /// Display and lookup name; defaults to `dimension`
    pub name: Option<String>,
    /// Known values, for categorical dimensions
    #[serde(default)]
    pub choices: Vec<String>,
    /// `[lower, upper)` ranges offered as range selectors
    pub ranges: Option<Vec<(String, String)>>,
    pub separator: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    #[serde(default)]
    pub is_multi_valued: bool,
    #[serde(default = "default_can_split")]
    pub can_split: bool,
}

fn default_can_split() -> bool {
    true
}

/// A named bound filter for one declared range
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSelector {
    pub lower: String,
    pub upper: String,
    pub name: String,
    pub filter: Filter,
}

impl Dimension {
    pub fn new(dimension: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            kind: DimensionKind::Standard,
            name: None,
            choices: Vec::new(),
            ranges: None,
            separator: None,
            prefix: None,
            suffix: None,
            is_multi_valued: false,
            can_split: true,
        }
    }

    pub fn numeric(dimension: impl Into<String>) -> Self {
        Self { kind: DimensionKind::Numeric, ..Self::new(dimension) }
    }

    pub fn categorical<I, S>(dimension: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: DimensionKind::Categorical,
            choices: choices.into_iter().map(Into::into).collect(),
            ..Self::new(dimension)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_ranges(mut self, ranges: Vec<(String, String)>) -> Self {
        self.ranges = Some(ranges);
        self
    }

    pub fn with_affixes(mut self, prefix: Option<&str>, suffix: Option<&str>) -> Self {
        self.prefix = prefix.map(str::to_string);
        self.suffix = suffix.map(str::to_string);
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.dimension)
    }

    pub fn separator(&self) -> &str {
        self.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR)
    }

    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(&self.dimension)
    }

    pub fn suffix(&self) -> &str {
        self.suffix.as_deref().unwrap_or("")
    }

    pub fn ordering(&self) -> BoundOrdering {
        match self.kind {
            DimensionKind::Numeric => BoundOrdering::Numeric,
            _ => BoundOrdering::Alphanumeric,
        }
    }

    /// A bound builder on this dimension with its ordering and both
    /// bounds non-strict
    pub fn bound(&self) -> BoundFilter {
        BoundFilter::new(self.dimension.as_str())
            .ordering(self.ordering())
            .lower_strict(false)
            .upper_strict(false)
    }

    pub fn create_bound(
        &self,
        lower: Option<Value>,
        upper: Option<Value>,
    ) -> Result<Filter, SchemaError> {
        let mut bound = self.bound();
        if let Some(lower) = lower {
            bound = bound.lower(lower);
        }
        if let Some(upper) = upper {
            bound = bound.upper(upper);
        }
        bound.build()
    }

    pub fn create_selector(&self, value: impl Into<Value>) -> Filter {
        Filter::selector(self.dimension.as_str(), value)
    }

    /// `{prefix}{sep}{operator}{sep}{choice}{suffix}`
    pub fn format_filter_name(&self, choice: &str, operator: &str) -> String {
        let sep = self.separator();
        format!("{}{sep}{operator}{sep}{choice}{}", self.prefix(), self.suffix())
    }

    /// One upper-exclusive bound per declared range
    pub fn range_selectors(&self) -> Result<Vec<RangeSelector>, SchemaError> {
        let Some(ranges) = &self.ranges else {
            return Ok(Vec::new());
        };
        ranges
            .iter()
            .map(|(lower, upper)| {
                let filter = self
                    .bound()
                    .lower(lower.as_str())
                    .upper(upper.as_str())
                    .upper_strict(true)
                    .build()?;
                Ok(RangeSelector {
                    lower: lower.clone(),
                    upper: upper.clone(),
                    name: self.format_filter_name(&format!("{lower},{upper}"), "in"),
                    filter,
                })
            })
            .collect()
    }

    /// Declared choices; empty unless categorical
    pub fn choices(&self) -> &[String] {
        match self.kind {
            DimensionKind::Categorical => &self.choices,
            _ => &[],
        }
    }

    /// OR of a selector per choice, `None` without choices
    pub fn choices_filter(&self) -> Option<Filter> {
        Filter::disjoin(self.choices().iter().map(|c| Some(self.create_selector(c.as_str()))))
    }
}
