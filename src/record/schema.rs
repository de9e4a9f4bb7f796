//! Field schemas shared by every record family

use serde_json::{Map, Value};

/// Kinds of JSON value a field may accept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    String,
    /// Any number, integral or not (booleans are not numbers)
    Number,
    Integer,
    Bool,
    List,
    Object,
}

impl JsonKind {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            JsonKind::String => value.is_string(),
            JsonKind::Number => value.is_number(),
            JsonKind::Integer => value.is_i64() || value.is_u64(),
            JsonKind::Bool => value.is_boolean(),
            JsonKind::List => value.is_array(),
            JsonKind::Object => value.is_object(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonKind::String => "string",
            JsonKind::Number => "number",
            JsonKind::Integer => "integer",
            JsonKind::Bool => "bool",
            JsonKind::List => "list",
            JsonKind::Object => "object",
        }
    }
}

/// Name of the kind of a JSON value, for error messages
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// What a field accepts
#[derive(Debug, Clone, Copy)]
pub enum Accepts {
    Any,
    Kinds(&'static [JsonKind]),
}

impl Accepts {
    pub fn check(&self, value: &Value) -> bool {
        match self {
            Accepts::Any => true,
            Accepts::Kinds(kinds) => kinds.iter().any(|k| k.matches(value)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Accepts::Any => "any".to_string(),
            Accepts::Kinds(kinds) => kinds
                .iter()
                .map(JsonKind::as_str)
                .collect::<Vec<_>>()
                .join(" or "),
        }
    }
}

/// A named field and the values it accepts
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub accepts: Accepts,
}

impl FieldSpec {
    pub const fn any(name: &'static str) -> Self {
        Self { name, accepts: Accepts::Any }
    }

    pub const fn of(name: &'static str, kinds: &'static [JsonKind]) -> Self {
        Self { name, accepts: Accepts::Kinds(kinds) }
    }
}

/// Required and optional fields of one variant
#[derive(Debug, Clone, Copy)]
pub struct VariantSchema {
    pub required: &'static [FieldSpec],
    pub optional: &'static [FieldSpec],
}

// Kind sets reused across the family tables
pub const STRING: &[JsonKind] = &[JsonKind::String];
pub const NUMBER: &[JsonKind] = &[JsonKind::Number];
pub const INTEGER: &[JsonKind] = &[JsonKind::Integer];
pub const BOOL: &[JsonKind] = &[JsonKind::Bool];
pub const LIST: &[JsonKind] = &[JsonKind::List];
pub const OBJECT: &[JsonKind] = &[JsonKind::Object];
pub const STRING_OR_NUMBER: &[JsonKind] = &[JsonKind::String, JsonKind::Number];
pub const STRING_OR_OBJECT: &[JsonKind] = &[JsonKind::String, JsonKind::Object];
pub const LIST_OR_STRING: &[JsonKind] = &[JsonKind::List, JsonKind::String];

/// A closed family of JSON records discriminated by one tag field
///
/// Each family names its variants and, per variant, the fields it
/// requires and allows. Several variants may share one schema.
pub trait RecordFamily: Sized + 'static {
    /// Name used in error messages
    const FAMILY: &'static str;

    /// Discriminant key written into every record
    const TAG: &'static str = "type";

    /// Every discriminant value the family accepts
    const VARIANTS: &'static [&'static str];

    /// Fields any variant may carry on top of its own schema
    const COMMON: &'static [FieldSpec] = &[];

    /// Schema for a discriminant value, `None` if unknown
    fn schema(variant: &str) -> Option<&'static VariantSchema>;

    /// Fill in derived defaults once a record has validated
    fn finish(_variant: &str, _fields: &mut Map<String, Value>) {}
}
