//! Generic validated JSON record

use std::fmt;
use std::marker::PhantomData;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use super::case::normalize_keys;
use super::error::{SchemaError, Violation};
use super::schema::{kind_name, FieldSpec, RecordFamily};

/// A JSON object that has passed its family's schema
///
/// The discriminant is always the first key. Unknown fields given at
/// construction are dropped, and keys are normalized to lowerCamelCase.
/// Records are immutable; `extend` returns a new validated record.
pub struct TypedRecord<F: RecordFamily> {
    fields: Map<String, Value>,
    family: PhantomData<fn() -> F>,
}

impl<F: RecordFamily> TypedRecord<F> {
    /// Validate `fields` as variant `variant` of the family
    ///
    /// `Value::Null` is treated as an empty field set.
    pub fn new(variant: &str, fields: Value) -> Result<Self, SchemaError> {
        match fields {
            Value::Object(map) => Self::from_map(variant, map),
            Value::Null => Self::from_map(variant, Map::new()),
            other => Err(SchemaError::new(
                F::FAMILY,
                variant,
                vec![Violation::NotAnObject { found: kind_name(&other) }],
            )),
        }
    }

    /// Validate an already-split field map
    pub fn from_map(variant: &str, fields: Map<String, Value>) -> Result<Self, SchemaError> {
        let Some(schema) = F::schema(variant) else {
            debug!(family = F::FAMILY, variant, "unknown record variant");
            return Err(SchemaError::new(
                F::FAMILY,
                variant,
                vec![Violation::UnknownVariant {
                    family: F::FAMILY,
                    variant: variant.to_string(),
                    known: F::VARIANTS.to_vec(),
                }],
            ));
        };

        let mut input = normalize_keys(fields);
        let mut record = Map::new();
        record.insert(F::TAG.to_string(), Value::String(variant.to_string()));
        let mut violations = Vec::new();

        for spec in schema.required {
            match input.remove(spec.name) {
                None => violations.push(Violation::MissingField {
                    field: spec.name,
                    variant: variant.to_string(),
                }),
                Some(value) => take(spec, value, &mut record, &mut violations),
            }
        }
        for spec in schema.optional.iter().chain(F::COMMON) {
            match input.remove(spec.name) {
                // An explicit null on an optional field means "not given"
                None | Some(Value::Null) => {}
                Some(value) => take(spec, value, &mut record, &mut violations),
            }
        }

        if !violations.is_empty() {
            debug!(family = F::FAMILY, variant, count = violations.len(), "record failed validation");
            return Err(SchemaError::new(F::FAMILY, variant, violations));
        }
        if !input.is_empty() {
            debug!(
                family = F::FAMILY,
                variant,
                dropped = ?input.keys().collect::<Vec<_>>(),
                "dropping unknown fields"
            );
        }

        F::finish(variant, &mut record);
        Ok(Self::wrap(record))
    }

    /// Build a record whose shape is guaranteed by the caller's types
    pub(crate) fn assemble(variant: &str, fields: Map<String, Value>) -> Self {
        debug_assert!(
            Self::from_map(variant, fields.clone()).is_ok(),
            "typed constructor produced an invalid {} record",
            F::FAMILY
        );
        let mut record = Map::new();
        record.insert(F::TAG.to_string(), Value::String(variant.to_string()));
        record.extend(fields);
        F::finish(variant, &mut record);
        Self::wrap(record)
    }

    fn wrap(fields: Map<String, Value>) -> Self {
        Self { fields, family: PhantomData }
    }

    /// The discriminant value
    pub fn variant(&self) -> &str {
        self.fields.get(F::TAG).and_then(Value::as_str).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Merge `fields` over this record and validate the result
    ///
    /// The variant is kept. Extending with fields the record already
    /// holds yields an equal record.
    pub fn extend(&self, fields: Value) -> Result<Self, SchemaError> {
        let extra = match fields {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(SchemaError::new(
                    F::FAMILY,
                    self.variant(),
                    vec![Violation::NotAnObject { found: kind_name(&other) }],
                ))
            }
        };
        let mut merged = self.fields.clone();
        merged.remove(F::TAG);
        for (key, value) in normalize_keys(extra) {
            merged.insert(key, value);
        }
        Self::from_map(self.variant(), merged)
    }

    /// Copy of this record without `key`, revalidated
    pub fn without(&self, key: &str) -> Result<Self, SchemaError> {
        let mut fields = self.fields.clone();
        fields.remove(F::TAG);
        fields.remove(key);
        Self::from_map(self.variant(), fields)
    }
}

fn take(
    spec: &FieldSpec,
    value: Value,
    record: &mut Map<String, Value>,
    violations: &mut Vec<Violation>,
) {
    if spec.accepts.check(&value) {
        record.insert(spec.name.to_string(), value);
    } else {
        violations.push(Violation::MismatchedType {
            field: spec.name.to_string(),
            expected: spec.accepts.describe(),
            found: kind_name(&value),
        });
    }
}

impl<F: RecordFamily> Clone for TypedRecord<F> {
    fn clone(&self) -> Self {
        Self::wrap(self.fields.clone())
    }
}

impl<F: RecordFamily> PartialEq for TypedRecord<F> {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl<F: RecordFamily> fmt::Debug for TypedRecord<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(F::FAMILY).field(&self.fields).finish()
    }
}

impl<F: RecordFamily> fmt::Display for TypedRecord<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.fields.clone()))
    }
}

impl<F: RecordFamily> PartialEq<Value> for TypedRecord<F> {
    fn eq(&self, other: &Value) -> bool {
        other.as_object() == Some(&self.fields)
    }
}

impl<F: RecordFamily> From<TypedRecord<F>> for Value {
    fn from(record: TypedRecord<F>) -> Self {
        Value::Object(record.fields)
    }
}

/// Re-validate a plain JSON object, reading the variant from its tag
impl<F: RecordFamily> TryFrom<Value> for TypedRecord<F> {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut map) = value else {
            return Err(SchemaError::new(
                F::FAMILY,
                "",
                vec![Violation::NotAnObject { found: kind_name(&value) }],
            ));
        };
        match map.remove(F::TAG) {
            Some(Value::String(variant)) => Self::from_map(&variant, map),
            _ => Err(SchemaError::new(
                F::FAMILY,
                "",
                vec![Violation::MissingField { field: F::TAG, variant: String::new() }],
            )),
        }
    }
}

impl<F: RecordFamily> Serialize for TypedRecord<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de, F: RecordFamily> Deserialize<'de> for TypedRecord<F> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::try_from(value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::schema::{VariantSchema, BOOL, NUMBER, STRING};
    use serde_json::json;

    struct Shape;

    static CIRCLE: VariantSchema = VariantSchema {
        required: &[FieldSpec::of("radius", NUMBER)],
        optional: &[FieldSpec::of("label", STRING), FieldSpec::of("filled", BOOL)],
    };
    static POINT: VariantSchema = VariantSchema { required: &[], optional: &[] };

    impl RecordFamily for Shape {
        const FAMILY: &'static str = "shape";
        const VARIANTS: &'static [&'static str] = &["circle", "point"];

        fn schema(variant: &str) -> Option<&'static VariantSchema> {
            match variant {
                "circle" => Some(&CIRCLE),
                "point" => Some(&POINT),
                _ => None,
            }
        }

        fn finish(variant: &str, fields: &mut Map<String, Value>) {
            if variant == "circle" && !fields.contains_key("label") {
                fields.insert("label".into(), json!("unnamed"));
            }
        }
    }

    type ShapeRecord = TypedRecord<Shape>;

    #[test]
    fn test_tag_written_first_and_unknown_fields_dropped() {
        let record = ShapeRecord::new("circle", json!({"radius": 2, "color": "red"})).unwrap();
        let keys: Vec<_> = record.fields().keys().cloned().collect();
        assert_eq!(keys, vec!["type", "radius", "label"]);
        assert_eq!(record.variant(), "circle");
    }

    #[test]
    fn test_all_violations_reported() {
        let err = ShapeRecord::new("circle", json!({"label": 3, "filled": "yes"})).unwrap_err();
        assert_eq!(err.violations.len(), 3);
        assert!(err.is_missing("radius"));
    }

    #[test]
    fn test_bool_is_not_a_number() {
        let err = ShapeRecord::new("circle", json!({"radius": true})).unwrap_err();
        assert!(matches!(err.violations[0], Violation::MismatchedType { .. }));
    }

    #[test]
    fn test_unknown_variant() {
        let err = ShapeRecord::new("square", json!({})).unwrap_err();
        assert!(matches!(err.violations[0], Violation::UnknownVariant { .. }));
    }

    #[test]
    fn test_extend_is_idempotent() {
        let record = ShapeRecord::new("circle", json!({"radius": 1})).unwrap();
        let extended = record.extend(json!({"radius": 1})).unwrap();
        assert_eq!(record, extended);
        let relabeled = record.extend(json!({"label": "big"})).unwrap();
        assert_eq!(relabeled.get_str("label"), Some("big"));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: ShapeRecord = serde_json::from_value(json!({"type": "point"})).unwrap();
        assert_eq!(ok, json!({"type": "point"}));
        let bad: Result<ShapeRecord, _> = serde_json::from_value(json!({"type": "circle"}));
        assert!(bad.is_err());
    }
}
