//! Validated JSON records (noun module)
//!
//! Every query document part (filters, aggregations, post-aggregations,
//! queries) is a JSON object discriminated by one tag. A family lists its
//! variants and their field schemas; `TypedRecord` enforces them.

mod case;
mod error;
mod schema;
mod typed;

pub use case::{normalize_keys, snake_to_camel};
pub use error::{SchemaError, Violation};
pub use schema::{kind_name, Accepts, FieldSpec, JsonKind, RecordFamily, VariantSchema};
pub use typed::TypedRecord;

pub(crate) use schema::{
    BOOL, INTEGER, LIST, LIST_OR_STRING, OBJECT, STRING, STRING_OR_NUMBER,
    STRING_OR_OBJECT,
};
