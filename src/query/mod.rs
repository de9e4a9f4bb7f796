//! Query documents (noun module)

mod error;
mod request;
mod validate;

pub use error::ValidationError;
pub use request::{Query, QueryFamily};
pub use validate::validate_query;
