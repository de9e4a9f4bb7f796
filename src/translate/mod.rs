//! Filter-expression translator (verb module)
//!
//! FilterExpr → Filter. Comparisons dispatch on which side holds the
//! field; inexpressible combinations fail instead of guessing.

mod error;
mod expr;
mod translate;

pub use error::TranslateError;
pub use expr::{ExprOperand, FilterExpr, Operator};
pub use translate::{translate, translate_filter};
