//! Query pre-processing (verb module)
//!
//! Cross-cutting settings (data source, timeout, padding, shared filters)
//! are entered into a `QueryContext` as keyed processors and applied to
//! every query processed while their scope is alive.

mod error;
pub mod processors;
mod stack;

pub use error::ContextError;
pub use stack::{ContextScope, Processor, QueryContext, QueryProcessor};
