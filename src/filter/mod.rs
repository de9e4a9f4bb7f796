//! Filter records (noun module)
//!
//! Filters restrict which events a query aggregates. Every variant is a
//! `Filter` record; `join`, `disjoin` and `negate` compose them.

mod bound;
mod variants;

pub use bound::{BoundFilter, BoundOrdering};
pub use variants::{Filter, FilterFamily};
