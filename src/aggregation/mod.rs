//! Aggregation and post-aggregation records (noun module)
//!
//! Aggregations summarize events per bucket; post-aggregations compute
//! over the aggregated values. Arithmetic between the two builds
//! post-aggregation trees.

mod aggregation;
mod arithmetic;
mod post;

pub use aggregation::{filter_aggregation, Aggregation, AggregationFamily, MATHEMATICAL_TYPES};
pub use arithmetic::{
    add, arithmetic, divide, multiply, remove_duplicates, subtract, ArithmeticOp, Named, Operand,
};
pub use post::{PostAggregation, PostAggregationFamily};
