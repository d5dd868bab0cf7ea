//! Range partitioned distributed sort
pub mod buffer;
pub mod collector;
pub mod distributor;
pub mod local_sort;
pub mod planner;
pub mod source;
pub mod verifier;

pub use collector::{collect, GatherPlan};
pub use local_sort::sort_local;
pub use planner::{Range, RangePlan};
pub use source::ValueSource;
pub use verifier::is_sorted;
