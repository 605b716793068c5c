//! Turns pushed-down column constraints into independently executable splits.
//!
//! The pipeline is:
//! 1. [`extract_conditions`] flattens the engine constraint
//! 2. [`SplitPlanner`] picks a strategy and produces [`Split`]s
//! 3. [`build_scan_request`] compiles a split into what a reader sends to the store
//!
//! [`Split`]: splitscan_core::Split

pub mod batch_get;
pub mod extract;
pub mod filter;
pub mod key_range;
pub mod planner;
pub mod prefix;
pub mod range_math;
pub mod retry;
pub mod scan_request;
pub mod snapshot;

pub use batch_get::chunk_row_keys;
pub use extract::extract_conditions;
pub use filter::build_scan_filter;
pub use key_range::{plan_key_ranges, row_key_bounds, row_key_bounds_exact, RowKeyBounds};
pub use planner::{SplitPlanner, Strategy};
pub use prefix::{PrefixExpansion, PrefixExpander, PrefixOverflow};
pub use retry::{RetryExhausted, RetryPolicy};
pub use scan_request::build_scan_request;
pub use snapshot::{snapshot_name, SnapshotCoordinator};

/// Result alias used throughout the query crate.
pub type Result<T, E = splitscan_core::CoreError> = std::result::Result<T, E>;
