//! Core domain types and traits for planning distributed reads over
//! row-key-ordered key-value tables.

pub mod condition;
pub mod config;
pub mod constraint;
pub mod error;
pub mod filter;
pub mod row;
pub mod scan;
pub mod split;
pub mod table;
pub mod traits;
pub mod value;

pub use condition::{Condition, Operator};
pub use crate::config::{
    PlannerConfig, RegionLocalConfig, RetryConfig, ScanConfig, SchedulingConfig, SnapshotConfig,
    SplitscanConfig, ALL_TABLES,
};
pub use constraint::{Domain, DomainValues, TupleDomain, ValueRange};
pub use error::{CoreError, CoreResult};
pub use filter::{ColumnValueFilter, CompareOp, RowKeyFilter, ScanFilter};
pub use row::{CellKey, Row};
pub use scan::{ScanRequest, DEFAULT_SCAN_CACHING};
pub use split::{
    key_successor, prefix_successor, HostAddress, KeyRange, RegionDescriptor, ScanUnit, Split,
};
pub use table::{
    CharRange, ColumnMeta, RowKeyFormat, SaltSpec, TableMetaInfo, DEFAULT_ROW_KEY_SEPARATOR,
    DEFAULT_SCHEMA,
};
pub use traits::{SnapshotAdmin, TableMetaStore};
pub use value::{ColumnType, ScalarValue};
