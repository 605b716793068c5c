use serde::{Deserialize, Serialize};

use crate::filter::ScanFilter;
use crate::row::CellKey;
use crate::split::KeyRange;

/// Rows fetched per RPC when nothing else is configured.
pub const DEFAULT_SCAN_CACHING: u32 = 10_000;

/// Fully resolved read request for one split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Cells to fetch; empty fetches every cell.
    pub columns: Vec<CellKey>,
    pub filter: Option<ScanFilter>,
    pub caching: u32,
    pub range: KeyRange,
}

impl ScanRequest {
    #[must_use]
    pub fn new(range: KeyRange) -> Self {
        Self {
            columns: Vec::new(),
            filter: None,
            caching: DEFAULT_SCAN_CACHING,
            range,
        }
    }

    #[must_use]
    pub fn with_columns(mut self, columns: Vec<CellKey>) -> Self {
        self.columns = columns;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Option<ScanFilter>) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub const fn with_caching(mut self, caching: u32) -> Self {
        self.caching = caching;
        self
    }

    pub fn is_key_only(&self) -> bool {
        self.filter.as_ref().is_some_and(ScanFilter::is_key_only)
    }
}
