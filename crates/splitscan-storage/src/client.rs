use async_trait::async_trait;
use bytes::Bytes;

use splitscan_core::{RegionDescriptor, Row, ScanRequest};

use crate::error::Result;

/// Data-path access to the key-value store.
///
/// Tables are addressed by their qualified `schema:table` name. Reads apply
/// the request's filter and column selection on the store side.
#[async_trait]
pub trait KvClient: Send + Sync {
    /// Fetches the listed rows, skipping keys that do not exist or fail the filter.
    async fn multi_get(&self, table: &str, keys: &[Bytes], request: &ScanRequest)
        -> Result<Vec<Row>>;

    /// Scans `request.range` in key order.
    async fn scan(&self, table: &str, request: &ScanRequest) -> Result<Vec<Row>>;

    /// Scans one region of a snapshot, bounded by both the region and `request.range`.
    async fn scan_snapshot_region(
        &self,
        snapshot: &str,
        region: &RegionDescriptor,
        request: &ScanRequest,
    ) -> Result<Vec<Row>>;

    /// Deletes rows by key and returns how many existed.
    async fn delete(&self, table: &str, keys: &[Bytes]) -> Result<usize>;
}
