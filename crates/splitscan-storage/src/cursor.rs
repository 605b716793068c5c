//! Reading the rows of planned splits.

use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info};

use splitscan_core::{CoreError, Row, ScanRequest, ScanUnit, Split};

use crate::client::KvClient;
use crate::error::Result;

/// Rows of one split, handed out in pages.
///
/// The split is read in full when the cursor opens.
pub struct ScanCursor {
    table: String,
    rows: VecDeque<Row>,
    page_size: usize,
    client: Arc<dyn KvClient>,
}

impl ScanCursor {
    pub async fn open(
        split: &Split,
        request: &ScanRequest,
        client: Arc<dyn KvClient>,
        page_size: usize,
    ) -> Result<Self> {
        if page_size == 0 {
            return Err(CoreError::invalid_config("page size must be greater than 0"));
        }

        let table = split.qualified_table();
        let started = Instant::now();
        let rows = match &split.unit {
            ScanUnit::BatchGet { keys } => client.multi_get(&table, keys, request).await?,
            ScanUnit::KeyRange { .. } => client.scan(&table, request).await?,
            ScanUnit::RegionLocal {
                region,
                snapshot_name,
                ..
            } => {
                client
                    .scan_snapshot_region(snapshot_name, region, request)
                    .await?
            }
        };

        debug!(
            split = %split.describe(),
            rows = rows.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "opened scan cursor"
        );

        Ok(Self {
            table,
            rows: rows.into(),
            page_size,
            client,
        })
    }

    /// Next page of at most `page_size` rows, or `None` once drained.
    pub fn next_page(&mut self) -> Option<Vec<Row>> {
        if self.rows.is_empty() {
            return None;
        }
        let take = self.page_size.min(self.rows.len());
        Some(self.rows.drain(..take).collect())
    }

    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Deletes `rows` from the live table by key.
    pub async fn delete_rows(&self, rows: &[Row]) -> Result<usize> {
        let keys: Vec<Bytes> = rows.iter().map(|row| row.key.clone()).collect();
        let deleted = self.client.delete(&self.table, &keys).await?;
        info!(table = %self.table, requested = keys.len(), deleted, "deleted rows");
        Ok(deleted)
    }
}

/// Reads every split concurrently, one task per split, and gathers the rows.
///
/// Rows come back grouped by split in completion order. The first failing
/// split aborts the rest.
pub async fn execute_splits(
    work: Vec<(Split, ScanRequest)>,
    client: Arc<dyn KvClient>,
    page_size: usize,
) -> Result<Vec<Row>> {
    let split_count = work.len();
    let mut tasks = JoinSet::new();

    for (split, request) in work {
        let client = Arc::clone(&client);
        tasks.spawn(async move {
            let mut cursor = ScanCursor::open(&split, &request, client, page_size).await?;
            let mut rows = Vec::with_capacity(cursor.remaining());
            while let Some(page) = cursor.next_page() {
                rows.extend(page);
            }
            Ok::<_, CoreError>(rows)
        });
    }

    let mut rows = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let split_rows =
            joined.map_err(|err| CoreError::internal(format!("split task failed: {err}")))??;
        rows.extend(split_rows);
    }

    info!(splits = split_count, rows = rows.len(), "executed splits");
    Ok(rows)
}
