//! In-memory key-value store for testing

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

use splitscan_core::{CoreError, KeyRange, RegionDescriptor, Row, ScanRequest, SnapshotAdmin};

use crate::client::KvClient;
use crate::error::Result;

#[derive(Debug, Default)]
struct TableData {
    rows: BTreeMap<Bytes, Row>,
    /// Sorted region boundaries; n points give n + 1 regions.
    split_points: Vec<Bytes>,
    /// Extra manifest entries reported by every snapshot of the table.
    stale_regions: Vec<RegionDescriptor>,
}

#[derive(Debug)]
struct SnapshotData {
    table: String,
    rows: BTreeMap<Bytes, Row>,
    regions: Vec<RegionDescriptor>,
}

#[derive(Debug, Default)]
struct StoreState {
    tables: HashMap<String, TableData>,
    snapshots: HashMap<String, SnapshotData>,
    snapshot_failures: u32,
}

/// In-memory key-value store (for testing)
///
/// Tables are addressed by `schema:table`. Filters run against the stored
/// row before column selection, as a region server evaluates them.
#[derive(Clone)]
pub struct MemoryKvStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    /// Creates an empty table; an existing table is left untouched.
    pub fn create_table(&self, table: &str) {
        self.state
            .write()
            .tables
            .entry(table.to_string())
            .or_default();
    }

    pub fn put_row(&self, table: &str, row: Row) {
        self.put_rows(table, std::iter::once(row));
    }

    pub fn put_rows(&self, table: &str, rows: impl IntoIterator<Item = Row>) {
        let mut state = self.state.write();
        let data = state.tables.entry(table.to_string()).or_default();
        for row in rows {
            data.rows.insert(row.key.clone(), row);
        }
    }

    /// Sets the region boundaries snapshots of `table` are cut at.
    pub fn set_split_points<K: Into<Bytes>>(&self, table: &str, points: impl IntoIterator<Item = K>) {
        let mut points: Vec<Bytes> = points
            .into_iter()
            .map(Into::into)
            .filter(|point| !point.is_empty())
            .collect();
        points.sort();
        points.dedup();

        let mut state = self.state.write();
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .split_points = points;
    }

    /// Adds a manifest entry that later snapshots of `table` report as is.
    pub fn add_stale_region(&self, table: &str, region: RegionDescriptor) {
        let mut state = self.state.write();
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .stale_regions
            .push(region);
    }

    /// Makes the next `count` snapshot attempts fail.
    pub fn fail_next_snapshots(&self, count: u32) {
        self.state.write().snapshot_failures = count;
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.state
            .read()
            .tables
            .get(table)
            .map_or(0, |data| data.rows.len())
    }

    pub fn snapshot_count(&self) -> usize {
        self.state.read().snapshots.len()
    }

    fn regions_for(table: &str, data: &TableData) -> Vec<RegionDescriptor> {
        let mut bounds = Vec::with_capacity(data.split_points.len() + 2);
        bounds.push(Bytes::new());
        bounds.extend(data.split_points.iter().cloned());
        bounds.push(Bytes::new());

        let mut regions: Vec<RegionDescriptor> = bounds
            .windows(2)
            .enumerate()
            .map(|(index, pair)| {
                RegionDescriptor::new(format!("{table}-r{index}"), pair[0].clone(), pair[1].clone())
            })
            .collect();
        regions.extend(data.stale_regions.iter().cloned());
        regions
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the request's filter and column selection to one stored row.
fn read_row(row: &Row, request: &ScanRequest) -> Option<Row> {
    match &request.filter {
        Some(filter) if !filter.matches(row) => None,
        Some(filter) if filter.is_key_only() => Some(row.first_cell_only()),
        _ => Some(row.project(&request.columns)),
    }
}

fn scan_rows(rows: &BTreeMap<Bytes, Row>, range: &KeyRange, request: &ScanRequest) -> Vec<Row> {
    rows.values()
        .filter(|row| range.contains(&row.key))
        .filter_map(|row| read_row(row, request))
        .collect()
}

fn table_not_found(table: &str) -> CoreError {
    CoreError::not_found("table", table)
}

impl SnapshotAdmin for MemoryKvStore {
    fn create_snapshot(&self, name: &str, schema: &str, table: &str) -> Result<()> {
        let qualified = format!("{schema}:{table}");
        let mut state = self.state.write();

        if state.snapshot_failures > 0 {
            state.snapshot_failures -= 1;
            debug!(snapshot = name, "injected snapshot failure");
            return Err(CoreError::StorageError(format!(
                "snapshot {name} of {qualified} failed"
            )));
        }

        if state.snapshots.contains_key(name) {
            return Err(CoreError::already_exists("snapshot", name));
        }

        let data = state
            .tables
            .get(&qualified)
            .ok_or_else(|| table_not_found(&qualified))?;
        let snapshot = SnapshotData {
            table: qualified.clone(),
            rows: data.rows.clone(),
            regions: Self::regions_for(&qualified, data),
        };

        info!(
            snapshot = name,
            table = %qualified,
            rows = snapshot.rows.len(),
            regions = snapshot.regions.len(),
            "created snapshot"
        );
        state.snapshots.insert(name.to_string(), snapshot);
        Ok(())
    }

    fn list_snapshot_regions(&self, name: &str) -> Result<Vec<RegionDescriptor>> {
        self.state
            .read()
            .snapshots
            .get(name)
            .map(|snapshot| snapshot.regions.clone())
            .ok_or_else(|| CoreError::not_found("snapshot", name))
    }
}

#[async_trait]
impl KvClient for MemoryKvStore {
    async fn multi_get(
        &self,
        table: &str,
        keys: &[Bytes],
        request: &ScanRequest,
    ) -> Result<Vec<Row>> {
        let state = self.state.read();
        let data = state.tables.get(table).ok_or_else(|| table_not_found(table))?;

        Ok(keys
            .iter()
            .filter_map(|key| data.rows.get(key))
            .filter_map(|row| read_row(row, request))
            .collect())
    }

    async fn scan(&self, table: &str, request: &ScanRequest) -> Result<Vec<Row>> {
        let state = self.state.read();
        let data = state.tables.get(table).ok_or_else(|| table_not_found(table))?;
        Ok(scan_rows(&data.rows, &request.range, request))
    }

    async fn scan_snapshot_region(
        &self,
        snapshot: &str,
        region: &RegionDescriptor,
        request: &ScanRequest,
    ) -> Result<Vec<Row>> {
        let state = self.state.read();
        let data = state
            .snapshots
            .get(snapshot)
            .ok_or_else(|| CoreError::not_found("snapshot", snapshot))?;

        let Some(range) = region.key_range().intersect(&request.range) else {
            return Ok(Vec::new());
        };
        debug!(snapshot, table = %data.table, region = %region.region_id, %range, "scanning snapshot region");
        Ok(scan_rows(&data.rows, &range, request))
    }

    async fn delete(&self, table: &str, keys: &[Bytes]) -> Result<usize> {
        let mut state = self.state.write();
        let data = state
            .tables
            .get_mut(table)
            .ok_or_else(|| table_not_found(table))?;

        Ok(keys
            .iter()
            .filter(|key| data.rows.remove(*key).is_some())
            .count())
    }
}
