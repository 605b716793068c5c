use crate::error::CoreResult;
use crate::split::RegionDescriptor;
use crate::table::TableMetaInfo;

/// Source of table layout metadata.
pub trait TableMetaStore: Send + Sync {
    /// Loads and validates the metadata of `schema.table`.
    ///
    /// A missing table is `NotFound`; unusable metadata is `InvalidTableMeta`.
    fn load_table_meta(&self, schema: &str, table: &str) -> CoreResult<TableMetaInfo>;
}

/// Snapshot administration on the key-value store. Calls block the caller.
pub trait SnapshotAdmin: Send + Sync {
    /// Takes a snapshot named `name` of `schema:table`.
    fn create_snapshot(&self, name: &str, schema: &str, table: &str) -> CoreResult<()>;

    /// Lists every region recorded in the snapshot manifest, stale ones included.
    fn list_snapshot_regions(&self, name: &str) -> CoreResult<Vec<RegionDescriptor>>;
}
