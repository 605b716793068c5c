//! Consumer side of split planning: the key-value client seam, an in-memory
//! store, JSON table metadata and the cursor that reads a split.

pub mod client;
pub mod cursor;
pub mod error;
pub mod memory;
pub mod meta_store;

pub use client::KvClient;
pub use cursor::{execute_splits, ScanCursor};
pub use error::{Error, Result};
pub use memory::MemoryKvStore;
pub use meta_store::JsonTableMetaStore;
