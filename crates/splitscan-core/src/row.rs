use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// `family:qualifier` address of a cell within a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub family: String,
    pub qualifier: String,
}

impl CellKey {
    #[must_use]
    pub fn new(family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
        }
    }
}

/// A stored row: its key plus the latest value of each cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub key: Bytes,
    pub cells: BTreeMap<CellKey, Bytes>,
}

impl Row {
    #[must_use]
    pub fn new(key: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            cells: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_cell(
        mut self,
        family: impl Into<String>,
        qualifier: impl Into<String>,
        value: impl Into<Bytes>,
    ) -> Self {
        self.cells
            .insert(CellKey::new(family, qualifier), value.into());
        self
    }

    pub fn cell(&self, family: &str, qualifier: &str) -> Option<&Bytes> {
        self.cells
            .iter()
            .find(|(key, _)| key.family == family && key.qualifier == qualifier)
            .map(|(_, value)| value)
    }

    /// Copy restricted to `columns`; an empty list keeps every cell.
    pub fn project(&self, columns: &[CellKey]) -> Self {
        if columns.is_empty() {
            return self.clone();
        }
        Self {
            key: self.key.clone(),
            cells: self
                .cells
                .iter()
                .filter(|(key, _)| columns.contains(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }

    /// Copy keeping only the first cell, as a first-key-only scan returns it.
    pub fn first_cell_only(&self) -> Self {
        Self {
            key: self.key.clone(),
            cells: self
                .cells
                .iter()
                .take(1)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }
}
