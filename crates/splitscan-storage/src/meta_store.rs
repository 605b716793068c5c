//! Table metadata loaded from per-table JSON files.

use serde::Deserialize;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

use splitscan_core::{
    ColumnMeta, ColumnType, CoreError, RowKeyFormat, SaltSpec, TableMetaInfo, TableMetaStore,
    DEFAULT_ROW_KEY_SEPARATOR, DEFAULT_SCHEMA,
};

use crate::error::Result;

/// On-disk layout of a table metadata file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTableMeta {
    #[serde(default)]
    schema_name: Option<String>,
    #[serde(default)]
    table_name: Option<String>,
    #[serde(default)]
    row_key_col_name: String,
    #[serde(default)]
    row_key_format: String,
    #[serde(default)]
    row_key_separator: Option<String>,
    #[serde(default)]
    row_key_first_char_range: Option<String>,
    #[serde(default)]
    columns: Vec<RawColumn>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawColumn {
    #[serde(default)]
    family: String,
    column_name: String,
    #[serde(rename = "type", default)]
    column_type: Option<String>,
    #[serde(default)]
    is_row_key: bool,
}

impl RawTableMeta {
    fn into_meta(self, schema: &str, table: &str) -> Result<TableMetaInfo> {
        let schema = self.schema_name.unwrap_or_else(|| schema.to_string());
        let table = self.table_name.unwrap_or_else(|| table.to_string());
        let qualified = format!("{schema}:{table}");

        let separator = self
            .row_key_separator
            .filter(|separator| !separator.is_empty())
            .unwrap_or_else(|| DEFAULT_ROW_KEY_SEPARATOR.to_string());

        let salt = match self.row_key_first_char_range.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Some(SaltSpec::parse(text).map_err(|err| {
                CoreError::invalid_table_meta(&qualified, format!("rowKeyFirstCharRange: {err}"))
            })?),
            _ => None,
        };

        let mut meta = TableMetaInfo::new(schema, table, self.row_key_col_name)
            .with_format(RowKeyFormat::parse(&self.row_key_format, &separator));
        meta.salt = salt;
        meta.columns = self
            .columns
            .into_iter()
            .map(|column| ColumnMeta {
                family: column.family,
                name: column.column_name,
                column_type: ColumnType::from_meta_name(column.column_type.as_deref()),
                is_row_key: column.is_row_key,
            })
            .collect();

        meta.validate()?;
        Ok(meta)
    }
}

/// Reads `<meta_dir>/<schema>/<table>.json`.
///
/// An empty schema resolves to `default`. Files are read on every call.
#[derive(Debug, Clone)]
pub struct JsonTableMetaStore {
    meta_dir: PathBuf,
}

impl JsonTableMetaStore {
    pub fn new(meta_dir: impl Into<PathBuf>) -> Self {
        Self {
            meta_dir: meta_dir.into(),
        }
    }

    fn meta_path(&self, schema: &str, table: &str) -> PathBuf {
        let schema = if schema.is_empty() { DEFAULT_SCHEMA } else { schema };
        self.meta_dir.join(schema).join(format!("{table}.json"))
    }
}

impl TableMetaStore for JsonTableMetaStore {
    fn load_table_meta(&self, schema: &str, table: &str) -> Result<TableMetaInfo> {
        let schema = if schema.is_empty() { DEFAULT_SCHEMA } else { schema };
        let qualified = format!("{schema}:{table}");
        let path = self.meta_path(schema, table);

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(CoreError::not_found("table meta", qualified));
            }
            Err(err) => return Err(err.into()),
        };

        let raw: RawTableMeta = serde_json::from_str(&text).map_err(|err| {
            CoreError::invalid_table_meta(&qualified, format!("{}: {err}", path.display()))
        })?;

        let meta = raw.into_meta(schema, table)?;
        debug!(
            table = %qualified,
            path = %path.display(),
            columns = meta.columns.len(),
            salted = meta.salt.is_some(),
            "loaded table meta"
        );
        Ok(meta)
    }
}
