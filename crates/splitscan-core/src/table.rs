//! Table layout metadata: row-key composition, salt alphabet and columns.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::value::ColumnType;

/// Namespace used when a table has no explicit schema.
pub const DEFAULT_SCHEMA: &str = "default";

/// Separator placed between row-key components (and after the salt byte).
pub const DEFAULT_ROW_KEY_SEPARATOR: &str = "-";

/// Closed interval `[start, end]` over single-byte (ASCII) characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharRange {
    pub start: u8,
    pub end: u8,
}

impl CharRange {
    /// Creates a range, swapping the bounds if given in descending order.
    #[must_use]
    pub const fn new(a: u8, b: u8) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    #[must_use]
    pub const fn single(c: u8) -> Self {
        Self { start: c, end: c }
    }

    /// Parses `a-b`, `a~b` or a lone character `a`.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let trimmed = text.trim();
        let single_char = |part: &str| -> CoreResult<u8> {
            let bytes = part.as_bytes();
            if bytes.len() != 1 || !bytes[0].is_ascii() {
                return Err(CoreError::invalid_range(
                    text,
                    "bounds must be single ASCII characters",
                ));
            }
            Ok(bytes[0])
        };

        if trimmed.len() == 1 {
            return single_char(trimmed).map(Self::single);
        }

        let (low, high) = trimmed
            .split_once('~')
            .or_else(|| trimmed.split_once('-'))
            .ok_or_else(|| CoreError::invalid_range(text, "expected `start-end`"))?;

        Ok(Self::new(single_char(low)?, single_char(high)?))
    }

    /// Number of characters covered.
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start) as usize + 1
    }

    /// Always false; a range covers at least one character.
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for CharRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start as char, self.end as char)
    }
}

/// Alphabet of the one-byte salt prefix, e.g. `0-9,A-F`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SaltSpec {
    ranges: Vec<CharRange>,
}

impl SaltSpec {
    /// Parses a comma-separated list of character ranges.
    ///
    /// Ranges must not overlap, otherwise salted scans would visit rows twice.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let ranges = text
            .split(',')
            .map(CharRange::parse)
            .collect::<CoreResult<Vec<_>>>()?;
        Self::from_ranges(ranges).map_err(|err| match err {
            CoreError::InvalidRange { message, .. } => CoreError::invalid_range(text, message),
            other => other,
        })
    }

    pub fn from_ranges(ranges: Vec<CharRange>) -> CoreResult<Self> {
        if ranges.is_empty() {
            return Err(CoreError::invalid_range("", "salt alphabet is empty"));
        }

        let mut sorted = ranges.clone();
        sorted.sort();
        for pair in sorted.windows(2) {
            if pair[1].start <= pair[0].end {
                return Err(CoreError::invalid_range(
                    format!("{},{}", pair[0], pair[1]),
                    "salt ranges overlap",
                ));
            }
        }

        Ok(Self { ranges })
    }

    /// Ranges in declaration order.
    #[must_use]
    pub fn ranges(&self) -> &[CharRange] {
        &self.ranges
    }

    /// Total number of salt values.
    pub fn alphabet_size(&self) -> usize {
        self.ranges.iter().map(CharRange::len).sum()
    }

    /// Every salt value, in declaration order.
    pub fn values(&self) -> impl Iterator<Item = u8> + '_ {
        self.ranges.iter().flat_map(|range| range.start..=range.end)
    }
}

impl fmt::Display for SaltSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(","))
    }
}

impl TryFrom<String> for SaltSpec {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SaltSpec> for String {
    fn from(value: SaltSpec) -> Self {
        value.to_string()
    }
}

/// Ordered list of columns concatenated into the physical row key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowKeyFormat {
    pub components: Vec<String>,
    pub separator: String,
}

impl RowKeyFormat {
    #[must_use]
    pub fn new<S: Into<String>>(components: impl IntoIterator<Item = S>) -> Self {
        Self {
            components: components.into_iter().map(Into::into).collect(),
            separator: DEFAULT_ROW_KEY_SEPARATOR.to_string(),
        }
    }

    /// Parses a comma-separated component list; blank input yields no components.
    #[must_use]
    pub fn parse(format: &str, separator: &str) -> Self {
        Self {
            components: format
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
            separator: separator.to_string(),
        }
    }

    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl Default for RowKeyFormat {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

/// Column descriptor: family, qualifier and declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub family: String,
    pub name: String,
    pub column_type: ColumnType,
    pub is_row_key: bool,
}

impl ColumnMeta {
    #[must_use]
    pub fn new(family: impl Into<String>, name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            family: family.into(),
            name: name.into(),
            column_type,
            is_row_key: false,
        }
    }

    #[must_use]
    pub fn row_key(name: impl Into<String>) -> Self {
        Self {
            family: String::new(),
            name: name.into(),
            column_type: ColumnType::Varchar,
            is_row_key: true,
        }
    }
}

/// Everything the planner knows about a table's physical layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetaInfo {
    pub schema: String,
    pub table: String,
    pub row_key_column: String,
    #[serde(default)]
    pub row_key_format: RowKeyFormat,
    #[serde(default)]
    pub salt: Option<SaltSpec>,
    #[serde(default)]
    pub columns: Vec<ColumnMeta>,
}

impl TableMetaInfo {
    #[must_use]
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        row_key_column: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            row_key_column: row_key_column.into(),
            row_key_format: RowKeyFormat::default(),
            salt: None,
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: RowKeyFormat) -> Self {
        self.row_key_format = format;
        self
    }

    #[must_use]
    pub fn with_salt(mut self, salt: SaltSpec) -> Self {
        self.salt = Some(salt);
        self
    }

    #[must_use]
    pub fn with_column(mut self, column: ColumnMeta) -> Self {
        self.columns.push(column);
        self
    }

    /// `schema:table`, the form used by allow-lists and the store.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.schema, self.table)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn family_of(&self, name: &str) -> Option<&str> {
        self.column(name).map(|column| column.family.as_str())
    }

    /// Declared type of the row-key column, `Varchar` when undeclared.
    pub fn row_key_type(&self) -> ColumnType {
        self.column(&self.row_key_column)
            .map_or(ColumnType::Varchar, |column| column.column_type)
    }

    /// Rejects metadata the planner cannot reason about.
    pub fn validate(&self) -> CoreResult<()> {
        let table = self.qualified_name();

        if self.table.trim().is_empty() {
            return Err(CoreError::invalid_table_meta(table, "table name is empty"));
        }

        if self.row_key_column.trim().is_empty() {
            return Err(CoreError::invalid_table_meta(
                table,
                "row key column is not specified",
            ));
        }

        if !self.columns.is_empty() {
            let row_keys: Vec<&ColumnMeta> =
                self.columns.iter().filter(|column| column.is_row_key).collect();
            match row_keys.as_slice() {
                [only] if only.name == self.row_key_column => {}
                [] => {
                    return Err(CoreError::invalid_table_meta(
                        table,
                        "no column is flagged as the row key",
                    ))
                }
                [only] => {
                    return Err(CoreError::invalid_table_meta(
                        table,
                        format!(
                            "row key column `{}` does not match flagged column `{}`",
                            self.row_key_column, only.name
                        ),
                    ))
                }
                _ => {
                    return Err(CoreError::invalid_table_meta(
                        table,
                        "more than one column is flagged as the row key",
                    ))
                }
            }
        }

        let needs_separator = self.row_key_format.components.len() > 1 || self.salt.is_some();
        if needs_separator && self.row_key_format.separator.is_empty() {
            return Err(CoreError::invalid_table_meta(
                table,
                "row key separator must not be empty",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_range_parse() {
        assert_eq!(CharRange::parse("0-9").unwrap(), CharRange::new(b'0', b'9'));
        assert_eq!(CharRange::parse("a~f").unwrap(), CharRange::new(b'a', b'f'));
        assert_eq!(CharRange::parse(" Z ").unwrap(), CharRange::single(b'Z'));
        // descending input is normalized
        assert_eq!(CharRange::parse("9-0").unwrap(), CharRange::new(b'0', b'9'));
        assert_eq!(CharRange::parse("0-9").unwrap().len(), 10);
    }

    #[test]
    fn test_char_range_parse_errors() {
        assert!(CharRange::parse("").is_err());
        assert!(CharRange::parse("09").is_err());
        assert!(CharRange::parse("00-99").is_err());
        assert!(CharRange::parse("é-z").is_err());
    }

    #[test]
    fn test_salt_spec() {
        let salt = SaltSpec::parse("0-9,A-F").unwrap();
        assert_eq!(salt.alphabet_size(), 16);
        assert_eq!(salt.values().next(), Some(b'0'));
        assert_eq!(salt.values().last(), Some(b'F'));
        assert_eq!(salt.to_string(), "0-9,A-F");
    }

    #[test]
    fn test_salt_spec_rejects_overlap() {
        let err = SaltSpec::parse("0-9,5-A").unwrap_err();
        assert!(err.is_configuration());
        assert!(SaltSpec::parse("0-9,,A-F").is_err());
    }

    #[test]
    fn test_salt_spec_serde_as_string() {
        let salt = SaltSpec::parse("a-f").unwrap();
        let json = serde_json::to_string(&salt).unwrap();
        assert_eq!(json, "\"a-f\"");
        let back: SaltSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, salt);
        assert!(serde_json::from_str::<SaltSpec>("\"abc\"").is_err());
    }

    #[test]
    fn test_row_key_format_parse() {
        let format = RowKeyFormat::parse("region, userId,", "-");
        assert_eq!(format.components, vec!["region", "userId"]);
        assert!(RowKeyFormat::parse("  ", "-").is_empty());
    }

    #[test]
    fn test_validate() {
        let meta = TableMetaInfo::new("s", "t", "rowkey")
            .with_column(ColumnMeta::row_key("rowkey"))
            .with_column(ColumnMeta::new("f", "age", ColumnType::Integer));
        assert!(meta.validate().is_ok());
        assert_eq!(meta.family_of("age"), Some("f"));
        assert_eq!(meta.row_key_type(), ColumnType::Varchar);

        let missing = TableMetaInfo::new("s", "t", "");
        assert!(matches!(
            missing.validate(),
            Err(CoreError::InvalidTableMeta { .. })
        ));

        let mismatched = TableMetaInfo::new("s", "t", "rowkey")
            .with_column(ColumnMeta::row_key("id"));
        assert!(mismatched.validate().is_err());

        let no_separator = TableMetaInfo::new("s", "t", "rowkey")
            .with_format(RowKeyFormat::new(["a", "b"]).with_separator(""));
        assert!(no_separator.validate().is_err());
    }
}
