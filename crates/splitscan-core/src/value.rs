//! Column types and typed scalar values carried by query conditions.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Semantic type of a table column as declared in table metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    #[default]
    Varchar,
    Integer,
    Bigint,
    Double,
    Boolean,
    /// Milliseconds since the Unix epoch.
    Timestamp,
    /// Fixed-point number kept in its textual form.
    Decimal,
    /// `array<string>` stored as one delimited cell.
    VarcharArray,
}

impl ColumnType {
    /// Maps a metadata type name onto a column type.
    ///
    /// Unknown or missing names fall back to `Varchar`.
    #[must_use]
    pub fn from_meta_name(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return Self::Varchar;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "int" => Self::Integer,
            "bigint" => Self::Bigint,
            "double" => Self::Double,
            "boolean" => Self::Boolean,
            "array<string>" => Self::VarcharArray,
            "timestamp" | "datetime" => Self::Timestamp,
            "number" => Self::Decimal,
            _ => Self::Varchar,
        }
    }

    /// Returns the canonical lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Varchar => "varchar",
            Self::Integer => "integer",
            Self::Bigint => "bigint",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Decimal => "decimal",
            Self::VarcharArray => "array<varchar>",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed scalar as delivered by the host engine's predicate pushdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ScalarValue {
    Varchar(String),
    Integer(i32),
    Bigint(i64),
    Double(f64),
    Boolean(bool),
    Timestamp(i64),
}

impl ScalarValue {
    /// Converts this value to the representation expected for `target`.
    ///
    /// Text is parsed for numeric columns and integers are widened or narrowed
    /// as needed. Anything else is returned unchanged.
    pub fn coerce_to(&self, column: &str, target: ColumnType) -> CoreResult<Self> {
        let fail = || CoreError::Coercion {
            column: column.to_string(),
            value: self.to_string(),
            target: target.as_str(),
        };

        match (self, target) {
            (Self::Varchar(text), ColumnType::Integer) => {
                text.trim().parse().map(Self::Integer).map_err(|_| fail())
            }
            (Self::Varchar(text), ColumnType::Bigint) => {
                text.trim().parse().map(Self::Bigint).map_err(|_| fail())
            }
            (Self::Varchar(text), ColumnType::Double) => {
                text.trim().parse().map(Self::Double).map_err(|_| fail())
            }
            (Self::Bigint(v), ColumnType::Integer) => {
                i32::try_from(*v).map(Self::Integer).map_err(|_| fail())
            }
            (Self::Integer(v), ColumnType::Bigint) => Ok(Self::Bigint(i64::from(*v))),
            (Self::Integer(v), ColumnType::Double) => Ok(Self::Double(f64::from(*v))),
            #[allow(clippy::cast_precision_loss)]
            (Self::Bigint(v), ColumnType::Double) => Ok(Self::Double(*v as f64)),
            _ => Ok(self.clone()),
        }
    }

    /// Encodes the value the way the store persists cells (big-endian numerics,
    /// UTF-8 text).
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Varchar(text) => Bytes::copy_from_slice(text.as_bytes()),
            Self::Integer(v) => Bytes::copy_from_slice(&v.to_be_bytes()),
            Self::Bigint(v) | Self::Timestamp(v) => Bytes::copy_from_slice(&v.to_be_bytes()),
            Self::Double(v) => Bytes::copy_from_slice(&v.to_bits().to_be_bytes()),
            Self::Boolean(v) => Bytes::copy_from_slice(&[u8::from(*v)]),
        }
    }

    /// Renders the value as row-key text.
    pub fn to_key_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Varchar(text) => f.write_str(text),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Bigint(v) | Self::Timestamp(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::Varchar(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        Self::Varchar(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        Self::Integer(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Bigint(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}
