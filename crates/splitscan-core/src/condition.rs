use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::value::{ColumnType, ScalarValue};

/// Comparison operator of a pushed-down condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Operator {
    /// True for `GT` and `GE`.
    pub const fn is_lower_bound(&self) -> bool {
        matches!(self, Self::Gt | Self::Ge)
    }

    /// True for `LT` and `LE`.
    pub const fn is_upper_bound(&self) -> bool {
        matches!(self, Self::Lt | Self::Le)
    }

    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

/// One `(column, operator, value)` predicate.
///
/// Conditions sharing a column are alternatives (OR); conditions on different
/// columns must all hold (AND).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    pub value: ScalarValue,
    pub value_type: ColumnType,
}

impl Condition {
    #[must_use]
    pub fn new(
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<ScalarValue>,
        value_type: ColumnType,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
            value_type,
        }
    }

    /// Shorthand for a `Varchar` equality condition.
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Self::new(column, Operator::Eq, value, ColumnType::Varchar)
    }

    /// True when this is an equality on `column`.
    pub fn is_eq_on(&self, column: &str) -> bool {
        self.operator == Operator::Eq && self.column == column
    }

    /// Returns a copy whose value matches `value_type`.
    pub fn coerced(&self) -> CoreResult<Self> {
        Ok(Self {
            column: self.column.clone(),
            operator: self.operator,
            value: self.value.coerce_to(&self.column, self.value_type)?,
            value_type: self.value_type,
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.operator.symbol(), self.value)
    }
}
