//! Server-side filter programs attached to scans.
//!
//! Evaluation mirrors what the region server does: cell values are compared
//! as raw bytes, and a row missing the compared cell is dropped.

use std::cmp::Ordering;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::condition::Operator;
use crate::row::Row;

/// Byte comparison operator of a column-value filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Equal,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl CompareOp {
    /// True when `ordering` (cell value compared to the operand) satisfies the operator.
    pub const fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Self::Equal => matches!(ordering, Ordering::Equal),
            Self::Greater => matches!(ordering, Ordering::Greater),
            Self::GreaterOrEqual => !matches!(ordering, Ordering::Less),
            Self::Less => matches!(ordering, Ordering::Less),
            Self::LessOrEqual => !matches!(ordering, Ordering::Greater),
        }
    }
}

impl From<Operator> for CompareOp {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Eq => Self::Equal,
            Operator::Gt => Self::Greater,
            Operator::Ge => Self::GreaterOrEqual,
            Operator::Lt => Self::Less,
            Operator::Le => Self::LessOrEqual,
        }
    }
}

/// Compares one cell against a constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnValueFilter {
    pub family: String,
    pub qualifier: String,
    pub op: CompareOp,
    pub value: Bytes,
    /// Drop rows that do not have the cell at all.
    pub filter_if_missing: bool,
}

impl ColumnValueFilter {
    #[must_use]
    pub fn new(
        family: impl Into<String>,
        qualifier: impl Into<String>,
        op: CompareOp,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
            op,
            value: value.into(),
            filter_if_missing: true,
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        row.cell(&self.family, &self.qualifier).map_or(!self.filter_if_missing, |cell| {
            self.op.accepts(cell.as_ref().cmp(self.value.as_ref()))
        })
    }
}

/// Compares the row key against a constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowKeyFilter {
    pub op: CompareOp,
    pub value: Bytes,
}

impl RowKeyFilter {
    #[must_use]
    pub fn new(op: CompareOp, value: impl Into<Bytes>) -> Self {
        Self {
            op,
            value: value.into(),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.op.accepts(row.key.as_ref().cmp(self.value.as_ref()))
    }
}

/// Filter tree evaluated per row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "snake_case")]
pub enum ScanFilter {
    /// Return only the first cell of each row; used for key-only projections.
    FirstKeyOnly,
    Column(ColumnValueFilter),
    RowKey(RowKeyFilter),
    /// Passes when any child passes.
    AnyOf(Vec<ScanFilter>),
    /// Passes when every child passes.
    AllOf(Vec<ScanFilter>),
}

impl ScanFilter {
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::FirstKeyOnly => true,
            Self::Column(filter) => filter.matches(row),
            Self::RowKey(filter) => filter.matches(row),
            Self::AnyOf(children) => children.iter().any(|child| child.matches(row)),
            Self::AllOf(children) => children.iter().all(|child| child.matches(row)),
        }
    }

    /// True when matching rows are cut down to their first cell, either by a
    /// top-level `FirstKeyOnly` or one ANDed directly under the root.
    pub fn is_key_only(&self) -> bool {
        match self {
            Self::FirstKeyOnly => true,
            Self::AllOf(children) => children.iter().any(|child| matches!(child, Self::FirstKeyOnly)),
            _ => false,
        }
    }

    /// Number of leaf comparisons in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::FirstKeyOnly | Self::Column(_) | Self::RowKey(_) => 1,
            Self::AnyOf(children) | Self::AllOf(children) => {
                children.iter().map(Self::leaf_count).sum()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ScalarValue;

    fn person(age: i32, city: &str) -> Row {
        Row::new(&b"US-1"[..])
            .with_cell("f", "age", ScalarValue::Integer(age).to_bytes())
            .with_cell("f", "city", ScalarValue::from(city).to_bytes())
    }

    fn age(op: CompareOp, value: i32) -> ScanFilter {
        ScanFilter::Column(ColumnValueFilter::new(
            "f",
            "age",
            op,
            ScalarValue::Integer(value).to_bytes(),
        ))
    }

    #[test]
    fn test_operator_mapping() {
        assert_eq!(CompareOp::from(Operator::Eq), CompareOp::Equal);
        assert_eq!(CompareOp::from(Operator::Ge), CompareOp::GreaterOrEqual);
        assert_eq!(CompareOp::from(Operator::Lt), CompareOp::Less);
    }

    #[test]
    fn test_column_filter() {
        let row = person(40, "NY");
        assert!(age(CompareOp::Greater, 30).matches(&row));
        assert!(!age(CompareOp::Less, 30).matches(&row));
        assert!(age(CompareOp::LessOrEqual, 40).matches(&row));
        assert!(age(CompareOp::Equal, 40).matches(&row));
    }

    #[test]
    fn test_missing_cell_is_filtered() {
        let row = Row::new(&b"US-2"[..]).with_cell("f", "city", &b"NY"[..]);
        assert!(!age(CompareOp::Greater, 0).matches(&row));

        let mut lenient = ColumnValueFilter::new("f", "age", CompareOp::Greater, &b"x"[..]);
        lenient.filter_if_missing = false;
        assert!(lenient.matches(&row));
    }

    #[test]
    fn test_tree() {
        let city = ScanFilter::Column(ColumnValueFilter::new(
            "f",
            "city",
            CompareOp::Equal,
            &b"NY"[..],
        ));
        let filter = ScanFilter::AllOf(vec![
            ScanFilter::AnyOf(vec![age(CompareOp::Greater, 60), age(CompareOp::Less, 20)]),
            city,
        ]);
        assert_eq!(filter.leaf_count(), 3);
        assert!(filter.matches(&person(70, "NY")));
        assert!(filter.matches(&person(10, "NY")));
        assert!(!filter.matches(&person(40, "NY")));
        assert!(!filter.matches(&person(70, "LA")));
        assert!(ScanFilter::FirstKeyOnly.matches(&person(1, "x")));
    }

    #[test]
    fn test_row_key_filter() {
        let at_least_b = ScanFilter::RowKey(RowKeyFilter::new(CompareOp::GreaterOrEqual, &b"b"[..]));
        let at_most_c = ScanFilter::RowKey(RowKeyFilter::new(CompareOp::LessOrEqual, &b"c"[..]));
        let between = ScanFilter::AllOf(vec![at_least_b, at_most_c]);

        for (key, expected) in [("a", false), ("b", true), ("bz", true), ("c", true), ("ca", false)] {
            assert_eq!(between.matches(&Row::new(key.as_bytes().to_vec())), expected, "key {key}");
        }
    }

    #[test]
    fn test_key_only_under_and() {
        let key = ScanFilter::RowKey(RowKeyFilter::new(CompareOp::Less, &b"m"[..]));
        assert!(ScanFilter::FirstKeyOnly.is_key_only());
        assert!(ScanFilter::AllOf(vec![ScanFilter::FirstKeyOnly, key.clone()]).is_key_only());
        assert!(!ScanFilter::AnyOf(vec![ScanFilter::FirstKeyOnly, key.clone()]).is_key_only());
        assert!(!key.is_key_only());
    }
}
