//! Read-only view of the host engine's pushed-down constraint.
//!
//! A [`TupleDomain`] maps columns to the values they may take. Domains of
//! different columns are conjunctive; the ranges inside one domain are
//! disjoint, sorted and disjunctive.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::value::{ColumnType, ScalarValue};

/// Column → allowed-value domain mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TupleDomain {
    domains: Option<BTreeMap<String, Domain>>,
}

impl TupleDomain {
    /// Constraint that admits every row.
    #[must_use]
    pub fn all() -> Self {
        Self {
            domains: Some(BTreeMap::new()),
        }
    }

    /// Constraint whose column domains are not available to the connector.
    #[must_use]
    pub const fn none() -> Self {
        Self { domains: None }
    }

    /// Adds (or replaces) the domain of `column`.
    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>, domain: Domain) -> Self {
        self.domains
            .get_or_insert_with(BTreeMap::new)
            .insert(column.into(), domain);
        self
    }

    pub const fn domains(&self) -> Option<&BTreeMap<String, Domain>> {
        self.domains.as_ref()
    }
}

/// Allowed values of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    pub column_type: ColumnType,
    pub values: DomainValues,
}

impl Domain {
    #[must_use]
    pub fn single(column_type: ColumnType, value: impl Into<ScalarValue>) -> Self {
        Self {
            column_type,
            values: DomainValues::Single(value.into()),
        }
    }

    #[must_use]
    pub fn ranges(column_type: ColumnType, ranges: Vec<ValueRange>) -> Self {
        Self {
            column_type,
            values: DomainValues::Ranges(ranges),
        }
    }

    /// `column IN (values...)`.
    #[must_use]
    pub fn in_values<V: Into<ScalarValue>>(
        column_type: ColumnType,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::ranges(
            column_type,
            values.into_iter().map(ValueRange::single).collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainValues {
    Single(ScalarValue),
    /// Ordered, non-overlapping ranges.
    Ranges(Vec<ValueRange>),
}

/// One contiguous range of a domain.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRange {
    pub low: Bound<ScalarValue>,
    pub high: Bound<ScalarValue>,
}

impl ValueRange {
    #[must_use]
    pub fn single(value: impl Into<ScalarValue>) -> Self {
        let value = value.into();
        Self {
            low: Bound::Included(value.clone()),
            high: Bound::Included(value),
        }
    }

    /// Inclusive `[low, high]`, as produced by `BETWEEN`.
    #[must_use]
    pub fn between(low: impl Into<ScalarValue>, high: impl Into<ScalarValue>) -> Self {
        Self {
            low: Bound::Included(low.into()),
            high: Bound::Included(high.into()),
        }
    }

    #[must_use]
    pub fn greater_than(value: impl Into<ScalarValue>) -> Self {
        Self {
            low: Bound::Excluded(value.into()),
            high: Bound::Unbounded,
        }
    }

    #[must_use]
    pub fn at_least(value: impl Into<ScalarValue>) -> Self {
        Self {
            low: Bound::Included(value.into()),
            high: Bound::Unbounded,
        }
    }

    #[must_use]
    pub fn less_than(value: impl Into<ScalarValue>) -> Self {
        Self {
            low: Bound::Unbounded,
            high: Bound::Excluded(value.into()),
        }
    }

    #[must_use]
    pub fn at_most(value: impl Into<ScalarValue>) -> Self {
        Self {
            low: Bound::Unbounded,
            high: Bound::Included(value.into()),
        }
    }

    #[must_use]
    pub const fn all() -> Self {
        Self {
            low: Bound::Unbounded,
            high: Bound::Unbounded,
        }
    }

    /// True when the range admits exactly one value.
    pub fn single_value(&self) -> Option<&ScalarValue> {
        match (&self.low, &self.high) {
            (Bound::Included(low), Bound::Included(high)) if low == high => Some(low),
            _ => None,
        }
    }
}
