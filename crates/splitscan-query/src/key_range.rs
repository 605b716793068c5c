//! Row-key interval planning for scan splits.
//!
//! Ranges are derived in three steps:
//! 1. equalities on the leading row-key components expand into prefixes
//! 2. prefixes are crossed with every salt value, unless that yields more
//!    than `max_split_count` ranges
//! 3. without prefixes, the salt alphabet is bucketed; without salt a single
//!    range is used
//!
//! Every range is finally narrowed to the hull of the row-key inequalities.

use bytes::Bytes;
use tracing::{debug, info, warn};

use splitscan_core::{
    key_successor, prefix_successor, CharRange, ColumnType, Condition, KeyRange, Operator,
    PlannerConfig, SaltSpec, TableMetaInfo,
};

use crate::prefix::{PrefixExpansion, PrefixExpander};
use crate::range_math;
use crate::Result;

/// Hull of the row-key inequality conditions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowKeyBounds {
    /// Inclusive lower bound.
    pub lower: Option<Bytes>,
    /// Exclusive upper bound.
    pub upper: Option<Bytes>,
}

impl RowKeyBounds {
    pub const fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    pub fn key_range(&self) -> KeyRange {
        KeyRange {
            start: self.lower.clone(),
            end: self.upper.clone(),
        }
    }

    /// First-byte window of the bounds, `None` when no key can satisfy them.
    pub fn first_byte_window(&self) -> Option<CharRange> {
        let start = self
            .lower
            .as_ref()
            .and_then(|key| key.first().copied())
            .unwrap_or(0);
        let end = match &self.upper {
            None => u8::MAX,
            Some(key) => *key.first()?,
        };
        (start <= end).then_some(CharRange { start, end })
    }
}

/// Computes the row-key hull from `conditions`.
///
/// Conditions are expected in extraction order, so that a lower bound on the
/// first range and an upper bound on the last range delimit the union of all
/// ranges. Non-text row keys and row-key equalities leave the hull open.
pub fn row_key_bounds(conditions: &[Condition], meta: &TableMetaInfo) -> RowKeyBounds {
    if meta.row_key_type() != ColumnType::Varchar {
        return RowKeyBounds::default();
    }

    let row_key: Vec<&Condition> = conditions
        .iter()
        .filter(|condition| condition.column == meta.row_key_column)
        .collect();
    if row_key.iter().any(|c| c.operator == Operator::Eq) {
        return RowKeyBounds::default();
    }

    let lower = match row_key.first() {
        Some(first) if first.operator.is_lower_bound() => row_key
            .iter()
            .filter(|c| c.operator.is_lower_bound())
            .map(|c| start_key(c))
            .min(),
        _ => None,
    };
    let upper = match row_key.last() {
        Some(last) if last.operator.is_upper_bound() => row_key
            .iter()
            .filter(|c| c.operator.is_upper_bound())
            .map(|c| end_key(c))
            .max(),
        _ => None,
    };

    RowKeyBounds { lower, upper }
}

/// True when [`row_key_bounds`] admits exactly the keys the row-key
/// conditions admit: no row-key conditions, or one interval over a text key.
pub fn row_key_bounds_exact(conditions: &[Condition], meta: &TableMetaInfo) -> bool {
    let row_key: Vec<&Condition> = conditions
        .iter()
        .filter(|condition| condition.column == meta.row_key_column)
        .collect();
    if row_key.is_empty() {
        return true;
    }
    if meta.row_key_type() != ColumnType::Varchar {
        return false;
    }

    match row_key.as_slice() {
        [only] => only.operator != Operator::Eq,
        [low, high] => low.operator.is_lower_bound() && high.operator.is_upper_bound(),
        _ => false,
    }
}

fn key_bytes(condition: &Condition) -> Bytes {
    Bytes::from(condition.value.to_key_text())
}

fn start_key(condition: &Condition) -> Bytes {
    let key = key_bytes(condition);
    match condition.operator {
        Operator::Gt => key_successor(&key),
        _ => key,
    }
}

fn end_key(condition: &Condition) -> Bytes {
    let key = key_bytes(condition);
    match condition.operator {
        Operator::Le => key_successor(&key),
        _ => key,
    }
}

/// Plans the row-key ranges of a scan over `meta`.
pub fn plan_key_ranges(
    conditions: &[Condition],
    meta: &TableMetaInfo,
    config: &PlannerConfig,
) -> Result<Vec<KeyRange>> {
    let bounds = row_key_bounds(conditions, meta);
    let expansion = expand_prefixes(conditions, meta, config);
    let separator = meta.row_key_format.separator.as_bytes();

    let ranges = match (&meta.salt, expansion.is_empty()) {
        (Some(salt), false) => {
            let planned = salt.alphabet_size().saturating_mul(expansion.len());
            if planned > config.max_split_count {
                info!(
                    table = %meta.qualified_name(),
                    planned,
                    max = config.max_split_count,
                    "too many salted prefix ranges, scanning salt buckets instead"
                );
                salt_bucket_ranges(salt, &bounds, config)?
            } else {
                salted_prefix_ranges(salt, &expansion, separator)
            }
        }
        (None, false) => expansion
            .prefixes
            .iter()
            .map(|prefix| prefix_range(prefix.as_bytes(), expansion.complete, separator))
            .collect(),
        (Some(salt), true) => salt_bucket_ranges(salt, &bounds, config)?,
        (None, true) => vec![KeyRange::unbounded()],
    };

    let exact = bounds.key_range();
    let ranges: Vec<KeyRange> = ranges
        .iter()
        .filter_map(|range| range.intersect(&exact))
        .collect();

    debug!(
        table = %meta.qualified_name(),
        prefixes = expansion.len(),
        ranges = ranges.len(),
        bounded = !bounds.is_unbounded(),
        "planned row key ranges"
    );
    Ok(ranges)
}

fn expand_prefixes(
    conditions: &[Condition],
    meta: &TableMetaInfo,
    config: &PlannerConfig,
) -> PrefixExpansion {
    if conditions.is_empty() || meta.row_key_format.is_empty() {
        return PrefixExpansion::default();
    }

    PrefixExpander::new(&meta.row_key_format, config.max_prefix_expansion)
        .expand(conditions)
        .unwrap_or_else(|overflow| {
            warn!(table = %meta.qualified_name(), error = %overflow, "planning without row key prefixes");
            PrefixExpansion::default()
        })
}

/// Range of the keys under `body`.
///
/// A partial prefix matches `body` followed by the separator. A complete key
/// matches itself and any key extending it past a separator.
fn prefix_range(body: &[u8], complete: bool, separator: &[u8]) -> KeyRange {
    let mut with_separator = Vec::with_capacity(body.len() + separator.len());
    with_separator.extend_from_slice(body);
    with_separator.extend_from_slice(separator);

    if complete {
        KeyRange {
            start: Some(Bytes::copy_from_slice(body)),
            end: prefix_successor(&with_separator),
        }
    } else {
        KeyRange::prefixed(&with_separator)
    }
}

fn salted_prefix_ranges(
    salt: &SaltSpec,
    expansion: &PrefixExpansion,
    separator: &[u8],
) -> Vec<KeyRange> {
    let mut ranges = Vec::with_capacity(expansion.len() * salt.alphabet_size());
    for prefix in &expansion.prefixes {
        for salt_byte in salt.values() {
            let mut body = Vec::with_capacity(1 + separator.len() + prefix.len());
            body.push(salt_byte);
            body.extend_from_slice(separator);
            body.extend_from_slice(prefix.as_bytes());
            ranges.push(prefix_range(&body, expansion.complete, separator));
        }
    }
    ranges
}

fn salt_bucket_ranges(
    salt: &SaltSpec,
    bounds: &RowKeyBounds,
    config: &PlannerConfig,
) -> Result<Vec<KeyRange>> {
    let buckets = range_math::partition(salt.ranges(), config.salt_bucket_count)?;
    let buckets = if bounds.is_unbounded() {
        buckets
    } else {
        match bounds.first_byte_window() {
            Some(window) => range_math::clip(&buckets, window),
            None => Vec::new(),
        }
    };

    Ok(buckets.into_iter().map(range_math::bucket_key_range).collect())
}
