//! Compilation of residual conditions into a server-side [`ScanFilter`].

use std::collections::BTreeMap;

use bytes::Bytes;

use splitscan_core::{
    ColumnValueFilter, CompareOp, Condition, RowKeyFilter, ScanFilter, TableMetaInfo,
};

/// Builds the filter for a scan projecting `projection` under `conditions`.
///
/// When `row_key_encoded` is set the split's key range or key list already
/// admits exactly the rows the row-key conditions admit, and they are left
/// out. Otherwise they become row-key comparisons, one interval per range.
///
/// A projection of only the row key yields `FirstKeyOnly`, ANDed with the
/// row-key comparisons if any. Otherwise value conditions are grouped by
/// column: one group is an OR of its conditions, and the groups are ANDed.
///
/// A value group is left out when any of its values fails coercion or its
/// column is unknown. The filter then admits a superset of the matching
/// rows, which the engine narrows again.
pub fn build_scan_filter(
    meta: &TableMetaInfo,
    conditions: &[Condition],
    projection: &[String],
    row_key_encoded: bool,
) -> Option<ScanFilter> {
    let row_key = if row_key_encoded {
        None
    } else {
        let row_key_conditions: Vec<&Condition> = conditions
            .iter()
            .filter(|condition| condition.column == meta.row_key_column)
            .collect();
        row_key_group(&row_key_conditions)
    };

    if matches!(projection, [only] if *only == meta.row_key_column) {
        return Some(match row_key {
            Some(group) => ScanFilter::AllOf(vec![ScanFilter::FirstKeyOnly, group]),
            None => ScanFilter::FirstKeyOnly,
        });
    }

    let mut by_column: BTreeMap<&str, Vec<&Condition>> = BTreeMap::new();
    for condition in conditions
        .iter()
        .filter(|condition| condition.column != meta.row_key_column)
    {
        by_column
            .entry(condition.column.as_str())
            .or_default()
            .push(condition);
    }

    let groups: Vec<ScanFilter> = row_key
        .into_iter()
        .chain(
            by_column
                .into_iter()
                .filter_map(|(column, group)| column_group(meta, column, &group)),
        )
        .collect();

    if groups.is_empty() {
        None
    } else {
        Some(ScanFilter::AllOf(groups))
    }
}

/// ORs the row-key intervals. Conditions come in extraction order, where a
/// lower bound directly followed by an upper bound is one range.
fn row_key_group(conditions: &[&Condition]) -> Option<ScanFilter> {
    let mut intervals = Vec::new();
    let mut open_low: Option<ScanFilter> = None;

    for condition in conditions {
        let leaf = ScanFilter::RowKey(RowKeyFilter::new(
            CompareOp::from(condition.operator),
            Bytes::from(condition.value.to_key_text()),
        ));
        if condition.operator.is_upper_bound() {
            intervals.push(match open_low.take() {
                Some(low) => ScanFilter::AllOf(vec![low, leaf]),
                None => leaf,
            });
            continue;
        }

        intervals.extend(open_low.take());
        if condition.operator.is_lower_bound() {
            open_low = Some(leaf);
        } else {
            intervals.push(leaf);
        }
    }
    intervals.extend(open_low);

    match intervals.len() {
        0 => None,
        1 => intervals.pop(),
        _ => Some(ScanFilter::AnyOf(intervals)),
    }
}

fn column_group(meta: &TableMetaInfo, column: &str, group: &[&Condition]) -> Option<ScanFilter> {
    let Some(family) = meta.family_of(column) else {
        tracing::warn!(table = %meta.qualified_name(), column, "no column family for condition, not pushed down");
        return None;
    };

    let mut leaves = Vec::with_capacity(group.len());
    for condition in group {
        let coerced = match condition.coerced() {
            Ok(coerced) => coerced,
            Err(err) => {
                tracing::warn!(column, error = %err, "condition group not pushed down");
                return None;
            }
        };
        leaves.push(ScanFilter::Column(ColumnValueFilter::new(
            family,
            column,
            CompareOp::from(coerced.operator),
            coerced.value.to_bytes(),
        )));
    }

    match leaves.len() {
        0 => None,
        1 => leaves.pop(),
        _ => Some(ScanFilter::AnyOf(leaves)),
    }
}
