//! Lowering a planned split to the request sent to the store.

use bytes::Bytes;

use splitscan_core::{
    CellKey, CoreError, KeyRange, Operator, ScanConfig, ScanRequest, ScanUnit, Split,
    TableMetaInfo,
};

use crate::filter::build_scan_filter;
use crate::key_range::{row_key_bounds, row_key_bounds_exact};
use crate::Result;

/// Compiles `split` into the request a reader sends to the store.
///
/// The projected row key is not fetched as a cell. Every other projected
/// column must be known to `meta`. Region scans are narrowed to the row-key
/// hull; row-key conditions the scan range or key list does not capture
/// exactly are compiled into the filter.
pub fn build_scan_request(
    split: &Split,
    projection: &[String],
    meta: &TableMetaInfo,
    scan: &ScanConfig,
) -> Result<ScanRequest> {
    let columns = projection
        .iter()
        .filter(|name| **name != split.row_key_column)
        .map(|name| {
            meta.family_of(name)
                .map(|family| CellKey::new(family, name.as_str()))
                .ok_or_else(|| CoreError::not_found("column", format!("{}.{name}", meta.qualified_name())))
        })
        .collect::<Result<Vec<_>>>()?;

    let (range, row_key_encoded) = match &split.unit {
        ScanUnit::KeyRange { range } => {
            (range.clone(), row_key_bounds_exact(&split.conditions, meta))
        }
        ScanUnit::RegionLocal { region, .. } => {
            let hull = row_key_bounds(&split.conditions, meta).key_range();
            let range = region
                .key_range()
                .intersect(&hull)
                // empty start and end: matches no key
                .unwrap_or_else(|| KeyRange::new(Bytes::new(), Bytes::new()));
            (range, row_key_bounds_exact(&split.conditions, meta))
        }
        ScanUnit::BatchGet { .. } => {
            let only_equalities = split
                .conditions
                .iter()
                .filter(|condition| condition.column == split.row_key_column)
                .all(|condition| condition.operator == Operator::Eq);
            (KeyRange::unbounded(), only_equalities)
        }
    };

    let filter = build_scan_filter(meta, &split.conditions, projection, row_key_encoded);

    Ok(ScanRequest::new(range)
        .with_columns(columns)
        .with_filter(filter)
        .with_caching(scan.caching))
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitscan_core::{ColumnMeta, ColumnType, Condition, RegionDescriptor, Row, ScanFilter};

    fn meta() -> TableMetaInfo {
        TableMetaInfo::new("default", "people", "rowkey")
            .with_column(ColumnMeta::row_key("rowkey"))
            .with_column(ColumnMeta::new("f", "age", ColumnType::Integer))
            .with_column(ColumnMeta::new("g", "city", ColumnType::Varchar))
    }

    fn split(unit: ScanUnit) -> Split {
        Split {
            schema: "default".to_string(),
            table: "people".to_string(),
            row_key_column: "rowkey".to_string(),
            host_hints: Vec::new(),
            conditions: vec![
                Condition::new("rowkey", Operator::Ge, "a", ColumnType::Varchar),
                Condition::eq("city", "NY"),
            ],
            unit,
        }
    }

    fn names(columns: &[&str]) -> Vec<String> {
        columns.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_key_range_request() {
        let range = KeyRange::prefixed(b"US-");
        let request = build_scan_request(
            &split(ScanUnit::KeyRange { range: range.clone() }),
            &names(&["rowkey", "age", "city"]),
            &meta(),
            &ScanConfig::default(),
        )
        .unwrap();

        assert_eq!(request.range, range);
        assert_eq!(
            request.columns,
            vec![CellKey::new("f", "age"), CellKey::new("g", "city")]
        );
        assert_eq!(request.caching, 10_000);
        // the row-key condition is not part of the filter
        assert_eq!(request.filter.as_ref().map(ScanFilter::leaf_count), Some(1));
    }

    #[test]
    fn test_region_request_uses_region_bounds() {
        let region = RegionDescriptor::new("r1", Bytes::from_static(b"g"), Bytes::new());
        let request = build_scan_request(
            &split(ScanUnit::RegionLocal {
                region_index: 0,
                region,
                snapshot_name: "ss-default.people-1".to_string(),
            }),
            &names(&["rowkey"]),
            &meta(),
            &ScanConfig::default(),
        )
        .unwrap();

        assert_eq!(request.range.start.as_deref(), Some(&b"g"[..]));
        assert!(request.range.end.is_none());
        assert!(request.columns.is_empty());
        assert!(request.is_key_only());
    }

    #[test]
    fn test_unknown_projection_column() {
        let err = build_scan_request(
            &split(ScanUnit::BatchGet { keys: Vec::new() }),
            &names(&["rowkey", "zip"]),
            &meta(),
            &ScanConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "column", .. }));
    }

    fn region_split(conditions: Vec<Condition>) -> Split {
        let mut split = split(ScanUnit::RegionLocal {
            region_index: 0,
            region: RegionDescriptor::new("r0", Bytes::new(), Bytes::new()),
            snapshot_name: "ss-default.people-1".to_string(),
        });
        split.conditions = conditions;
        split
    }

    #[test]
    fn test_region_request_narrowed_to_row_key_between() {
        let request = build_scan_request(
            &region_split(vec![
                Condition::new("rowkey", Operator::Ge, "b", ColumnType::Varchar),
                Condition::new("rowkey", Operator::Le, "c", ColumnType::Varchar),
            ]),
            &names(&["rowkey", "age"]),
            &meta(),
            &ScanConfig::default(),
        )
        .unwrap();

        assert_eq!(request.range, KeyRange::new(&b"b"[..], &b"c\0"[..]));
        // one interval is captured by the range
        assert!(request.filter.is_none());
    }

    #[test]
    fn test_region_request_keeps_disjoint_row_key_ranges() {
        let request = build_scan_request(
            &region_split(vec![
                Condition::new("rowkey", Operator::Lt, "c", ColumnType::Varchar),
                Condition::new("rowkey", Operator::Ge, "x", ColumnType::Varchar),
            ]),
            &names(&["rowkey", "age"]),
            &meta(),
            &ScanConfig::default(),
        )
        .unwrap();

        assert!(request.range.is_unbounded());
        let filter = request.filter.unwrap();
        for (key, expected) in [("a", true), ("m", false), ("x", true)] {
            assert_eq!(filter.matches(&Row::new(key.as_bytes().to_vec())), expected, "key {key}");
        }
    }

    #[test]
    fn test_region_outside_row_key_bounds_matches_nothing() {
        let mut split = region_split(vec![Condition::new(
            "rowkey",
            Operator::Lt,
            "c",
            ColumnType::Varchar,
        )]);
        if let ScanUnit::RegionLocal { region, .. } = &mut split.unit {
            region.start_key = Bytes::from_static(b"m");
        }
        let request =
            build_scan_request(&split, &names(&["rowkey"]), &meta(), &ScanConfig::default())
                .unwrap();

        assert!(!request.range.contains(b""));
        assert!(!request.range.contains(b"a"));
        assert!(!request.range.contains(b"m"));
    }
}
