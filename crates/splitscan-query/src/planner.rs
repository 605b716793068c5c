//! Split planning: strategy selection and split assembly.

use std::collections::HashSet;

use bytes::Bytes;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use splitscan_core::{
    Condition, CoreError, ScanUnit, Split, SplitscanConfig, TableMetaInfo, TableMetaStore,
    TupleDomain,
};

use crate::batch_get::chunk_row_keys;
use crate::extract::extract_conditions;
use crate::key_range::plan_key_ranges;
use crate::snapshot::SnapshotCoordinator;
use crate::Result;

/// How a query's rows are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Point lookups; chosen whenever the row key has equality conditions.
    BatchGet,
    /// One scan per snapshot region; chosen for allow-listed tables.
    RegionLocal,
    /// Scans over planned row-key ranges.
    KeyRange,
}

/// Plans splits for one table read.
///
/// Planning is synchronous; region-local planning blocks while the snapshot
/// is taken.
#[derive(Debug, Clone)]
pub struct SplitPlanner {
    config: SplitscanConfig,
    snapshots: Option<SnapshotCoordinator>,
}

impl SplitPlanner {
    #[must_use]
    pub fn new(config: SplitscanConfig) -> Self {
        Self {
            config,
            snapshots: None,
        }
    }

    /// Enables region-local planning through `coordinator`.
    #[must_use]
    pub fn with_snapshots(mut self, coordinator: SnapshotCoordinator) -> Self {
        self.snapshots = Some(coordinator);
        self
    }

    pub const fn config(&self) -> &SplitscanConfig {
        &self.config
    }

    pub fn select_strategy(&self, conditions: &[Condition], meta: &TableMetaInfo) -> Strategy {
        if conditions
            .iter()
            .any(|condition| condition.is_eq_on(&meta.row_key_column))
        {
            Strategy::BatchGet
        } else if self.config.region_local.allows(&meta.qualified_name()) {
            Strategy::RegionLocal
        } else {
            Strategy::KeyRange
        }
    }

    /// Loads `schema.table` from `store` and plans splits for `constraint`.
    pub fn plan_constraint(
        &self,
        store: &dyn TableMetaStore,
        schema: &str,
        table: &str,
        constraint: &TupleDomain,
    ) -> Result<Vec<Split>> {
        let meta = store.load_table_meta(schema, table)?;
        let conditions = extract_conditions(constraint);
        self.plan(&conditions, &meta)
    }

    /// Plans splits in random order.
    pub fn plan(&self, conditions: &[Condition], meta: &TableMetaInfo) -> Result<Vec<Split>> {
        self.plan_with_rng(conditions, meta, &mut rand::thread_rng())
    }

    /// Plans splits, shuffling them with `rng`.
    ///
    /// Host hints are assigned before the shuffle, so a split keeps its hint
    /// whatever order it ends up in.
    pub fn plan_with_rng<R: Rng + ?Sized>(
        &self,
        conditions: &[Condition],
        meta: &TableMetaInfo,
        rng: &mut R,
    ) -> Result<Vec<Split>> {
        meta.validate()?;

        let strategy = self.select_strategy(conditions, meta);
        info!(
            table = %meta.qualified_name(),
            ?strategy,
            conditions = conditions.len(),
            "planning splits"
        );

        let units = match strategy {
            Strategy::BatchGet => self.batch_get_units(conditions, meta),
            Strategy::RegionLocal => self.region_local_units(conditions, meta)?,
            Strategy::KeyRange => plan_key_ranges(conditions, meta, &self.config.planner)?
                .into_iter()
                .map(|range| (ScanUnit::KeyRange { range }, conditions.to_vec()))
                .collect(),
        };

        let mut splits: Vec<Split> = units
            .into_iter()
            .enumerate()
            .map(|(index, (unit, conditions))| Split {
                schema: meta.schema.clone(),
                table: meta.table.clone(),
                row_key_column: meta.row_key_column.clone(),
                host_hints: self.config.scheduling.host_for(index).into_iter().collect(),
                conditions,
                unit,
            })
            .collect();

        splits.shuffle(rng);

        info!(
            table = %meta.qualified_name(),
            ?strategy,
            splits = splits.len(),
            "planned splits"
        );
        for split in &splits {
            debug!(split = %split.describe(), "split");
        }

        Ok(splits)
    }

    fn batch_get_units(
        &self,
        conditions: &[Condition],
        meta: &TableMetaInfo,
    ) -> Vec<(ScanUnit, Vec<Condition>)> {
        let mut seen = HashSet::new();
        let row_keys: Vec<(Bytes, &Condition)> = conditions
            .iter()
            .filter(|condition| condition.is_eq_on(&meta.row_key_column))
            .map(|condition| (Bytes::from(condition.value.to_key_text()), condition))
            .filter(|(key, _)| seen.insert(key.clone()))
            .collect();
        let residual: Vec<Condition> = conditions
            .iter()
            .filter(|condition| condition.column != meta.row_key_column)
            .cloned()
            .collect();

        chunk_row_keys(row_keys, &self.config.planner)
            .into_iter()
            .map(|chunk| {
                let mut chunk_conditions: Vec<Condition> =
                    chunk.iter().map(|(_, condition)| (*condition).clone()).collect();
                chunk_conditions.extend(residual.iter().cloned());
                let keys = chunk.into_iter().map(|(key, _)| key).collect();
                (ScanUnit::BatchGet { keys }, chunk_conditions)
            })
            .collect()
    }

    fn region_local_units(
        &self,
        conditions: &[Condition],
        meta: &TableMetaInfo,
    ) -> Result<Vec<(ScanUnit, Vec<Condition>)>> {
        let coordinator = self.snapshots.as_ref().ok_or_else(|| {
            CoreError::invalid_config(format!(
                "table `{}` is allow-listed for region-local reads but no snapshot coordinator is configured",
                meta.qualified_name()
            ))
        })?;

        let snapshot_name = coordinator.create_with_retry(&meta.schema, &meta.table)?;
        let regions = coordinator.list_regions(&snapshot_name)?;

        Ok(regions
            .into_iter()
            .enumerate()
            .map(|(region_index, region)| {
                (
                    ScanUnit::RegionLocal {
                        region_index,
                        region,
                        snapshot_name: snapshot_name.clone(),
                    },
                    conditions.to_vec(),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use bytes::Bytes;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use splitscan_core::{
        ColumnMeta, ColumnType, HostAddress, Operator, RegionDescriptor, RowKeyFormat, SaltSpec,
        SnapshotAdmin,
    };

    struct TwoRegions;

    impl SnapshotAdmin for TwoRegions {
        fn create_snapshot(&self, _name: &str, _schema: &str, _table: &str) -> Result<()> {
            Ok(())
        }

        fn list_snapshot_regions(&self, _name: &str) -> Result<Vec<RegionDescriptor>> {
            Ok(vec![
                RegionDescriptor::new("r1", Bytes::new(), Bytes::from_static(b"m")),
                RegionDescriptor::new("r2", Bytes::from_static(b"m"), Bytes::new()),
            ])
        }
    }

    struct StaleParentsOnly;

    impl SnapshotAdmin for StaleParentsOnly {
        fn create_snapshot(&self, _name: &str, _schema: &str, _table: &str) -> Result<()> {
            Ok(())
        }

        fn list_snapshot_regions(&self, _name: &str) -> Result<Vec<RegionDescriptor>> {
            let mut parent = RegionDescriptor::new("p1", Bytes::new(), Bytes::new());
            parent.offline = true;
            parent.split = true;
            Ok(vec![parent])
        }
    }

    fn users() -> TableMetaInfo {
        TableMetaInfo::new("default", "users", "rowkey")
            .with_format(RowKeyFormat::new(["region", "userId"]))
            .with_salt(SaltSpec::parse("0-9").unwrap())
            .with_column(ColumnMeta::row_key("rowkey"))
            .with_column(ColumnMeta::new("f", "region", ColumnType::Varchar))
            .with_column(ColumnMeta::new("f", "age", ColumnType::Integer))
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_strategy_selection() {
        let mut config = SplitscanConfig::default();
        config.region_local.enabled = true;
        config.region_local.tables = vec!["default:users".to_string()];
        let planner = SplitPlanner::new(config);
        let meta = users();

        assert_eq!(
            planner.select_strategy(&[Condition::eq("rowkey", "1-US-7")], &meta),
            Strategy::BatchGet
        );
        assert_eq!(
            planner.select_strategy(&[Condition::eq("region", "US")], &meta),
            Strategy::RegionLocal
        );
        assert_eq!(
            SplitPlanner::new(SplitscanConfig::default())
                .select_strategy(&[Condition::eq("region", "US")], &meta),
            Strategy::KeyRange
        );
    }

    #[test]
    fn test_batch_get_carries_residual_conditions() {
        let planner = SplitPlanner::new(SplitscanConfig::default());
        let mut conditions: Vec<Condition> = (0..25)
            .map(|i| Condition::eq("rowkey", format!("0-US-{i}")))
            .collect();
        conditions.push(Condition::new("age", Operator::Gt, 30, ColumnType::Integer));

        let splits = planner
            .plan_with_rng(&conditions, &users(), &mut rng())
            .unwrap();
        assert_eq!(splits.len(), 2);

        let mut total_keys = 0;
        for split in &splits {
            let keys = split.batch_keys().unwrap();
            total_keys += keys.len();
            assert_eq!(
                split.conditions.len(),
                keys.len() + 1,
                "chunk equalities plus the residual condition"
            );
            assert!(split.conditions.iter().any(|c| c.column == "age"));
        }
        assert_eq!(total_keys, 25);
    }

    #[test]
    fn test_duplicate_row_keys_collapsed() {
        let planner = SplitPlanner::new(SplitscanConfig::default());
        let conditions = vec![Condition::eq("rowkey", "a"), Condition::eq("rowkey", "a")];
        let splits = planner.plan(&conditions, &users()).unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].batch_keys().map(<[Bytes]>::len), Some(1));
    }

    #[test]
    fn test_region_local_requires_coordinator() {
        let mut config = SplitscanConfig::default();
        config.region_local.enabled = true;
        config.region_local.tables = vec!["*".to_string()];

        let err = SplitPlanner::new(config.clone())
            .plan(&[], &users())
            .unwrap_err();
        assert!(err.is_configuration());

        let planner = SplitPlanner::new(config).with_snapshots(
            SnapshotCoordinator::new(Arc::new(TwoRegions), &Default::default()).with_sleeper(|_| {}),
        );
        let mut splits = planner.plan(&[], &users()).unwrap();
        splits.sort_by_key(|split| match &split.unit {
            ScanUnit::RegionLocal { region_index, .. } => *region_index,
            _ => usize::MAX,
        });
        assert_eq!(splits.len(), 2);
        let ScanUnit::RegionLocal {
            region_index,
            region,
            snapshot_name,
        } = &splits[1].unit
        else {
            panic!("expected a region-local split");
        };
        assert_eq!(*region_index, 1);
        assert_eq!(region.region_id, "r2");
        assert!(snapshot_name.starts_with("ss-default.users-"));
    }

    #[test]
    fn test_only_stale_regions_plan_no_splits() {
        let mut config = SplitscanConfig::default();
        config.region_local.enabled = true;
        config.region_local.tables = vec!["*".to_string()];

        let planner = SplitPlanner::new(config).with_snapshots(
            SnapshotCoordinator::new(Arc::new(StaleParentsOnly), &Default::default())
                .with_sleeper(|_| {}),
        );
        assert!(planner.plan(&[], &users()).unwrap().is_empty());
    }

    #[test]
    fn test_host_hints_follow_planning_order() {
        let mut config = SplitscanConfig::default();
        config.scheduling.worker_hosts = vec!["w1".to_string(), "w2".to_string(), "w3".to_string()];
        config.scheduling.worker_port = Some(9000);
        let planner = SplitPlanner::new(config);

        let splits = planner
            .plan_with_rng(&[Condition::eq("region", "US")], &users(), &mut rng())
            .unwrap();
        assert_eq!(splits.len(), 10);

        for split in &splits {
            let range = split.key_range().unwrap();
            let salt = range.start.as_ref().unwrap()[0];
            let index = usize::from(salt - b'0');
            let expected = ["w1", "w2", "w3"][index % 3];
            assert_eq!(split.host_hints, vec![HostAddress::new(expected, 9000)]);
        }
    }

    #[test]
    fn test_invalid_meta_is_fatal() {
        let planner = SplitPlanner::new(SplitscanConfig::default());
        let meta = TableMetaInfo::new("default", "broken", "");
        assert!(matches!(
            planner.plan(&[], &meta),
            Err(CoreError::InvalidTableMeta { .. })
        ));
    }
}
