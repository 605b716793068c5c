//! Snapshot creation and region enumeration for region-local reads.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, info};

use splitscan_core::{CoreError, RegionDescriptor, RetryConfig, SnapshotAdmin};

use crate::retry::RetryPolicy;
use crate::Result;

type Sleeper = Arc<dyn Fn(Duration) + Send + Sync>;

/// Name embedding the table and a nanosecond timestamp, e.g.
/// `ss-default.events-1718000000123456789`.
pub fn snapshot_name(schema: &str, table: &str) -> String {
    let now = Utc::now();
    let nanos = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000));
    format!("ss-{schema}.{table}-{nanos}")
}

/// Creates table snapshots with bounded retry and lists their regions.
#[derive(Clone)]
pub struct SnapshotCoordinator {
    admin: Arc<dyn SnapshotAdmin>,
    retry: RetryPolicy,
    sleeper: Sleeper,
}

impl fmt::Debug for SnapshotCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotCoordinator")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl SnapshotCoordinator {
    #[must_use]
    pub fn new(admin: Arc<dyn SnapshotAdmin>, retry: &RetryConfig) -> Self {
        Self {
            admin,
            retry: RetryPolicy::from_config(retry),
            sleeper: Arc::new(std::thread::sleep),
        }
    }

    /// Replaces the blocking sleep between attempts.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Snapshots `schema:table`, retrying under one name.
    ///
    /// Fails with `SnapshotFailed` once every attempt has failed.
    pub fn create_with_retry(&self, schema: &str, table: &str) -> Result<String> {
        let name = snapshot_name(schema, table);
        let started = Instant::now();
        let sleeper = Arc::clone(&self.sleeper);

        let outcome = self.retry.run_with_sleep(
            |delay| sleeper(delay),
            |attempt| {
                if attempt > 1 {
                    info!(snapshot = %name, attempt, "retrying snapshot creation");
                }
                self.admin.create_snapshot(&name, schema, table)
            },
        );

        match outcome {
            Ok(()) => {
                info!(
                    snapshot = %name,
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "created snapshot"
                );
                Ok(name)
            }
            Err(exhausted) => {
                error!(snapshot = %name, attempts = exhausted.attempts, "snapshot creation failed");
                Err(CoreError::SnapshotFailed {
                    snapshot: name,
                    attempts: exhausted.attempts,
                    message: exhausted.last_error.to_string(),
                })
            }
        }
    }

    /// Live regions of snapshot `name`; offline split parents are skipped.
    pub fn list_regions(&self, name: &str) -> Result<Vec<RegionDescriptor>> {
        let regions = self.admin.list_snapshot_regions(name)?;
        let total = regions.len();
        let live: Vec<RegionDescriptor> = regions
            .into_iter()
            .filter(|region| !region.is_stale_split())
            .collect();

        info!(snapshot = %name, total, live = live.len(), "listed snapshot regions");
        Ok(live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    use bytes::Bytes;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FlakyAdmin {
        failures: AtomicU32,
        names: Mutex<Vec<String>>,
        regions: Vec<RegionDescriptor>,
    }

    impl SnapshotAdmin for FlakyAdmin {
        fn create_snapshot(&self, name: &str, _schema: &str, _table: &str) -> Result<()> {
            self.names.lock().push(name.to_string());
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(CoreError::StorageError("region server busy".to_string()));
            }
            Ok(())
        }

        fn list_snapshot_regions(&self, _name: &str) -> Result<Vec<RegionDescriptor>> {
            Ok(self.regions.clone())
        }
    }

    fn coordinator(admin: Arc<FlakyAdmin>) -> SnapshotCoordinator {
        SnapshotCoordinator::new(admin, &RetryConfig::default()).with_sleeper(|_| {})
    }

    #[test]
    fn test_snapshot_name_format() {
        let name = snapshot_name("default", "events");
        let nanos = name.strip_prefix("ss-default.events-").unwrap();
        assert!(nanos.parse::<i64>().is_ok());
    }

    #[test]
    fn test_retry_reuses_name() {
        let admin = Arc::new(FlakyAdmin {
            failures: AtomicU32::new(2),
            ..FlakyAdmin::default()
        });
        let name = coordinator(Arc::clone(&admin))
            .create_with_retry("default", "events")
            .unwrap();

        let names = admin.names.lock();
        assert_eq!(names.len(), 3);
        assert!(names.iter().all(|attempted| *attempted == name));
    }

    #[test]
    fn test_exhaustion_fails_closed() {
        let admin = Arc::new(FlakyAdmin {
            failures: AtomicU32::new(10),
            ..FlakyAdmin::default()
        });
        let err = coordinator(Arc::clone(&admin))
            .create_with_retry("default", "events")
            .unwrap_err();

        match err {
            CoreError::SnapshotFailed { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(admin.names.lock().len(), 4);
    }

    #[test]
    fn test_stale_regions_skipped() {
        let mut parent = RegionDescriptor::new("r0", Bytes::new(), Bytes::new());
        parent.offline = true;
        parent.split = true;
        let left = RegionDescriptor::new("r1", Bytes::new(), Bytes::from_static(b"m"));
        let right = RegionDescriptor::new("r2", Bytes::from_static(b"m"), Bytes::new());

        let admin = Arc::new(FlakyAdmin {
            regions: vec![parent, left, right],
            ..FlakyAdmin::default()
        });
        let regions = coordinator(admin).list_regions("ss-x").unwrap();
        let ids: Vec<&str> = regions.iter().map(|r| r.region_id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
    }
}
