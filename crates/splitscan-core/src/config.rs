//! Configuration for split planning and scanning.
//!
//! Sources, lowest precedence first:
//! - built-in defaults
//! - file named by `SPLITSCAN_CONFIG`
//! - `./config/splitscan.*`
//! - `/etc/splitscan/splitscan.*`
//! - `SPLITSCAN__*` environment variables

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::split::HostAddress;

/// Wildcard allow-list entry enabling region-local reads for every table.
pub const ALL_TABLES: &str = "*";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct SplitscanConfig {
    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub snapshot: SnapshotConfig,

    #[serde(default)]
    pub region_local: RegionLocalConfig,

    #[serde(default)]
    pub scheduling: SchedulingConfig,

    #[serde(default)]
    pub scan: ScanConfig,
}

impl SplitscanConfig {
    /// Loads configuration from every source and validates it.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Self::set_defaults(Config::builder())?;

        if let Ok(config_path) = std::env::var("SPLITSCAN_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder
            .add_source(File::with_name("./config/splitscan").required(false))
            .add_source(File::with_name("/etc/splitscan/splitscan").required(false));

        // e.g. SPLITSCAN__PLANNER__SALT_BUCKET_COUNT=32
        builder = builder.add_source(
            Environment::with_prefix("SPLITSCAN")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("region_local.tables")
                .with_list_parse_key("scheduling.worker_hosts")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            region_local = config.region_local.enabled,
            salt_buckets = config.planner.salt_bucket_count,
            "loaded splitscan configuration"
        );

        Ok(config)
    }

    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            // Planner
            .set_default("planner.batch_get_min_chunk_size", 20)?
            .set_default("planner.batch_get_max_splits", 30)?
            .set_default("planner.max_split_count", 100)?
            .set_default("planner.salt_bucket_count", 20)?
            .set_default("planner.max_prefix_expansion", 10_000)?
            // Snapshot retry: fixed 100ms between attempts
            .set_default("snapshot.retry.max_retries", 3)?
            .set_default("snapshot.retry.initial_backoff_ms", 100)?
            .set_default("snapshot.retry.max_backoff_ms", 100)?
            .set_default("snapshot.retry.backoff_multiplier", 1.0)?
            // Region-local reads
            .set_default("region_local.enabled", false)?
            .set_default("region_local.tables", Vec::<String>::new())?
            // Scan
            .set_default("scan.caching", 10_000)?
            .set_default("scan.page_size", 1024)
    }

    /// Validates configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let planner = &self.planner;

        if planner.batch_get_min_chunk_size == 0 {
            return Err(ConfigError::Message(
                "planner.batch_get_min_chunk_size must be > 0".to_string(),
            ));
        }

        if planner.batch_get_max_splits == 0 {
            return Err(ConfigError::Message(
                "planner.batch_get_max_splits must be > 0".to_string(),
            ));
        }

        if planner.max_split_count == 0 {
            return Err(ConfigError::Message(
                "planner.max_split_count must be > 0".to_string(),
            ));
        }

        if planner.salt_bucket_count == 0 {
            return Err(ConfigError::Message(
                "planner.salt_bucket_count must be > 0".to_string(),
            ));
        }

        if planner.max_prefix_expansion == 0 {
            return Err(ConfigError::Message(
                "planner.max_prefix_expansion must be > 0".to_string(),
            ));
        }

        if self.snapshot.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::Message(
                "snapshot.retry.backoff_multiplier must be >= 1.0".to_string(),
            ));
        }

        if self.snapshot.retry.max_backoff_ms < self.snapshot.retry.initial_backoff_ms {
            return Err(ConfigError::Message(
                "snapshot.retry.max_backoff_ms must be >= initial_backoff_ms".to_string(),
            ));
        }

        if self.region_local.enabled && self.region_local.tables.is_empty() {
            return Err(ConfigError::Message(
                "region_local.tables must list at least one table when region_local.enabled is set"
                    .to_string(),
            ));
        }

        if !self.scheduling.worker_hosts.is_empty() && self.scheduling.worker_port.is_none() {
            return Err(ConfigError::Message(
                "scheduling.worker_port is required when scheduling.worker_hosts is set"
                    .to_string(),
            ));
        }

        if self.scan.caching == 0 || self.scan.page_size == 0 {
            return Err(ConfigError::Message(
                "scan.caching and scan.page_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Loads configuration from a single file, then validates it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Self = Self::set_defaults(Config::builder())?
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

/// Split planner limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Smallest number of keys per batch-get split.
    pub batch_get_min_chunk_size: usize,

    /// Upper bound on batch-get splits for one query.
    pub batch_get_max_splits: usize,

    /// Above this many salted prefix ranges, plan bucket-only ranges instead.
    pub max_split_count: usize,

    /// Target number of buckets over the salt alphabet.
    pub salt_bucket_count: usize,

    /// Cap on the number of row-key prefixes produced by prefix expansion.
    pub max_prefix_expansion: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            batch_get_min_chunk_size: 20,
            batch_get_max_splits: 30,
            max_split_count: 100,
            salt_bucket_count: 20,
            max_prefix_expansion: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct SnapshotConfig {
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry configuration for blocking operations
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    pub max_backoff_ms: u64,

    /// Backoff multiplier; 1.0 keeps the delay fixed
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 100,
            backoff_multiplier: 1.0,
        }
    }
}

impl RetryConfig {
    /// Total attempts including the first one.
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (0-based).
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn backoff_for_attempt(&self, retry: u32) -> Duration {
        let delay_ms = (self.initial_backoff_ms as f64
            * self.backoff_multiplier.powi(retry.min(i32::MAX as u32) as i32))
        .min(self.max_backoff_ms as f64);
        Duration::from_millis(delay_ms as u64)
    }
}

/// Tables whose reads go through snapshot regions.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct RegionLocalConfig {
    #[serde(default)]
    pub enabled: bool,

    /// `schema:table` entries; `*` as the first entry selects every table.
    #[serde(default)]
    pub tables: Vec<String>,
}

impl RegionLocalConfig {
    pub fn allows(&self, qualified_table: &str) -> bool {
        if !self.enabled {
            return false;
        }
        match self.tables.first() {
            Some(first) if first == ALL_TABLES => true,
            _ => self.tables.iter().any(|table| table == qualified_table),
        }
    }
}

/// Worker placement hints attached to splits.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct SchedulingConfig {
    #[serde(default)]
    pub worker_hosts: Vec<String>,

    #[serde(default)]
    pub worker_port: Option<u16>,
}

impl SchedulingConfig {
    /// Hint for the split at `index`, round-robin over the worker list.
    pub fn host_for(&self, index: usize) -> Option<HostAddress> {
        let port = self.worker_port?;
        if self.worker_hosts.is_empty() {
            return None;
        }
        let host = &self.worker_hosts[index % self.worker_hosts.len()];
        Some(HostAddress::new(host.clone(), port))
    }
}

/// Consumer-side scan settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ScanConfig {
    /// Rows fetched per RPC.
    pub caching: u32,

    /// Rows returned per cursor page.
    pub page_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            caching: 10_000,
            page_size: 1024,
        }
    }
}
