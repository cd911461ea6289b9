//! Run configuration: pool size, probe deadlines, schedule and inventory table.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//! Database credentials are not part of this file; they stay in the
//! `POSTGRES_*` environment variables read by the inventory crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;

/// Top-level configuration handed to the coordinator and scheduler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    pub pool: PoolConfig,
    pub probe: ProbeConfig,
    pub schedule: ScheduleConfig,
    pub inventory: InventoryConfig,
}

/// Worker pool sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Maximum number of probes running at once.
    pub capacity: usize,
    /// Maximum number of streams waiting for a free slot. Submissions beyond
    /// this are rejected with `queue_error`.
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            queue_capacity: 1024,
        }
    }
}

/// External probe invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Command prefix; the first element is the executable. The fixed probe
    /// arguments are appended after it.
    pub command: Vec<String>,
    /// Wall-clock budget for one probe before the process is killed.
    pub deadline_ms: u64,
    /// Stream-connect timeout passed to the probe tool. Must be shorter than
    /// `deadline_ms`.
    pub connect_timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            command: vec!["ffmpeg".to_string()],
            deadline_ms: 20_000,
            connect_timeout_ms: 10_000,
        }
    }
}

impl ProbeConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// Connect timeout in microseconds, the unit the probe tool expects.
    pub fn connect_timeout_us(&self) -> u64 {
        self.connect_timeout_ms.saturating_mul(1_000)
    }
}

/// Cycle cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Where the stream list comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InventoryConfig {
    /// PostgreSQL table with `(id, name, source_url)` columns.
    pub table: String,
    /// Read streams from this JSON file instead of PostgreSQL.
    pub file: Option<PathBuf>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            table: streamwatch_inventory::DEFAULT_TABLE.to_string(),
            file: None,
        }
    }
}

impl WatchConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: WatchConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.capacity == 0 {
            return Err(ConfigError::Invalid("pool.capacity must be at least 1".into()));
        }
        if self.pool.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "pool.queue_capacity must be at least 1".into(),
            ));
        }
        match self.probe.command.first() {
            Some(program) if !program.trim().is_empty() => {}
            _ => {
                return Err(ConfigError::Invalid(
                    "probe.command must name an executable".into(),
                ))
            }
        }
        if self.probe.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "probe.connect_timeout_ms must be positive".into(),
            ));
        }
        if self.probe.connect_timeout_ms >= self.probe.deadline_ms {
            return Err(ConfigError::Invalid(format!(
                "probe.connect_timeout_ms ({}) must be shorter than probe.deadline_ms ({})",
                self.probe.connect_timeout_ms, self.probe.deadline_ms
            )));
        }
        if self.schedule.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "schedule.interval_secs must be positive".into(),
            ));
        }
        streamwatch_inventory::validate_table_name(&self.inventory.table)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WatchConfig::default();
        assert_eq!(config.pool.capacity, 10);
        assert_eq!(config.pool.queue_capacity, 1024);
        assert_eq!(config.probe.command, vec!["ffmpeg"]);
        assert_eq!(config.probe.deadline(), Duration::from_secs(20));
        assert_eq!(config.probe.connect_timeout_us(), 10_000_000);
        assert_eq!(config.schedule.interval(), Duration::from_secs(60));
        assert_eq!(config.inventory.table, "cameras");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(WatchConfig::from_toml_str("").unwrap(), WatchConfig::default());
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let config = WatchConfig::from_toml_str(
            r#"
            [pool]
            capacity = 4

            [probe]
            command = ["nice", "-n", "10", "ffmpeg"]
            deadline_ms = 8000
            connect_timeout_ms = 5000
            "#,
        )
        .unwrap();

        assert_eq!(config.pool.capacity, 4);
        assert_eq!(config.pool.queue_capacity, 1024);
        assert_eq!(config.probe.command[0], "nice");
        assert_eq!(config.probe.connect_timeout_us(), 5_000_000);
        assert_eq!(config.schedule.interval_secs, 60);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = WatchConfig::from_toml_str("[pool]\nworkers = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_connect_timeout_must_be_shorter_than_deadline() {
        let mut config = WatchConfig::default();
        config.probe.connect_timeout_ms = config.probe.deadline_ms;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("shorter than"));
    }

    #[test]
    fn test_zero_pool_rejected() {
        let mut config = WatchConfig::default();
        config.pool.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = WatchConfig::default();
        config.pool.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_command_rejected() {
        let mut config = WatchConfig::default();
        config.probe.command = vec![];
        assert!(config.validate().is_err());

        config.probe.command = vec![" ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_table_rejected() {
        let mut config = WatchConfig::default();
        config.inventory.table = "cameras; --".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streamwatch.toml");
        std::fs::write(&path, "[schedule]\ninterval_secs = 30\n").unwrap();

        let config = WatchConfig::from_file(&path).unwrap();
        assert_eq!(config.schedule.interval_secs, 30);

        let err = WatchConfig::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
