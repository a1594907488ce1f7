//! Configuration structures for procclock.
//!
//! Everything has a working default; a TOML file only needs the keys it
//! wants to change.

use crate::error::{ProcclockError, ProcclockResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcclockConfig {
    /// Clock calibration settings.
    pub calibration: CalibrationConfig,

    /// Real-time settings for the throttler itself.
    pub realtime: RealtimeConfig,

    /// Duty-cycle loop settings.
    pub scheduler: SchedulerConfig,
}

/// Clock calibration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Number of sleep measurements to average.
    pub iterations: u32,

    /// Sleep requested per measurement.
    #[serde(with = "humantime_serde")]
    pub nominal_sleep: Duration,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            nominal_sleep: Duration::from_micros(1),
        }
    }
}

/// Real-time scheduling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Enable real-time scheduling (requires privileges).
    pub enabled: bool,

    /// Scheduler policy: "fifo", "rr" or "other".
    pub policy: SchedPolicy,

    /// Scheduler priority (1-99 for RT policies).
    pub priority: u8,

    /// Lock all memory pages (mlockall).
    pub lock_memory: bool,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            policy: SchedPolicy::Fifo,
            priority: 50,
            lock_memory: false,
        }
    }
}

/// Scheduler policy for the throttling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchedPolicy {
    /// SCHED_FIFO: First-in-first-out real-time.
    #[default]
    Fifo,
    /// SCHED_RR: Round-robin real-time.
    Rr,
    /// SCHED_OTHER: Normal time-sharing (non-RT).
    Other,
}

/// Duty-cycle loop settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Stop after this many ticks (0 = run until interrupted or the target exits).
    pub max_ticks: u64,

    /// Log run statistics every N ticks (0 = only at exit).
    pub stats_interval: u64,
}

impl SchedulerConfig {
    /// The tick limit, if any.
    #[must_use]
    pub fn tick_limit(&self) -> Option<u64> {
        (self.max_ticks > 0).then_some(self.max_ticks)
    }
}

impl ProcclockConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ProcclockError::Config`] describing the first bad value.
    pub fn validate(&self) -> ProcclockResult<()> {
        if self.calibration.iterations == 0 {
            return Err(ProcclockError::Config(
                "calibration.iterations must be at least 1".into(),
            ));
        }
        if self.calibration.nominal_sleep.is_zero() {
            return Err(ProcclockError::Config(
                "calibration.nominal_sleep must be non-zero".into(),
            ));
        }
        if self.calibration.nominal_sleep >= Duration::from_secs(1) {
            return Err(ProcclockError::Config(
                "calibration.nominal_sleep must be below one second".into(),
            ));
        }
        if self.realtime.enabled
            && self.realtime.policy != SchedPolicy::Other
            && !(1..=99).contains(&self.realtime.priority)
        {
            return Err(ProcclockError::Config(format!(
                "realtime.priority must be within 1-99, got {}",
                self.realtime.priority
            )));
        }
        Ok(())
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ProcclockConfig::default();
        assert_eq!(config.calibration.iterations, 1000);
        assert_eq!(config.calibration.nominal_sleep, Duration::from_micros(1));
        assert!(!config.realtime.enabled);
        assert_eq!(config.scheduler.tick_limit(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [calibration]
            iterations = 250
            nominal_sleep = "2us"

            [realtime]
            enabled = true
            policy = "rr"
            priority = 80

            [scheduler]
            max_ticks = 5000
        "#;

        let config = ProcclockConfig::from_toml(toml).unwrap();
        assert_eq!(config.calibration.iterations, 250);
        assert_eq!(config.calibration.nominal_sleep, Duration::from_micros(2));
        assert!(config.realtime.enabled);
        assert_eq!(config.realtime.policy, SchedPolicy::Rr);
        assert_eq!(config.realtime.priority, 80);
        assert!(!config.realtime.lock_memory);
        assert_eq!(config.scheduler.tick_limit(), Some(5000));
        assert_eq!(config.scheduler.stats_interval, 0);
    }

    #[test]
    fn test_roundtrip_toml() {
        let mut config = ProcclockConfig::default();
        config.calibration.nominal_sleep = Duration::from_micros(5);
        let toml = config.to_toml().unwrap();
        let parsed = ProcclockConfig::from_toml(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_validate_rejects_zero_iterations() {
        let mut config = ProcclockConfig::default();
        config.calibration.iterations = 0;
        assert!(matches!(config.validate(), Err(ProcclockError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_priority() {
        let mut config = ProcclockConfig::default();
        config.realtime.enabled = true;
        config.realtime.priority = 0;
        assert!(config.validate().is_err());

        config.realtime.policy = SchedPolicy::Other;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_duration() {
        let toml = r#"
            [calibration]
            nominal_sleep = "soon"
        "#;
        assert!(matches!(
            ProcclockConfig::from_toml(toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scheduler]\nstats_interval = 100").unwrap();

        let config = ProcclockConfig::from_file(file.path()).unwrap();
        assert_eq!(config.scheduler.stats_interval, 100);

        let missing = ProcclockConfig::from_file(std::path::Path::new("/nonexistent/procclock.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
