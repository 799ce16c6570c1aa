//! Monitor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collector::DEFAULT_CLOCK_HZ;

/// Error type for invalid configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Update interval is not finite or does not round to a positive `Duration`.
    InvalidInterval(f64),
    /// Stop margin is negative or not finite.
    InvalidStopMargin(f64),
    /// `clock_hz` of 0.
    InvalidClockHz,
    /// Empty proc path.
    EmptyProcPath,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidInterval(v) => {
                write!(f, "update interval must be a positive number of seconds, got {}", v)
            }
            ConfigError::InvalidStopMargin(v) => {
                write!(f, "stop margin must be a non-negative number of seconds, got {}", v)
            }
            ConfigError::InvalidClockHz => write!(f, "clock_hz must be greater than 0"),
            ConfigError::EmptyProcPath => write!(f, "proc path must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings for a [`Monitor`](crate::Monitor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between collection passes.
    pub update_interval_seconds: f64,
    /// Root of the proc filesystem.
    pub proc_path: String,
    /// File used to resolve UIDs to user names.
    pub passwd_path: String,
    /// Clock ticks per second of the jiffies counters (USER_HZ).
    pub clock_hz: u64,
    /// Extra time `stop()` waits for the poller beyond one interval.
    pub stop_margin_seconds: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            update_interval_seconds: 2.0,
            proc_path: "/proc".to_string(),
            passwd_path: "/etc/passwd".to_string(),
            clock_hz: DEFAULT_CLOCK_HZ,
            stop_margin_seconds: 1.0,
        }
    }
}

impl MonitorConfig {
    /// Default configuration with a custom interval.
    pub fn with_interval(update_interval_seconds: f64) -> Self {
        Self {
            update_interval_seconds,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let interval = self.update_interval_seconds;
        if !interval.is_finite()
            || interval <= 0.0
            || interval > u32::MAX as f64
            || self.interval().is_zero()
        {
            return Err(ConfigError::InvalidInterval(interval));
        }
        let margin = self.stop_margin_seconds;
        if !margin.is_finite() || margin < 0.0 || margin > u32::MAX as f64 {
            return Err(ConfigError::InvalidStopMargin(margin));
        }
        if self.clock_hz == 0 {
            return Err(ConfigError::InvalidClockHz);
        }
        if self.proc_path.is_empty() {
            return Err(ConfigError::EmptyProcPath);
        }
        Ok(())
    }

    /// Interval between pass starts. Assumes a validated config.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.update_interval_seconds).unwrap_or(Duration::ZERO)
    }

    /// Upper bound on how long `stop()` waits for the poller thread.
    pub fn stop_timeout(&self) -> Duration {
        let margin = Duration::try_from_secs_f64(self.stop_margin_seconds).unwrap_or(Duration::ZERO);
        self.interval() + margin
    }
}
