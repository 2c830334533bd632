//! Job lifecycle configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::order::DEFAULT_MAX_UNITS;

/// How to treat a job status this client does not recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnrecognizedStatusPolicy {
    /// Keep polling as if the job were still processing.
    #[default]
    InProgress,
    /// Fail the job.
    Error,
}

/// Configuration for the job lifecycle controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// How often to poll job status (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Tick of the display countdown (milliseconds).
    /// Independent from the poll interval.
    #[serde(default = "default_countdown_tick")]
    pub countdown_tick_ms: u64,

    /// Estimated progress added per in-progress poll (percentage points).
    #[serde(default = "default_progress_step")]
    pub progress_step_pct: u8,

    /// Ceiling for the estimate until the service reports a ready state.
    #[serde(default = "default_progress_cap")]
    pub progress_cap_pct: u8,

    /// Cosmetic time budget shown as "time remaining" (seconds).
    /// Never enforced as a deadline.
    #[serde(default = "default_eta_budget")]
    pub eta_budget_secs: u64,

    /// Maximum units per job (0 = unlimited).
    #[serde(default = "default_max_units")]
    pub max_total_units: u32,

    #[serde(default)]
    pub unrecognized_status: UnrecognizedStatusPolicy,
}

fn default_poll_interval() -> u64 {
    2000 // 2 seconds
}

fn default_countdown_tick() -> u64 {
    1000
}

fn default_progress_step() -> u8 {
    6
}

fn default_progress_cap() -> u8 {
    95
}

fn default_eta_budget() -> u64 {
    120
}

fn default_max_units() -> u32 {
    DEFAULT_MAX_UNITS
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            countdown_tick_ms: default_countdown_tick(),
            progress_step_pct: default_progress_step(),
            progress_cap_pct: default_progress_cap(),
            eta_budget_secs: default_eta_budget(),
            max_total_units: default_max_units(),
            unrecognized_status: UnrecognizedStatusPolicy::default(),
        }
    }
}

impl LifecycleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }

    pub fn unit_cap(&self) -> Option<u32> {
        (self.max_total_units > 0).then_some(self.max_total_units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LifecycleConfig::default();
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.countdown_tick_ms, 1000);
        assert_eq!(config.progress_step_pct, 6);
        assert_eq!(config.progress_cap_pct, 95);
        assert_eq!(config.eta_budget_secs, 120);
        assert_eq!(config.max_total_units, 100);
        assert_eq!(config.unit_cap(), Some(100));
        assert_eq!(
            config.unrecognized_status,
            UnrecognizedStatusPolicy::InProgress
        );
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            poll_interval_ms = 500
            unrecognized_status = "error"
            max_total_units = 0
        "#;
        let config: LifecycleConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.unit_cap(), None);
        assert_eq!(config.unrecognized_status, UnrecognizedStatusPolicy::Error);
        assert_eq!(config.progress_cap_pct, 95);
    }
}
