//! Typed shape of `cadence.yaml`.

use cadence_common::observability::{LogConfig, LogFormat};
use cadence_common::{default_limits, ActionKind, ActionLimit, CadenceError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CadenceConfig {
    /// Per-kind overrides layered onto the built-in table.
    #[serde(default)]
    pub limits: BTreeMap<ActionKind, LimitSpec>,
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub business_hours: BusinessHoursSection,
    #[serde(default)]
    pub ledger_caps: LedgerCaps,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Partial limit; unset fields keep the built-in value for that kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct LimitSpec {
    pub hourly_max: Option<u32>,
    pub daily_max: Option<u32>,
    pub min_interval_secs: Option<u64>,
    pub cooldown_after: Option<u32>,
    pub cooldown_secs: Option<u64>,
}

impl LimitSpec {
    pub fn apply(&self, base: ActionLimit) -> ActionLimit {
        ActionLimit {
            hourly_max: self.hourly_max.unwrap_or(base.hourly_max),
            daily_max: self.daily_max.unwrap_or(base.daily_max),
            min_interval: self
                .min_interval_secs
                .map_or(base.min_interval, Duration::from_secs),
            cooldown_after: self.cooldown_after.unwrap_or(base.cooldown_after),
            cooldown_duration: self
                .cooldown_secs
                .map_or(base.cooldown_duration, Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub timezone: String,
    pub work_hours_start: u32,
    pub work_hours_end: u32,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            timezone: "UTC".into(),
            work_hours_start: 9,
            work_hours_end: 18,
        }
    }
}

/// Optional gate that holds a run until local business hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BusinessHoursSection {
    pub enabled: bool,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for BusinessHoursSection {
    fn default() -> Self {
        Self {
            enabled: false,
            start_hour: 9,
            end_hour: 18,
        }
    }
}

/// Per-day ceilings enforced against the caller's own records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LedgerCaps {
    pub max_connections_per_day: u32,
    pub max_messages_per_day: u32,
}

impl Default for LedgerCaps {
    fn default() -> Self {
        Self {
            max_connections_per_day: 50,
            max_messages_per_day: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub dir: Option<PathBuf>,
    pub stderr: bool,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
            dir: None,
            stderr: false,
            format: LogFormat::Text,
        }
    }
}

impl LoggingSection {
    pub fn to_log_config(&self, app_name: &'static str) -> LogConfig {
        LogConfig {
            app_name,
            log_dir: self.dir.clone(),
            emit_stderr: self.stderr,
            format: self.format,
            default_filter: self.level.clone(),
        }
    }
}

fn check_window(name: &str, start: u32, end: u32) -> Result<()> {
    if start > 23 || end > 23 {
        return Err(CadenceError::ConfigurationInvalid(format!(
            "{name}: hours must be within 0..=23 (got {start}..{end})"
        )));
    }
    if start >= end {
        return Err(CadenceError::ConfigurationInvalid(format!(
            "{name}: start ({start}) must be before end ({end})"
        )));
    }
    Ok(())
}

impl CadenceConfig {
    /// Built-in limits with the configured overrides applied.
    pub fn effective_limits(&self) -> BTreeMap<ActionKind, ActionLimit> {
        let mut limits = default_limits();
        for (kind, spec) in &self.limits {
            if let Some(base) = limits.get_mut(kind) {
                *base = spec.apply(*base);
            }
        }
        limits
    }

    pub fn validate(&self) -> Result<()> {
        for (kind, limit) in self.effective_limits() {
            limit.validate(kind)?;
        }
        check_window(
            "scheduler",
            self.scheduler.work_hours_start,
            self.scheduler.work_hours_end,
        )?;
        check_window(
            "business_hours",
            self.business_hours.start_hour,
            self.business_hours.end_hour,
        )?;
        Ok(())
    }
}
