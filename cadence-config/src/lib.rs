//! Loader for `cadence.yaml` with environment overlays.
//!
//! Sources are merged in the order they are added, with `CADENCE_`-prefixed
//! environment variables applied last so they win over any file. Nested keys
//! use a double underscore: `CADENCE_LIMITS__MESSAGE__HOURLY_MAX=5`.
//! String values then get `${VAR}` expansion before the typed config is
//! validated.
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde_json::Value;
use std::path::Path;

mod schema;

pub use schema::{
    BusinessHoursSection, CadenceConfig, LedgerCaps, LimitSpec, LoggingSection, SchedulerSection,
};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "CADENCE";

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => break,
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder over the `config` crate: YAML files and snippets, then environment.
pub struct CadenceConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env_prefix: String,
}

impl Default for CadenceConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CadenceConfigLoader {
    /// ```
    /// use cadence_config::CadenceConfigLoader;
    ///
    /// let config = CadenceConfigLoader::new()
    ///     .with_yaml_str("scheduler:\n  timezone: Europe/Berlin")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.scheduler.timezone, "Europe/Berlin");
    /// assert_eq!(config.scheduler.work_hours_start, 9);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Read overrides from `<prefix>_...` instead of `CADENCE_...`.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Attach a required file; the format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be missing, for environment-only deployments.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use cadence_common::ActionKind;
    /// use cadence_config::CadenceConfigLoader;
    /// use std::time::Duration;
    ///
    /// let cfg = CadenceConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// limits:
    ///   connection_request:
    ///     hourly_max: 3
    ///     min_interval_secs: 240
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// let limit = cfg.effective_limits()[&ActionKind::ConnectionRequest];
    /// assert_eq!(limit.hourly_max, 3);
    /// assert_eq!(limit.daily_max, 50);
    /// assert_eq!(limit.min_interval, Duration::from_secs(240));
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders and validate.
    pub fn load(self) -> Result<CadenceConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: CadenceConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}
