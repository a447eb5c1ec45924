//! Orchestrator configuration.
//!
//! One YAML document with `cache`, `scheduler` and `coordinator` sections. Every field
//! has a default, so an empty document is a valid configuration. Durations are given in
//! milliseconds (`*_ms` fields).
//!
//! Environment overrides:
//! - `ASSIST_BATCH_CONCURRENCY`
//! - `ASSIST_BATCH_SIZE`
//! - `ASSIST_CACHE_ENABLED` (`1`/`true`/`yes` or `0`/`false`/`no`)

use crate::batch::SchedulerConfig;
use crate::cache::{CacheConfig, StrategyRegistry};
use crate::coordinator::CoordinatorConfig;
use crate::error::ErrorContext;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

pub const ENV_BATCH_CONCURRENCY: &str = "ASSIST_BATCH_CONCURRENCY";
pub const ENV_BATCH_SIZE: &str = "ASSIST_BATCH_SIZE";
pub const ENV_CACHE_ENABLED: &str = "ASSIST_CACHE_ENABLED";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub cache: CacheConfig,
    pub scheduler: SchedulerConfig,
    pub coordinator: CoordinatorConfig,
}

impl OrchestratorConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read configuration: {}", e),
                ErrorContext::new()
                    .with_details(path.display().to_string())
                    .with_component("orchestrator_config"),
            )
        })?;
        Self::from_yaml_str(&text)
    }

    /// Apply `ASSIST_*` environment overrides. Unparseable or zero values are ignored.
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with an explicit lookup.
    pub fn apply_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let positive = |name: &str| -> Option<usize> {
            let raw = lookup(name)?;
            match raw.trim().parse::<usize>() {
                Ok(v) if v > 0 => Some(v),
                _ => {
                    warn!(variable = name, value = %raw, "ignoring invalid override");
                    None
                }
            }
        };
        if let Some(n) = positive(ENV_BATCH_CONCURRENCY) {
            debug!(concurrency = n, "scheduler concurrency overridden");
            self.scheduler.concurrency = n;
        }
        if let Some(n) = positive(ENV_BATCH_SIZE) {
            debug!(batch_size = n, "scheduler batch size overridden");
            self.scheduler.batch_size = n;
        }
        if let Some(raw) = lookup(ENV_CACHE_ENABLED) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.cache.enabled = true,
                "0" | "false" | "no" | "off" => self.cache.enabled = false,
                _ => warn!(variable = ENV_CACHE_ENABLED, value = %raw, "ignoring invalid override"),
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;
        self.coordinator.validate()?;
        let registry = StrategyRegistry::new(self.cache.strategies.clone())?;
        let referenced = [
            (
                "scheduler.cache_strategy",
                self.scheduler.cache_strategy.as_str(),
                self.scheduler.enable_caching,
            ),
            (
                "coordinator.recommendation_strategy",
                self.coordinator.recommendation_strategy.as_str(),
                true,
            ),
        ];
        for (field, name, required) in referenced {
            if required && self.cache.enabled && registry.get(name).is_none() {
                return Err(Error::configuration_with_context(
                    format!("cache strategy '{}' is not declared", name),
                    ErrorContext::new()
                        .with_field_path(field)
                        .with_details(format!("declared: {}", registry.names().join(", ")))
                        .with_component("orchestrator_config"),
                ));
            }
        }
        Ok(())
    }
}
