// Copyright 2025 Cowboy AI, LLC.

//! Scheduler configuration
//!
//! Defaults are layered under environment variables prefixed `ASSESSMENT_`,
//! with `__` separating nested keys:
//!
//! ```text
//! ASSESSMENT_ENTRY_BASE_URL=https://survey.example.org/entry
//! ASSESSMENT_ENTRY_TTL_HOURS=72
//! ASSESSMENT_GENERATION_HORIZON_DAYS=90
//! ASSESSMENT_MAX_DUE_TASKS_PER_RUN=200
//! ```

use crate::errors::{DomainError, DomainResult, ValidationErrors};
use chrono::TimeDelta;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ASSESSMENT";

/// Settings of the task scheduler and the default entry generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// URL prefix of generated entries
    pub entry_base_url: String,
    /// Validity of an opened task's entry
    pub entry_ttl_hours: i64,
    /// Generate only this many days ahead at enrollment; `None` generates everything
    #[serde(default)]
    pub generation_horizon_days: Option<i64>,
    /// Cap of due tasks opened by one scheduling run
    pub max_due_tasks_per_run: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            entry_base_url: "https://assessment.local/entry".to_string(),
            entry_ttl_hours: 168,
            generation_horizon_days: None,
            max_due_tasks_per_run: 500,
        }
    }
}

impl SchedulerConfig {
    /// Defaults overridden by `ASSESSMENT_*` environment variables
    pub fn load() -> DomainResult<Self> {
        let builder = Self::defaults()
            .map_err(config_error)?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::from_builder(builder)
    }

    /// A builder preloaded with the defaults, for hosts adding their own sources
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Self::default();
        Config::builder()
            .set_default("entry_base_url", defaults.entry_base_url)?
            .set_default("entry_ttl_hours", defaults.entry_ttl_hours)?
            .set_default("max_due_tasks_per_run", defaults.max_due_tasks_per_run as u64)
    }

    /// Build, deserialize and validate
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> DomainResult<Self> {
        let config: Self = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> DomainResult<()> {
        let mut violations = ValidationErrors::new();

        if self.entry_base_url.trim().is_empty() {
            violations.push("entry_base_url", "must not be empty");
        }
        if self.entry_ttl_hours <= 0 {
            violations.push("entry_ttl_hours", "must be greater than 0");
        }
        if self.generation_horizon_days.is_some_and(|days| days <= 0) {
            violations.push("generation_horizon_days", "must be greater than 0 when set");
        }
        if self.max_due_tasks_per_run == 0 {
            violations.push("max_due_tasks_per_run", "must be greater than 0");
        }

        violations.into_result()
    }

    /// Entry validity as a duration
    pub fn entry_ttl(&self) -> TimeDelta {
        TimeDelta::try_hours(self.entry_ttl_hours).unwrap_or(TimeDelta::MAX)
    }

    /// Generation horizon as a duration
    pub fn generation_horizon(&self) -> Option<TimeDelta> {
        self.generation_horizon_days.and_then(TimeDelta::try_days)
    }
}

fn config_error(err: ConfigError) -> DomainError {
    DomainError::validation("config", err.to_string())
}
