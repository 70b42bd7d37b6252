//! Declarative pipelines.
//!
//! A [`PipelineConfig`] lists policy stages, outermost first, as plain data that can live in a
//! JSON settings file. Durations are fractional seconds.
//!
//! ```json
//! { "policies": [
//!     { "kind": "timeout", "timeout_secs": 30.0 },
//!     { "kind": "retry", "max_attempts": 3, "base_delay_secs": 1.0, "jitter": true },
//!     { "kind": "bulkhead", "max_concurrent": 5, "acquire_timeout_secs": 5.0 }
//! ] }
//! ```
//!
//! [`PipelineConfig::build`] validates every stage and produces the [`Composite`]; invalid
//! stages are reported with their position in the list.

use crate::bulkhead::BulkheadError;
use crate::retry::BuildError;
use crate::timeout::TimeoutError;
use crate::{presets, BulkheadPolicy, Composite, FallbackPolicy, RetryPolicy, TimeoutPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Errors raised while parsing or building a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid pipeline json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stage {index}: `{field}` must be a finite number of seconds >= 0 (got {value})")]
    InvalidSeconds { index: usize, field: &'static str, value: f64 },
    #[error("stage {index}: {source}")]
    Timeout { index: usize, source: TimeoutError },
    #[error("stage {index}: {source}")]
    Retry { index: usize, source: BuildError },
    #[error("stage {index}: {source}")]
    Bulkhead { index: usize, source: BulkheadError },
    #[error("stage {index}: fallback_default needs a value type with a default; use build_with_default")]
    DefaultUnavailable { index: usize },
}

fn default_base_delay_secs() -> f64 {
    1.0
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

/// One stage of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyConfig {
    Timeout {
        timeout_secs: f64,
    },
    Retry {
        max_attempts: usize,
        #[serde(default = "default_base_delay_secs")]
        base_delay_secs: f64,
        #[serde(default = "default_backoff_factor")]
        backoff_factor: f64,
        #[serde(default)]
        jitter: bool,
    },
    Bulkhead {
        max_concurrent: usize,
        #[serde(default)]
        acquire_timeout_secs: f64,
    },
    /// Fallback without a value: failures pass through.
    Fallback {
        #[serde(default = "default_true")]
        log_error: bool,
    },
    /// Fallback to `T::default()`.
    FallbackDefault {
        #[serde(default = "default_true")]
        log_error: bool,
    },
}

impl PolicyConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            PolicyConfig::Timeout { .. } => "timeout",
            PolicyConfig::Retry { .. } => "retry",
            PolicyConfig::Bulkhead { .. } => "bulkhead",
            PolicyConfig::Fallback { .. } => "fallback",
            PolicyConfig::FallbackDefault { .. } => "fallback_default",
        }
    }
}

/// Ordered list of stages, outermost first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub policies: Vec<PolicyConfig>,
}

fn seconds(index: usize, field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    if value < 0.0 {
        return Err(ConfigError::InvalidSeconds { index, field, value });
    }
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidSeconds { index, field, value })
}

impl PipelineConfig {
    pub fn new(policies: Vec<PolicyConfig>) -> Self {
        Self { policies }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the pipeline. Fails on a `fallback_default` stage, see [`build_with_default`](Self::build_with_default).
    pub fn build<T, E>(&self) -> Result<Composite<T, E>, ConfigError>
    where
        T: Clone + fmt::Debug + Send + Sync + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.build_stages(None::<fn() -> T>)
    }

    /// Build the pipeline, resolving `fallback_default` stages with `T::default()`.
    pub fn build_with_default<T, E>(&self) -> Result<Composite<T, E>, ConfigError>
    where
        T: Default + Clone + fmt::Debug + Send + Sync + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.build_stages(Some(T::default))
    }

    fn build_stages<T, E, D>(&self, default: Option<D>) -> Result<Composite<T, E>, ConfigError>
    where
        T: Clone + fmt::Debug + Send + Sync + 'static,
        E: fmt::Display + Send + 'static,
        D: Fn() -> T,
    {
        let mut composite = Composite::new();
        for (index, stage) in self.policies.iter().enumerate() {
            match *stage {
                PolicyConfig::Timeout { timeout_secs } => {
                    let duration = seconds(index, "timeout_secs", timeout_secs)?;
                    let policy = TimeoutPolicy::new(duration)
                        .map_err(|source| ConfigError::Timeout { index, source })?;
                    composite.push(policy);
                }
                PolicyConfig::Retry { max_attempts, base_delay_secs, backoff_factor, jitter } => {
                    let base_delay = seconds(index, "base_delay_secs", base_delay_secs)?;
                    let policy = RetryPolicy::<E>::builder()
                        .max_attempts(max_attempts)
                        .base_delay(base_delay)
                        .backoff_factor(backoff_factor)
                        .jitter(jitter)
                        .build()
                        .map_err(|source| ConfigError::Retry { index, source })?;
                    composite.push(policy);
                }
                PolicyConfig::Bulkhead { max_concurrent, acquire_timeout_secs } => {
                    let wait = seconds(index, "acquire_timeout_secs", acquire_timeout_secs)?;
                    let policy = BulkheadPolicy::new(max_concurrent, wait)
                        .map_err(|source| ConfigError::Bulkhead { index, source })?;
                    composite.push(policy);
                }
                PolicyConfig::Fallback { log_error } => {
                    composite.push(FallbackPolicy::<T, E>::none().log_error(log_error));
                }
                PolicyConfig::FallbackDefault { log_error } => {
                    let make = default.as_ref().ok_or(ConfigError::DefaultUnavailable { index })?;
                    composite.push(FallbackPolicy::<T, E>::value(make()).log_error(log_error));
                }
            }
        }
        tracing::debug!(stages = composite.len(), "built policy pipeline from config");
        Ok(composite)
    }

    /// Stages of [`presets::external_api`].
    pub fn external_api() -> Self {
        Self::new(vec![
            PolicyConfig::Timeout { timeout_secs: presets::EXTERNAL_API_TIMEOUT.as_secs_f64() },
            PolicyConfig::Retry {
                max_attempts: presets::EXTERNAL_API_RETRY_ATTEMPTS,
                base_delay_secs: presets::EXTERNAL_API_RETRY_BASE_DELAY.as_secs_f64(),
                backoff_factor: presets::EXTERNAL_API_BACKOFF_FACTOR,
                jitter: true,
            },
            PolicyConfig::Bulkhead {
                max_concurrent: presets::EXTERNAL_API_MAX_CONCURRENT,
                acquire_timeout_secs: presets::EXTERNAL_API_ACQUIRE_TIMEOUT.as_secs_f64(),
            },
        ])
    }

    /// Stages of [`presets::database`].
    pub fn database() -> Self {
        Self::new(vec![
            PolicyConfig::Timeout { timeout_secs: presets::DATABASE_TIMEOUT.as_secs_f64() },
            PolicyConfig::Retry {
                max_attempts: presets::DATABASE_RETRY_ATTEMPTS,
                base_delay_secs: presets::DATABASE_RETRY_BASE_DELAY.as_secs_f64(),
                backoff_factor: presets::DATABASE_BACKOFF_FACTOR,
                jitter: false,
            },
        ])
    }

    /// Stages of [`presets::cache_lookup`].
    pub fn cache_lookup() -> Self {
        Self::new(vec![
            PolicyConfig::Timeout { timeout_secs: presets::CACHE_LOOKUP_TIMEOUT.as_secs_f64() },
            PolicyConfig::Fallback { log_error: false },
        ])
    }

    /// Stages of [`presets::ai_call`].
    pub fn ai_call() -> Self {
        Self::new(vec![
            PolicyConfig::Timeout { timeout_secs: presets::AI_CALL_TIMEOUT.as_secs_f64() },
            PolicyConfig::Retry {
                max_attempts: presets::AI_CALL_RETRY_ATTEMPTS,
                base_delay_secs: presets::AI_CALL_RETRY_BASE_DELAY.as_secs_f64(),
                backoff_factor: presets::AI_CALL_BACKOFF_FACTOR,
                jitter: true,
            },
            PolicyConfig::Bulkhead {
                max_concurrent: presets::AI_CALL_MAX_CONCURRENT,
                acquire_timeout_secs: presets::AI_CALL_ACQUIRE_TIMEOUT.as_secs_f64(),
            },
        ])
    }
}
