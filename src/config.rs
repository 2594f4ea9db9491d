//! Batch run configuration types

use serde::{Deserialize, Serialize};

/// Configuration for a single batch run
///
/// Created once when a batch is started and never mutated afterwards.
/// Defines how many times the test executes, the retry budget, and
/// whether runs execute sequentially or with bounded parallelism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRunConfig {
    /// Identity of the test being executed
    pub test_id: String,

    /// Identity of the project the test belongs to (for persistence)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Provider identifier (e.g., "openai", "anthropic")
    pub provider_id: String,

    /// Model identifier (e.g., "gpt-4o")
    pub model: String,

    /// Number of runs to execute (>= 1)
    pub run_count: usize,

    /// Additional attempts allowed per run after the first (>= 0)
    pub max_retries: u32,

    /// Fixed delay between runs in milliseconds (sequential mode only)
    pub delay_ms: u64,

    /// Whether runs may execute in parallel
    pub allow_parallel: bool,

    /// Maximum concurrently executing runs (meaningful only when
    /// `allow_parallel` is set; >= 1)
    pub parallel_concurrency: usize,

    /// Optional max-tokens override passed through to the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for BatchRunConfig {
    fn default() -> Self {
        Self {
            test_id: String::new(),
            project_id: None,
            provider_id: String::new(),
            model: String::new(),
            run_count: 1,
            max_retries: 0,
            delay_ms: 0,
            allow_parallel: false,
            parallel_concurrency: 1,
            max_tokens: None,
        }
    }
}

impl BatchRunConfig {
    /// Create a config for the given test, provider, and model
    pub fn new(
        test_id: impl Into<String>,
        provider_id: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            provider_id: provider_id.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the run count
    pub fn with_run_count(mut self, count: usize) -> Self {
        self.run_count = count;
        self
    }

    /// Set the retry budget
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the inter-run delay (sequential mode)
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Enable parallel execution with the given concurrency
    pub fn with_parallel(mut self, concurrency: usize) -> Self {
        self.allow_parallel = true;
        self.parallel_concurrency = concurrency;
        self
    }

    /// Set the max-tokens override
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Effective concurrency for this config
    ///
    /// Sequential mode and `parallel_concurrency = 1` are equivalent.
    pub fn effective_concurrency(&self) -> usize {
        if self.allow_parallel {
            self.parallel_concurrency.max(1)
        } else {
            1
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_count == 0 {
            return Err(ConfigError::InvalidRunCount(
                "run count must be at least 1".into(),
            ));
        }

        if self.allow_parallel && self.parallel_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(
                "parallel concurrency must be at least 1".into(),
            ));
        }

        if self.provider_id.is_empty() {
            return Err(ConfigError::MissingProvider);
        }

        if self.model.is_empty() {
            return Err(ConfigError::MissingModel);
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid run count
    #[error("invalid run count: {0}")]
    InvalidRunCount(String),

    /// Invalid concurrency value
    #[error("invalid concurrency: {0}")]
    InvalidConcurrency(String),

    /// No provider configured
    #[error("no provider configured")]
    MissingProvider,

    /// No model configured
    #[error("no model configured")]
    MissingModel,
}
