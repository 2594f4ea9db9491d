//! prompt-batch-core: Batch execution engine for prompt testing
//!
//! This crate executes a prompt/test definition against a model provider a
//! configurable number of times and analyzes the outcomes. It provides:
//!
//! - A batch orchestrator with sequential or bounded-parallel execution
//! - Retry with capped exponential backoff on transient failures
//! - Cooperative mid-run cancellation
//! - Best-effort progress checkpointing for crash recovery
//! - Statistics (pass rate, latency percentiles, cost) and reliability
//!   analytics over the result set
//!
//! Provider calls, rule validation, and persistence are external
//! collaborators injected as trait objects; see [`traits`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analytics;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod request;
pub mod response;
pub mod result;
pub mod retry;
pub mod rules;
pub mod state;
pub mod statistics;
pub mod traits;

pub use analytics::{AnalyticsResult, CostEfficiency, LatencyPercentiles, Reliability};
pub use config::{BatchRunConfig, ConfigError};
pub use error::{BatchError, BatchResult};
pub use orchestrator::{BatchOrchestrator, BatchOrchestratorBuilder};
pub use request::{Message, ProviderRequest, Role};
pub use response::{CostBreakdown, ProviderResponse, TokenUsage};
pub use result::{BatchRunResult, RunStatus, TestCase};
pub use retry::RetryPolicy;
pub use rules::{OverallResult, RuleCombinator, RuleSet, RuleSetResult};
pub use state::BatchRunState;
pub use statistics::BatchStatistics;
pub use traits::{
    FinalStatus, ModelInfo, NoopCheckpoint, PersistenceCheckpoint, PersistenceError,
    ProviderError, ProviderInvoker, RuleValidator, SessionHandle, ValidationError,
};
