//! Collaborator traits consumed by the orchestrator
//!
//! The engine never talks to a network, rule engine, or database directly.
//! Each collaborator is injected at construction time as a trait object,
//! which keeps the orchestrator testable with doubles.

use crate::config::BatchRunConfig;
use crate::request::ProviderRequest;
use crate::response::ProviderResponse;
use crate::result::BatchRunResult;
use crate::rules::{OverallResult, RuleSet, RuleSetResult};
use crate::statistics::BatchStatistics;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// Provider Invoker
// ============================================================================

/// Model descriptor exposed by a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier (e.g., "gpt-4o")
    pub id: String,

    /// Human-readable display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ModelInfo {
    /// Create a model descriptor with an id only
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }
}

/// Performs one request/response exchange with a model provider
///
/// Implementations handle provider-specific API details; the orchestrator
/// only sees this interface. Errors surface through the retry loop.
#[async_trait]
pub trait ProviderInvoker: Send + Sync {
    /// Provider identifier (e.g., "openai", "anthropic")
    fn provider_id(&self) -> &str;

    /// Models offered by this provider
    fn models(&self) -> Vec<ModelInfo>;

    /// Execute one exchange with the provider
    async fn call(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}

/// Provider-side errors
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Network-level failure
    #[error("network error: {0}")]
    Network(String),

    /// Provider API returned an error
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the provider
        message: String,
    },

    /// Requested model is not offered by this provider
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Rate limited by the provider
    #[error("rate limited")]
    RateLimited,

    /// Invalid request format
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

// ============================================================================
// Rule Validator
// ============================================================================

/// Scores a response against a test's validation rules
///
/// Rule evaluation semantics (AND/OR within a set, individual rule types)
/// live entirely behind this boundary.
pub trait RuleValidator: Send + Sync {
    /// Evaluate each rule set against the response text
    fn validate_rule_sets(
        &self,
        rule_sets: &[RuleSet],
        response_text: &str,
    ) -> Result<Vec<RuleSetResult>, ValidationError>;

    /// Combine per-set outcomes into an overall pass/fail
    fn overall_result(&self, results: &[RuleSetResult]) -> OverallResult;
}

/// Rule validation errors (malformed definitions, not failed rules)
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// A rule definition could not be interpreted
    #[error("malformed rule in set '{rule_set_id}': {message}")]
    MalformedRule {
        /// Rule set containing the bad definition
        rule_set_id: String,
        /// Description of the problem
        message: String,
    },
}

// ============================================================================
// Persistence Checkpoint
// ============================================================================

/// Opaque handle to a persisted batch session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle(pub String);

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal status of a batch, as reported to persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalStatus {
    /// All claimed runs reached a terminal status naturally
    Completed,
    /// The batch was cancelled before finishing
    Cancelled,
}

/// Best-effort progress checkpointing for crash recovery
///
/// Every method may fail without affecting batch execution; the orchestrator
/// logs checkpoint failures and moves on.
#[async_trait]
pub trait PersistenceCheckpoint: Send + Sync {
    /// Record that a batch has started; returns a session handle
    async fn save_batch_start(
        &self,
        config: &BatchRunConfig,
        test_id: &str,
        project_id: Option<&str>,
    ) -> Result<SessionHandle, PersistenceError>;

    /// Snapshot current results and statistics
    async fn update_progress(
        &self,
        session: &SessionHandle,
        results: &[BatchRunResult],
        statistics: &BatchStatistics,
    ) -> Result<(), PersistenceError>;

    /// Record the final state of the batch
    async fn complete_session(
        &self,
        session: &SessionHandle,
        results: &[BatchRunResult],
        statistics: &BatchStatistics,
        final_status: FinalStatus,
    ) -> Result<(), PersistenceError>;
}

/// Persistence-layer errors (always swallowed by the orchestrator)
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Storage backend failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Session handle is unknown to the backend
    #[error("unknown session: {0}")]
    UnknownSession(String),
}

/// A checkpoint that persists nothing
///
/// Default collaborator for callers that do not need crash recovery.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCheckpoint;

#[async_trait]
impl PersistenceCheckpoint for NoopCheckpoint {
    async fn save_batch_start(
        &self,
        _config: &BatchRunConfig,
        _test_id: &str,
        _project_id: Option<&str>,
    ) -> Result<SessionHandle, PersistenceError> {
        Ok(SessionHandle("noop".to_string()))
    }

    async fn update_progress(
        &self,
        _session: &SessionHandle,
        _results: &[BatchRunResult],
        _statistics: &BatchStatistics,
    ) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn complete_session(
        &self,
        _session: &SessionHandle,
        _results: &[BatchRunResult],
        _statistics: &BatchStatistics,
        _final_status: FinalStatus,
    ) -> Result<(), PersistenceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_status_serialization() {
        assert_eq!(
            serde_json::to_string(&FinalStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(
            serde_json::to_string(&FinalStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[tokio::test]
    async fn test_noop_checkpoint() {
        let checkpoint = NoopCheckpoint;
        let config = BatchRunConfig::new("t", "p", "m");

        let handle = checkpoint
            .save_batch_start(&config, "t", None)
            .await
            .unwrap();
        let stats = BatchStatistics::from_results(&[]);

        assert!(checkpoint
            .update_progress(&handle, &[], &stats)
            .await
            .is_ok());
        assert!(checkpoint
            .complete_session(&handle, &[], &stats, FinalStatus::Completed)
            .await
            .is_ok());
    }
}
