//! Builder pattern for BatchOrchestrator construction

use std::sync::Arc;

use crate::error::{BatchError, BatchResult};
use crate::result::TestCase;
use crate::retry::RetryPolicy;
use crate::traits::{NoopCheckpoint, PersistenceCheckpoint, ProviderInvoker, RuleValidator};

use super::executor::BatchOrchestrator;

/// Builder for creating a [`BatchOrchestrator`] with injected collaborators
///
/// Provider, validator, and test case are required; the persistence
/// checkpoint defaults to a no-op.
///
/// # Example
///
/// ```ignore
/// let orchestrator = BatchOrchestratorBuilder::new()
///     .provider(provider)
///     .validator(validator)
///     .checkpoint(checkpoint)
///     .test_case(test)
///     .build()?;
/// ```
pub struct BatchOrchestratorBuilder {
    provider: Option<Arc<dyn ProviderInvoker>>,
    validator: Option<Arc<dyn RuleValidator>>,
    checkpoint: Arc<dyn PersistenceCheckpoint>,
    test_case: Option<TestCase>,
    retry_policy: RetryPolicy,
}

impl BatchOrchestratorBuilder {
    /// Create a new builder with default retry policy and no-op checkpoint
    pub fn new() -> Self {
        Self {
            provider: None,
            validator: None,
            checkpoint: Arc::new(NoopCheckpoint),
            test_case: None,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Set the provider invoker
    pub fn provider(mut self, provider: Arc<dyn ProviderInvoker>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the rule validator
    pub fn validator(mut self, validator: Arc<dyn RuleValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Set the persistence checkpoint
    pub fn checkpoint(mut self, checkpoint: Arc<dyn PersistenceCheckpoint>) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    /// Set the test case this orchestrator executes
    pub fn test_case(mut self, test_case: TestCase) -> Self {
        self.test_case = Some(test_case);
        self
    }

    /// Override the retry backoff policy
    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if provider, validator, or test case are not set.
    pub fn build(self) -> BatchResult<BatchOrchestrator> {
        let provider = self.provider.ok_or_else(|| BatchError::missing("provider"))?;
        let validator = self
            .validator
            .ok_or_else(|| BatchError::missing("validator"))?;
        let test_case = self
            .test_case
            .ok_or_else(|| BatchError::missing("test case"))?;

        Ok(BatchOrchestrator::new(
            provider,
            validator,
            self.checkpoint,
            test_case,
            self.retry_policy,
        ))
    }
}

impl Default for BatchOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
