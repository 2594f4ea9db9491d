//! Batch execution logic

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::analytics::AnalyticsResult;
use crate::config::BatchRunConfig;
use crate::error::{BatchError, BatchResult};
use crate::request::ProviderRequest;
use crate::response::{CostBreakdown, TokenUsage};
use crate::result::{BatchRunResult, TestCase};
use crate::retry::RetryPolicy;
use crate::state::BatchRunState;
use crate::statistics::BatchStatistics;
use crate::traits::{
    FinalStatus, PersistenceCheckpoint, ProviderInvoker, RuleValidator, SessionHandle,
};

/// Terminal results recorded between progress checkpoints
const CHECKPOINT_INTERVAL: usize = 5;

/// Orchestrates a single batch's lifecycle
///
/// Owns the batch's [`BatchRunState`] and drives runs either sequentially or
/// through a pool of worker tasks that claim run indices from an atomic
/// counter. Run several batches concurrently by creating one orchestrator
/// per test case.
///
/// Cancellation is cooperative: workers observe the flag before claiming a
/// run and between retry attempts, and pending backoff sleeps wake early.
/// No timeout is imposed on an individual provider call; a call that never
/// returns blocks its worker (and, in sequential mode, the whole batch).
pub struct BatchOrchestrator {
    provider: Arc<dyn ProviderInvoker>,
    validator: Arc<dyn RuleValidator>,
    checkpoint: Arc<dyn PersistenceCheckpoint>,
    test_case: TestCase,
    retry_policy: RetryPolicy,
    state: Arc<BatchRunState>,
}

/// Everything a run needs, shared across workers via Arc
struct JobContext {
    provider: Arc<dyn ProviderInvoker>,
    validator: Arc<dyn RuleValidator>,
    test_case: TestCase,
    config: BatchRunConfig,
    retry_policy: RetryPolicy,
    state: Arc<BatchRunState>,
}

/// Outcome of a single successful attempt
struct AttemptOutcome {
    response: String,
    token_usage: Option<TokenUsage>,
    cost: Option<CostBreakdown>,
    passed: bool,
}

impl BatchOrchestrator {
    /// Create a new orchestrator
    ///
    /// Use [`BatchOrchestratorBuilder`](super::BatchOrchestratorBuilder) for
    /// a more ergonomic construction.
    pub fn new(
        provider: Arc<dyn ProviderInvoker>,
        validator: Arc<dyn RuleValidator>,
        checkpoint: Arc<dyn PersistenceCheckpoint>,
        test_case: TestCase,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            validator,
            checkpoint,
            test_case,
            retry_policy,
            state: Arc::new(BatchRunState::new()),
        }
    }

    /// Live state handle for progress display and cancellation
    pub fn state(&self) -> Arc<BatchRunState> {
        Arc::clone(&self.state)
    }

    /// Statistics over the current result snapshot
    pub fn statistics(&self) -> BatchStatistics {
        self.state.statistics()
    }

    /// Analytics over the current result snapshot
    pub fn analytics(&self) -> AnalyticsResult {
        self.state.analytics()
    }

    /// Request cancellation of the running batch
    ///
    /// Non-blocking. Already-claimed runs finish their current attempt and
    /// then stop; no new run starts after the flag is observed.
    pub fn cancel(&self) {
        tracing::info!(test_id = %self.test_case.id, "Batch cancellation requested");
        self.state.cancel();
    }

    /// Clear all state back to idle
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::BatchInProgress`] if a batch is still running.
    pub fn reset(&self) -> BatchResult<()> {
        if self.state.is_running() {
            return Err(BatchError::BatchInProgress);
        }
        self.state.clear();
        Ok(())
    }

    /// Run a batch to a terminal state
    ///
    /// Resolves once every claimed run has settled, whether the batch
    /// completed naturally or was cancelled. Individual run failures are
    /// recorded in the result set and never abort the batch.
    ///
    /// # Errors
    ///
    /// Returns an error only for lifecycle misuse (a batch already running
    /// on this instance) or an invalid config.
    pub async fn start(&self, config: BatchRunConfig) -> BatchResult<()> {
        config
            .validate()
            .map_err(|e| BatchError::config(e.to_string()))?;

        if !self.state.try_begin(config.run_count) {
            return Err(BatchError::AlreadyRunning);
        }

        let total_runs = config.run_count;
        let concurrency = config.effective_concurrency();
        let started = Instant::now();

        tracing::info!(
            test_id = %self.test_case.id,
            provider = %config.provider_id,
            model = %config.model,
            total_runs,
            concurrency,
            "Starting batch"
        );

        let session = self.persist_start(&config).await;

        let ctx = Arc::new(JobContext {
            provider: Arc::clone(&self.provider),
            validator: Arc::clone(&self.validator),
            test_case: self.test_case.clone(),
            config: config.clone(),
            retry_policy: self.retry_policy,
            state: Arc::clone(&self.state),
        });

        let (results_tx, mut results_rx) = mpsc::channel::<BatchRunResult>(total_runs);

        let mut handles = Vec::new();
        if concurrency > 1 {
            // Worker pool: each worker claims the next unclaimed index from
            // a shared atomic counter until none remain or cancellation is
            // observed. Pool size is the only backpressure.
            let claim_counter = Arc::new(AtomicUsize::new(0));
            for worker_id in 0..concurrency.min(total_runs) {
                let ctx = Arc::clone(&ctx);
                let counter = Arc::clone(&claim_counter);
                let tx = results_tx.clone();

                handles.push(tokio::spawn(async move {
                    loop {
                        if ctx.state.is_cancelled() {
                            tracing::debug!(worker_id, "Worker observed cancellation");
                            break;
                        }
                        let claimed = counter.fetch_add(1, Ordering::SeqCst);
                        if claimed >= ctx.config.run_count {
                            break;
                        }
                        let result = run_job(&ctx, claimed).await;
                        if tx.send(result).await.is_err() {
                            break;
                        }
                    }
                    tracing::debug!(worker_id, "Worker finished");
                }));
            }
        } else {
            // Sequential mode: ordered loop with an optional fixed delay
            // before every run except the first.
            let ctx = Arc::clone(&ctx);
            let tx = results_tx.clone();

            handles.push(tokio::spawn(async move {
                for run_index in 0..ctx.config.run_count {
                    if ctx.state.is_cancelled() {
                        break;
                    }
                    if run_index > 0 && ctx.config.delay_ms > 0 {
                        let delay = std::time::Duration::from_millis(ctx.config.delay_ms);
                        if !ctx.state.sleep_cancellable(delay).await {
                            break;
                        }
                    }
                    let result = run_job(&ctx, run_index).await;
                    if tx.send(result).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(results_tx);

        // Single recording path: all state writes and the completion counter
        // go through here, serialized by the channel.
        let mut terminal_count = 0usize;
        while let Some(result) = results_rx.recv().await {
            self.state.record_terminal(result);
            terminal_count += 1;

            if terminal_count % CHECKPOINT_INTERVAL == 0 || terminal_count == total_runs {
                self.spawn_progress_checkpoint(&session);
            }
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker task panicked");
            }
        }

        let final_status = if self.state.is_cancelled() {
            FinalStatus::Cancelled
        } else {
            FinalStatus::Completed
        };
        self.state.finish();

        self.persist_completion(&session, final_status).await;

        let statistics = self.state.statistics();
        tracing::info!(
            test_id = %self.test_case.id,
            elapsed_secs = started.elapsed().as_secs_f64(),
            terminal_runs = terminal_count,
            pass_rate = statistics.pass_rate,
            error_rate = statistics.error_rate,
            status = ?final_status,
            "Batch finished"
        );

        Ok(())
    }

    /// Notify persistence of batch start; failure is logged and ignored
    async fn persist_start(&self, config: &BatchRunConfig) -> Option<SessionHandle> {
        match self
            .checkpoint
            .save_batch_start(config, &self.test_case.id, config.project_id.as_deref())
            .await
        {
            Ok(session) => {
                tracing::debug!(%session, "Batch session persisted");
                Some(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to persist batch start, continuing without checkpoints");
                None
            }
        }
    }

    /// Push a progress snapshot on a detached task so recording never stalls
    fn spawn_progress_checkpoint(&self, session: &Option<SessionHandle>) {
        let Some(session) = session.clone() else {
            return;
        };
        let checkpoint = Arc::clone(&self.checkpoint);
        let results = self.state.snapshot_results();
        let statistics = BatchStatistics::from_results(&results);

        tokio::spawn(async move {
            if let Err(e) = checkpoint
                .update_progress(&session, &results, &statistics)
                .await
            {
                tracing::warn!(%session, error = %e, "Progress checkpoint failed");
            }
        });
    }

    /// Notify persistence of the final state; failure is logged and ignored
    async fn persist_completion(&self, session: &Option<SessionHandle>, status: FinalStatus) {
        let Some(session) = session else {
            return;
        };
        let results = self.state.snapshot_results();
        let statistics = BatchStatistics::from_results(&results);

        if let Err(e) = self
            .checkpoint
            .complete_session(session, &results, &statistics, status)
            .await
        {
            tracing::warn!(%session, error = %e, "Failed to persist batch completion");
        }
    }
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("provider", &self.provider.provider_id())
            .field("test_case", &self.test_case.id)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

/// Execute one claimed run index through the retry loop
async fn run_job(ctx: &JobContext, run_index: usize) -> BatchRunResult {
    let mut result = BatchRunResult::started(run_index);

    // Claimed after cancellation: record immediately, no provider call
    if ctx.state.is_cancelled() {
        result.cancel();
        return result;
    }

    ctx.state.record_started(result.clone());
    let started = Instant::now();
    let max_retries = ctx.config.max_retries;
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            let delay = ctx.retry_policy.backoff_delay(attempt - 1);
            tracing::debug!(run_index, attempt, delay_ms = delay.as_millis() as u64, "Backing off before retry");
            if !ctx.state.sleep_cancellable(delay).await {
                result.cancel();
                return result;
            }
            result.retry_count = attempt;
        }

        match execute_attempt(ctx, run_index).await {
            Ok(outcome) => {
                // A call that was in flight when cancellation arrived is
                // allowed to finish, but its outcome is discarded.
                if ctx.state.is_cancelled() {
                    result.cancel();
                    return result;
                }
                result.complete(
                    outcome.response,
                    outcome.token_usage,
                    outcome.cost,
                    outcome.passed,
                    elapsed_ms(started),
                );
                return result;
            }
            Err(message) => {
                tracing::warn!(run_index, attempt, error = %message, "Run attempt failed");
                if ctx.state.is_cancelled() {
                    result.cancel();
                    return result;
                }
                if !ctx.retry_policy.should_retry(attempt, max_retries) {
                    result.fail(message, elapsed_ms(started));
                    return result;
                }
                attempt += 1;
            }
        }
    }
}

/// One attempt: resolve the model, call the provider, validate the response
///
/// Any failure (configuration, provider, validation) is returned as a
/// message and consumes one slot of the attempt budget.
async fn execute_attempt(ctx: &JobContext, run_index: usize) -> Result<AttemptOutcome, String> {
    let provider = &ctx.provider;
    let config = &ctx.config;

    if provider.provider_id() != config.provider_id {
        return Err(format!(
            "provider '{}' not available (invoker is '{}')",
            config.provider_id,
            provider.provider_id()
        ));
    }
    if !provider.models().iter().any(|m| m.id == config.model) {
        return Err(format!(
            "model '{}' not available on provider '{}'",
            config.model, config.provider_id
        ));
    }

    let mut request = ProviderRequest::new(config.model.clone(), ctx.test_case.messages.clone());
    if let Some(temperature) = ctx.test_case.temperature {
        request = request.with_temperature(temperature);
    }
    if let Some(max_tokens) = config.max_tokens {
        request = request.with_max_tokens(max_tokens);
    }

    let response = provider.call(&request).await.map_err(|e| e.to_string())?;

    let passed = if ctx.test_case.rule_sets.is_empty() {
        true
    } else {
        let rule_results = ctx
            .validator
            .validate_rule_sets(&ctx.test_case.rule_sets, &response.content)
            .map_err(|e| e.to_string())?;
        ctx.validator.overall_result(&rule_results).pass
    };

    tracing::debug!(run_index, passed, "Run attempt succeeded");

    Ok(AttemptOutcome {
        response: response.content,
        token_usage: response.usage,
        cost: response.cost,
        passed,
    })
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
