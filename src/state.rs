//! Shared per-batch mutable state
//!
//! One [`BatchRunState`] exists per batch and is owned by its orchestrator.
//! Workers write through the orchestrator's serialized recording path; all
//! other components (UI, persistence) read snapshots or call `cancel()`.

use crate::analytics::AnalyticsResult;
use crate::result::{BatchRunResult, RunStatus};
use crate::statistics::BatchStatistics;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;

/// Mutex-protected portion of the batch state
#[derive(Debug, Default)]
struct StateInner {
    /// Results keyed by run index; iteration order follows the index
    results: BTreeMap<usize, BatchRunResult>,

    /// Ordered log of human-readable failure messages
    errors: Vec<String>,

    /// When the batch started
    start_time: Option<chrono::DateTime<chrono::Utc>>,

    /// When the batch reached a terminal state
    end_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// Live state of a single batch
///
/// Flags and counters are atomics so progress reads never block on the
/// results mutex. Cancellation is a cooperative flag backed by a watch
/// channel so pending sleeps can be interrupted.
#[derive(Debug)]
pub struct BatchRunState {
    running: AtomicBool,
    completed_runs: AtomicUsize,
    total_runs: AtomicUsize,
    cancel_tx: watch::Sender<bool>,
    inner: Mutex<StateInner>,
}

impl Default for BatchRunState {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRunState {
    /// Create an empty, idle state
    pub fn new() -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            running: AtomicBool::new(false),
            completed_runs: AtomicUsize::new(0),
            total_runs: AtomicUsize::new(0),
            cancel_tx,
            inner: Mutex::new(StateInner::default()),
        }
    }

    /// Whether a batch is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Number of runs that have reached a terminal status
    pub fn completed_runs(&self) -> usize {
        self.completed_runs.load(Ordering::SeqCst)
    }

    /// Total runs in the batch (fixed at start)
    pub fn total_runs(&self) -> usize {
        self.total_runs.load(Ordering::SeqCst)
    }

    /// Progress as (terminal runs, total runs)
    pub fn progress(&self) -> (usize, usize) {
        (self.completed_runs(), self.total_runs())
    }

    /// When the batch started, if it has
    pub fn start_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.lock_inner().start_time
    }

    /// When the batch finished, if it has
    pub fn end_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.lock_inner().end_time
    }

    /// Request cancellation
    ///
    /// Non-blocking and idempotent. Workers observe the flag before claiming
    /// new runs and between retry attempts; pending backoff sleeps wake up.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Snapshot of all results, ordered by run index
    pub fn snapshot_results(&self) -> Vec<BatchRunResult> {
        self.lock_inner().results.values().cloned().collect()
    }

    /// Snapshot of the error log
    pub fn errors(&self) -> Vec<String> {
        self.lock_inner().errors.clone()
    }

    /// Statistics over the current result snapshot
    pub fn statistics(&self) -> BatchStatistics {
        BatchStatistics::from_results(&self.snapshot_results())
    }

    /// Analytics over the current result snapshot
    pub fn analytics(&self) -> AnalyticsResult {
        AnalyticsResult::from_results(&self.snapshot_results())
    }

    // ------------------------------------------------------------------
    // Orchestrator-internal mutation
    // ------------------------------------------------------------------

    /// Claim the running flag and reset state for a new batch of `total_runs`
    ///
    /// Returns `false` if a batch is already running, leaving state untouched.
    pub(crate) fn try_begin(&self, total_runs: usize) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        {
            let mut inner = self.lock_inner();
            inner.results.clear();
            inner.errors.clear();
            inner.start_time = Some(chrono::Utc::now());
            inner.end_time = None;
        }
        self.completed_runs.store(0, Ordering::SeqCst);
        self.total_runs.store(total_runs, Ordering::SeqCst);
        self.cancel_tx.send_replace(false);
        true
    }

    /// Transition out of running once all in-flight runs have settled
    pub(crate) fn finish(&self) {
        self.lock_inner().end_time = Some(chrono::Utc::now());
        self.running.store(false, Ordering::SeqCst);
    }

    /// Clear everything back to the idle initial values
    pub(crate) fn clear(&self) {
        {
            let mut inner = self.lock_inner();
            inner.results.clear();
            inner.errors.clear();
            inner.start_time = None;
            inner.end_time = None;
        }
        self.completed_runs.store(0, Ordering::SeqCst);
        self.total_runs.store(0, Ordering::SeqCst);
        self.cancel_tx.send_replace(false);
    }

    /// Insert the placeholder for a freshly claimed run
    pub(crate) fn record_started(&self, result: BatchRunResult) {
        debug_assert_eq!(result.status, RunStatus::Running);
        self.lock_inner().results.insert(result.run_index, result);
    }

    /// Record a terminal result and bump the completion counter
    ///
    /// Called exactly once per run index, from the serialized recording path.
    pub(crate) fn record_terminal(&self, result: BatchRunResult) {
        debug_assert!(result.status.is_terminal());
        {
            let mut inner = self.lock_inner();
            if let Some(error) = &result.error {
                inner
                    .errors
                    .push(format!("Run {}: {}", result.run_index, error));
            }
            inner.results.insert(result.run_index, result);
        }
        self.completed_runs.fetch_add(1, Ordering::SeqCst);
    }

    /// Sleep for `duration`, waking early on cancellation
    ///
    /// Returns `true` if the full duration elapsed without cancellation.
    pub(crate) async fn sleep_cancellable(&self, duration: Duration) -> bool {
        let mut cancel_rx = self.cancel_tx.subscribe();
        if *cancel_rx.borrow() {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_cancelled(),
            _ = cancel_rx.changed() => false,
        }
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, StateInner> {
        // A poisoned mutex means a worker panicked mid-write; the data is
        // still structurally sound (single insert/push per critical section).
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_initial_state() {
        let state = BatchRunState::new();
        assert!(!state.is_running());
        assert!(!state.is_cancelled());
        assert_eq!(state.progress(), (0, 0));
        assert!(state.snapshot_results().is_empty());
        assert!(state.errors().is_empty());
    }

    #[test]
    fn test_begin_resets_previous_batch() {
        let state = BatchRunState::new();
        assert!(state.try_begin(3));

        let mut result = BatchRunResult::started(0);
        result.fail("boom".into(), 10.0);
        state.record_terminal(result);
        state.cancel();
        state.finish();

        assert!(state.try_begin(5));
        assert!(state.is_running());
        assert!(!state.is_cancelled());
        assert_eq!(state.progress(), (0, 5));
        assert!(state.snapshot_results().is_empty());
        assert!(state.errors().is_empty());
    }

    #[test]
    fn test_record_terminal_increments_once_per_index() {
        let state = BatchRunState::new();
        assert!(state.try_begin(2));

        for index in 0..2 {
            let mut result = BatchRunResult::started(index);
            state.record_started(result.clone());
            result.complete("ok".into(), None, None, true, 100.0);
            state.record_terminal(result);
        }

        assert_eq!(state.completed_runs(), 2);
        let results = state.snapshot_results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].run_index, 0);
        assert_eq!(results[1].run_index, 1);
    }

    #[test]
    fn test_error_log_format() {
        let state = BatchRunState::new();
        assert!(state.try_begin(1));

        let mut result = BatchRunResult::started(7);
        result.fail("network error: connection reset".into(), 50.0);
        state.record_terminal(result);

        assert_eq!(
            state.errors(),
            vec!["Run 7: network error: connection reset".to_string()]
        );
    }

    #[test]
    fn test_snapshot_ordered_by_run_index() {
        let state = BatchRunState::new();
        assert!(state.try_begin(3));

        // Record out of completion order
        for index in [2usize, 0, 1] {
            let mut result = BatchRunResult::started(index);
            result.complete("ok".into(), None, None, true, 1.0);
            state.record_terminal(result);
        }

        let indices: Vec<usize> = state.snapshot_results().iter().map(|r| r.run_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_sleep_cancellable_full_duration() {
        let state = BatchRunState::new();
        let slept = state.sleep_cancellable(Duration::from_millis(10)).await;
        assert!(slept);
    }

    #[tokio::test]
    async fn test_sleep_cancellable_interrupted() {
        let state = std::sync::Arc::new(BatchRunState::new());

        let sleeper = std::sync::Arc::clone(&state);
        let handle =
            tokio::spawn(
                async move { sleeper.sleep_cancellable(Duration::from_secs(30)).await },
            );

        tokio::time::sleep(Duration::from_millis(20)).await;
        let start = Instant::now();
        state.cancel();

        let slept = handle.await.unwrap();
        assert!(!slept);
        // The sleep must wake well before its full 30s duration
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_sleep_cancellable_already_cancelled() {
        let state = BatchRunState::new();
        state.cancel();
        let slept = state.sleep_cancellable(Duration::from_secs(30)).await;
        assert!(!slept);
    }
}
