//! Batch statistics aggregation
//!
//! Stateless projections over a result set. Statistics are recomputed on
//! demand and never stored; during a run they are eventual-consistency
//! snapshots, and after the batch finishes they reflect every terminal
//! result.

use crate::result::{BatchRunResult, RunStatus};

use serde::{Deserialize, Serialize};

/// Summary statistics over a batch's result set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStatistics {
    /// Results in the set (terminal or running)
    pub total_runs: usize,

    /// Runs with status completed
    pub completed_runs: usize,

    /// Runs with status failed
    pub failed_runs: usize,

    /// Completed runs that passed validation
    pub passed_runs: usize,

    /// Passed / completed, as a percentage (0 when nothing completed)
    pub pass_rate: f64,

    /// Mean duration over completed runs (ms)
    pub avg_duration_ms: f64,

    /// Median duration over completed runs (ms)
    pub p50_duration_ms: f64,

    /// 90th percentile duration over completed runs (ms)
    pub p90_duration_ms: f64,

    /// Mean total tokens over completed runs that report usage
    pub avg_tokens: f64,

    /// Sum of costs over completed runs that report cost
    pub total_cost: f64,

    /// Mean cost over completed runs that report cost
    pub avg_cost: f64,

    /// Failed / total, as a percentage
    pub error_rate: f64,
}

impl BatchStatistics {
    /// Compute statistics from a result set
    ///
    /// Every division guards against a zero denominator by yielding 0.
    pub fn from_results(results: &[BatchRunResult]) -> Self {
        let total_runs = results.len();

        let completed: Vec<&BatchRunResult> = results
            .iter()
            .filter(|r| r.status == RunStatus::Completed)
            .collect();
        let failed_runs = results
            .iter()
            .filter(|r| r.status == RunStatus::Failed)
            .count();
        let passed_runs = completed.iter().filter(|r| r.passed == Some(true)).count();

        let pass_rate = ratio_pct(passed_runs, completed.len());
        let error_rate = ratio_pct(failed_runs, total_runs);

        let mut durations: Vec<f64> = completed.iter().filter_map(|r| r.duration_ms).collect();
        durations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let avg_duration_ms = mean(&durations);
        let p50_duration_ms = percentile_floor(&durations, 0.50);
        let p90_duration_ms = percentile_floor(&durations, 0.90);

        let token_totals: Vec<f64> = completed
            .iter()
            .filter_map(|r| r.token_usage.map(|u| u.total_tokens as f64))
            .collect();
        let avg_tokens = mean(&token_totals);

        let costs: Vec<f64> = completed.iter().filter_map(|r| r.cost).collect();
        let total_cost: f64 = costs.iter().sum();
        let avg_cost = if costs.is_empty() {
            0.0
        } else {
            total_cost / costs.len() as f64
        };

        Self {
            total_runs,
            completed_runs: completed.len(),
            failed_runs,
            passed_runs,
            pass_rate,
            avg_duration_ms,
            p50_duration_ms,
            p90_duration_ms,
            avg_tokens,
            total_cost,
            avg_cost,
            error_rate,
        }
    }
}

/// Percentile by sorted index: `sorted[floor(n * p)]`, clamped to the last
/// element. Returns 0 on empty input.
pub(crate) fn percentile_floor(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 * p).floor() as usize).min(sorted.len() - 1);
    sorted[idx]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn ratio_pct(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::TokenUsage;

    fn completed(duration_ms: f64, passed: bool) -> BatchRunResult {
        let mut result = BatchRunResult::started(0);
        result.complete("ok".into(), None, None, passed, duration_ms);
        result
    }

    fn failed(msg: &str) -> BatchRunResult {
        let mut result = BatchRunResult::started(0);
        result.fail(msg.into(), 10.0);
        result
    }

    #[test]
    fn test_empty_results_all_zero() {
        let stats = BatchStatistics::from_results(&[]);
        assert_eq!(stats.total_runs, 0);
        assert_eq!(stats.pass_rate, 0.0);
        assert_eq!(stats.avg_duration_ms, 0.0);
        assert_eq!(stats.p50_duration_ms, 0.0);
        assert_eq!(stats.p90_duration_ms, 0.0);
        assert_eq!(stats.avg_tokens, 0.0);
        assert_eq!(stats.total_cost, 0.0);
        assert_eq!(stats.avg_cost, 0.0);
        assert_eq!(stats.error_rate, 0.0);
    }

    #[test]
    fn test_uniform_durations() {
        // Five completed runs at 1000ms each, all passing
        let results: Vec<BatchRunResult> = (0..5).map(|_| completed(1000.0, true)).collect();
        let stats = BatchStatistics::from_results(&results);

        assert_eq!(stats.completed_runs, 5);
        assert_eq!(stats.p50_duration_ms, 1000.0);
        assert_eq!(stats.p90_duration_ms, 1000.0);
        assert_eq!(stats.avg_duration_ms, 1000.0);
        assert_eq!(stats.pass_rate, 100.0);
        assert_eq!(stats.error_rate, 0.0);
    }

    #[test]
    fn test_pass_rate_over_completed_only() {
        let results = vec![
            completed(100.0, true),
            completed(200.0, false),
            failed("boom"),
        ];
        let stats = BatchStatistics::from_results(&results);

        assert_eq!(stats.completed_runs, 2);
        assert_eq!(stats.failed_runs, 1);
        assert_eq!(stats.passed_runs, 1);
        assert_eq!(stats.pass_rate, 50.0);
        // 1 failed out of 3 total
        assert!((stats.error_rate - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_floor_indexing() {
        let sorted = vec![100.0, 200.0, 300.0, 400.0];
        // floor(4 * 0.5) = 2
        assert_eq!(percentile_floor(&sorted, 0.50), 300.0);
        // floor(4 * 0.9) = 3
        assert_eq!(percentile_floor(&sorted, 0.90), 400.0);
        // Clamped to last element
        assert_eq!(percentile_floor(&sorted, 1.0), 400.0);
    }

    #[test]
    fn test_token_and_cost_aggregation() {
        let mut with_tokens = BatchRunResult::started(0);
        with_tokens.complete(
            "ok".into(),
            Some(TokenUsage::new(100, 50)),
            Some(crate::response::CostBreakdown::new(0.01, 0.02)),
            true,
            100.0,
        );

        let mut with_more = BatchRunResult::started(1);
        with_more.complete(
            "ok".into(),
            Some(TokenUsage::new(200, 100)),
            Some(crate::response::CostBreakdown::new(0.02, 0.05)),
            true,
            200.0,
        );

        // Completed run without usage or cost data is excluded from averages
        let without = completed(300.0, true);

        let stats = BatchStatistics::from_results(&[with_tokens, with_more, without]);

        assert_eq!(stats.avg_tokens, 225.0);
        assert!((stats.total_cost - 0.10).abs() < 1e-9);
        assert!((stats.avg_cost - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_fully_failed_batch() {
        let results: Vec<BatchRunResult> = (0..4).map(|_| failed("always down")).collect();
        let stats = BatchStatistics::from_results(&results);

        assert_eq!(stats.completed_runs, 0);
        assert_eq!(stats.failed_runs, 4);
        assert_eq!(stats.pass_rate, 0.0);
        assert_eq!(stats.error_rate, 100.0);
    }
}
