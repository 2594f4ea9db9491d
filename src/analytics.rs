//! Reliability and cost-efficiency analytics
//!
//! A richer projection than [`BatchStatistics`](crate::statistics::BatchStatistics),
//! computed over a completed result set: full latency percentiles, cost per
//! successful run and per token, outcome-consistency scoring, and textual
//! recommendations for the user.

use crate::result::{BatchRunResult, RunStatus};
use crate::statistics::percentile_floor;

use serde::{Deserialize, Serialize};

/// Recommendation shown when p90 latency exceeds the threshold
pub const REC_HIGH_LATENCY: &str = "High latency detected - optimize prompts";

/// Recommendation shown when outcome consistency is low
pub const REC_LOW_CONSISTENCY: &str = "Consider reviewing test consistency";

/// Recommendation shown when neither warning fired
pub const REC_PERFORMING_WELL: &str = "Batch execution performing well";

/// p90 latency threshold (ms) above which the latency warning fires
const HIGH_LATENCY_P90_MS: f64 = 2_000.0;

/// Consistency score below which the consistency warning fires
const LOW_CONSISTENCY_SCORE: u32 = 70;

/// Latency percentiles over completed-run durations (ms)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LatencyPercentiles {
    /// 25th percentile
    pub p25: f64,
    /// 50th percentile (median)
    pub p50: f64,
    /// 75th percentile
    pub p75: f64,
    /// 90th percentile
    pub p90: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
}

impl LatencyPercentiles {
    /// Compute percentiles from an unsorted set of durations
    pub fn from_durations(durations: &[f64]) -> Self {
        if durations.is_empty() {
            return Self::default();
        }

        let mut sorted = durations.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        Self {
            p25: percentile_floor(&sorted, 0.25),
            p50: percentile_floor(&sorted, 0.50),
            p75: percentile_floor(&sorted, 0.75),
            p90: percentile_floor(&sorted, 0.90),
            p95: percentile_floor(&sorted, 0.95),
            p99: percentile_floor(&sorted, 0.99),
        }
    }
}

/// Cost efficiency over a result set
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CostEfficiency {
    /// Mean cost among runs that passed and report a cost
    pub cost_per_success: f64,

    /// Total cost divided by total tokens, over completed runs
    pub cost_per_token: f64,
}

/// Outcome predictability scoring
///
/// Consistency measures how far the pass rate sits from a maximally
/// unpredictable 50/50 split; it rewards both very high and very low pass
/// rates. It is a measure of predictability, not quality.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Reliability {
    /// 0-100 consistency score (100 = fully predictable outcomes)
    pub consistency: u32,

    /// Half the consistency score, rounded
    pub stability_score: u32,
}

/// Full analytics over a batch's result set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsResult {
    /// Latency percentiles over completed runs
    pub latency_percentiles: LatencyPercentiles,

    /// Cost-efficiency figures
    pub cost_efficiency: CostEfficiency,

    /// Outcome predictability scores
    pub reliability: Reliability,

    /// Ordered, human-readable recommendations
    pub recommendations: Vec<String>,
}

impl AnalyticsResult {
    /// Compute analytics from a result set
    pub fn from_results(results: &[BatchRunResult]) -> Self {
        let completed: Vec<&BatchRunResult> = results
            .iter()
            .filter(|r| r.status == RunStatus::Completed)
            .collect();

        let durations: Vec<f64> = completed.iter().filter_map(|r| r.duration_ms).collect();
        let latency_percentiles = LatencyPercentiles::from_durations(&durations);

        let cost_efficiency = cost_efficiency(&completed);
        let reliability = reliability(&completed);

        let mut recommendations = Vec::new();
        if latency_percentiles.p90 > HIGH_LATENCY_P90_MS {
            recommendations.push(REC_HIGH_LATENCY.to_string());
        }
        if reliability.consistency < LOW_CONSISTENCY_SCORE {
            recommendations.push(REC_LOW_CONSISTENCY.to_string());
        }
        if recommendations.is_empty() {
            recommendations.push(REC_PERFORMING_WELL.to_string());
        }

        Self {
            latency_percentiles,
            cost_efficiency,
            reliability,
            recommendations,
        }
    }
}

fn cost_efficiency(completed: &[&BatchRunResult]) -> CostEfficiency {
    let success_costs: Vec<f64> = completed
        .iter()
        .filter(|r| r.passed == Some(true))
        .filter_map(|r| r.cost)
        .collect();
    let cost_per_success = if success_costs.is_empty() {
        0.0
    } else {
        success_costs.iter().sum::<f64>() / success_costs.len() as f64
    };

    let total_cost: f64 = completed.iter().filter_map(|r| r.cost).sum();
    let total_tokens: usize = completed
        .iter()
        .filter_map(|r| r.token_usage.map(|u| u.total_tokens))
        .sum();
    let cost_per_token = if total_tokens == 0 {
        0.0
    } else {
        total_cost / total_tokens as f64
    };

    CostEfficiency {
        cost_per_success,
        cost_per_token,
    }
}

fn reliability(completed: &[&BatchRunResult]) -> Reliability {
    // No completed runs means no signal at all; score zero so the
    // consistency recommendation fires rather than reporting a perfectly
    // predictable empty batch.
    if completed.is_empty() {
        return Reliability {
            consistency: 0,
            stability_score: 0,
        };
    }

    let passed = completed.iter().filter(|r| r.passed == Some(true)).count();
    let p = passed as f64 / completed.len() as f64;
    let variance = p * (1.0 - p);
    let consistency = ((1.0 - variance) * 100.0).round() as u32;
    let stability_score = (consistency as f64 / 2.0).round() as u32;

    Reliability {
        consistency,
        stability_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{CostBreakdown, TokenUsage};

    fn completed(duration_ms: f64, passed: bool) -> BatchRunResult {
        let mut result = BatchRunResult::started(0);
        result.complete("ok".into(), None, None, passed, duration_ms);
        result
    }

    #[test]
    fn test_empty_results() {
        let analytics = AnalyticsResult::from_results(&[]);

        assert_eq!(analytics.latency_percentiles.p50, 0.0);
        assert_eq!(analytics.latency_percentiles.p99, 0.0);
        assert_eq!(analytics.cost_efficiency.cost_per_success, 0.0);
        assert_eq!(analytics.reliability.consistency, 0);
        assert_eq!(
            analytics.recommendations,
            vec![REC_LOW_CONSISTENCY.to_string()]
        );
    }

    #[test]
    fn test_percentile_monotonicity() {
        let durations: Vec<f64> = (1..=37).map(|i| (i * 13 % 29) as f64 * 100.0).collect();
        let p = LatencyPercentiles::from_durations(&durations);

        assert!(p.p25 <= p.p50);
        assert!(p.p50 <= p.p75);
        assert!(p.p75 <= p.p90);
        assert!(p.p90 <= p.p95);
        assert!(p.p95 <= p.p99);
    }

    #[test]
    fn test_alternating_pass_fail_consistency() {
        // 10 completed runs alternating pass/fail: p = 0.5, variance = 0.25
        let results: Vec<BatchRunResult> =
            (0..10).map(|i| completed(100.0, i % 2 == 0)).collect();
        let analytics = AnalyticsResult::from_results(&results);

        assert_eq!(analytics.reliability.consistency, 75);
        assert_eq!(analytics.reliability.stability_score, 38);
    }

    #[test]
    fn test_all_passed_consistency_is_perfect() {
        let results: Vec<BatchRunResult> = (0..8).map(|_| completed(100.0, true)).collect();
        let analytics = AnalyticsResult::from_results(&results);

        assert_eq!(analytics.reliability.consistency, 100);
        assert_eq!(analytics.reliability.stability_score, 50);
    }

    #[test]
    fn test_all_failed_validation_still_consistent() {
        // 0% pass rate is just as predictable as 100%
        let results: Vec<BatchRunResult> = (0..8).map(|_| completed(100.0, false)).collect();
        let analytics = AnalyticsResult::from_results(&results);

        assert_eq!(analytics.reliability.consistency, 100);
    }

    #[test]
    fn test_high_latency_recommendation() {
        // Durations [4500, 5000, 5500, 7000], all passed: p90 = 7000
        let results: Vec<BatchRunResult> = [5000.0, 5500.0, 4500.0, 7000.0]
            .iter()
            .map(|&d| completed(d, true))
            .collect();
        let analytics = AnalyticsResult::from_results(&results);

        assert_eq!(analytics.latency_percentiles.p90, 7000.0);
        assert!(analytics
            .recommendations
            .contains(&REC_HIGH_LATENCY.to_string()));
        assert!(!analytics
            .recommendations
            .contains(&REC_LOW_CONSISTENCY.to_string()));
        assert!(!analytics
            .recommendations
            .contains(&REC_PERFORMING_WELL.to_string()));
    }

    #[test]
    fn test_slow_even_split_only_warns_on_latency() {
        // A 50/50 split scores 75, which still clears the consistency
        // threshold; only the latency warning fires.
        let results: Vec<BatchRunResult> =
            (0..10).map(|i| completed(5000.0, i % 2 == 0)).collect();
        let analytics = AnalyticsResult::from_results(&results);

        assert_eq!(analytics.reliability.consistency, 75);
        assert_eq!(
            analytics.recommendations,
            vec![REC_HIGH_LATENCY.to_string()]
        );
    }

    #[test]
    fn test_performing_well() {
        let results: Vec<BatchRunResult> = (0..5).map(|_| completed(800.0, true)).collect();
        let analytics = AnalyticsResult::from_results(&results);

        assert_eq!(
            analytics.recommendations,
            vec![REC_PERFORMING_WELL.to_string()]
        );
    }

    #[test]
    fn test_cost_efficiency() {
        let mut passed_run = BatchRunResult::started(0);
        passed_run.complete(
            "ok".into(),
            Some(TokenUsage::new(100, 100)),
            Some(CostBreakdown::new(0.01, 0.01)),
            true,
            100.0,
        );

        let mut failed_validation = BatchRunResult::started(1);
        failed_validation.complete(
            "ok".into(),
            Some(TokenUsage::new(100, 100)),
            Some(CostBreakdown::new(0.02, 0.02)),
            false,
            100.0,
        );

        let analytics = AnalyticsResult::from_results(&[passed_run, failed_validation]);

        // Only the passed run counts toward cost per success
        assert!((analytics.cost_efficiency.cost_per_success - 0.02).abs() < 1e-9);
        // 0.06 total cost over 400 total tokens
        assert!((analytics.cost_efficiency.cost_per_token - 0.00015).abs() < 1e-9);
    }

    #[test]
    fn test_cost_per_token_zero_tokens() {
        let results = vec![completed(100.0, true)];
        let analytics = AnalyticsResult::from_results(&results);
        assert_eq!(analytics.cost_efficiency.cost_per_token, 0.0);
    }
}
