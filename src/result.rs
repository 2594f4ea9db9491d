//! Per-run results and the test definition they execute

use crate::request::Message;
use crate::response::{CostBreakdown, TokenUsage};
use crate::rules::RuleSet;

use serde::{Deserialize, Serialize};

/// The prompt/test definition a batch executes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Test identifier
    pub id: String,

    /// Conversation messages sent to the provider on every run
    pub messages: Vec<Message>,

    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Validation rule sets; empty means every response passes
    #[serde(default)]
    pub rule_sets: Vec<RuleSet>,
}

impl TestCase {
    /// Create a test case with a single user prompt and no rules
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: vec![Message::user(prompt)],
            temperature: None,
            rule_sets: Vec::new(),
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Attach validation rule sets
    pub fn with_rule_sets(mut self, rule_sets: Vec<RuleSet>) -> Self {
        self.rule_sets = rule_sets;
        self
    }
}

/// Status of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Run has been claimed and is executing
    Running,
    /// Provider call succeeded and validation ran
    Completed,
    /// All attempts exhausted without success
    Failed,
    /// Run was cancelled before reaching a natural outcome
    Cancelled,
}

impl RunStatus {
    /// Whether this status is terminal (the result will not change again)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

/// Outcome of one execution slot in a batch
///
/// Exactly one result exists per claimed `run_index`. A result is mutated
/// only by the worker owning that index, and is immutable once `status`
/// leaves [`RunStatus::Running`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRunResult {
    /// Unique result identifier
    pub id: String,

    /// Execution slot in `[0, run_count)`
    pub run_index: usize,

    /// Current status
    pub status: RunStatus,

    /// When the run began
    pub start_time: chrono::DateTime<chrono::Utc>,

    /// When the run reached a terminal status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,

    /// Wall-clock duration in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,

    /// Provider response text (completed runs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Token usage (completed runs, when the provider reports it)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,

    /// Total cost of the successful attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,

    /// Whether validation passed (meaningful only when completed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,

    /// Error message from the terminal attempt (failed runs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Failed attempts before the terminal attempt
    pub retry_count: u32,
}

impl BatchRunResult {
    /// Create a fresh result for a newly claimed run
    pub fn started(run_index: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            run_index,
            status: RunStatus::Running,
            start_time: chrono::Utc::now(),
            end_time: None,
            duration_ms: None,
            response: None,
            token_usage: None,
            cost: None,
            passed: None,
            error: None,
            retry_count: 0,
        }
    }

    /// Mark the run completed with the provider's response
    pub fn complete(
        &mut self,
        response: String,
        token_usage: Option<TokenUsage>,
        cost: Option<CostBreakdown>,
        passed: bool,
        duration_ms: f64,
    ) {
        self.status = RunStatus::Completed;
        self.response = Some(response);
        self.token_usage = token_usage;
        self.cost = cost.map(|c| c.total_cost);
        self.passed = Some(passed);
        self.duration_ms = Some(duration_ms);
        self.end_time = Some(chrono::Utc::now());
    }

    /// Mark the run failed after exhausting its attempt budget
    pub fn fail(&mut self, error: String, duration_ms: f64) {
        self.status = RunStatus::Failed;
        self.error = Some(error);
        self.duration_ms = Some(duration_ms);
        self.end_time = Some(chrono::Utc::now());
    }

    /// Mark the run cancelled
    pub fn cancel(&mut self) {
        self.status = RunStatus::Cancelled;
        self.end_time = Some(chrono::Utc::now());
    }
}
