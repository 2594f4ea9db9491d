//! Validation rule data carried across the rule-validator boundary
//!
//! Rule evaluation itself is external; this module only defines the shapes
//! the orchestrator hands to a [`RuleValidator`](crate::traits::RuleValidator)
//! and the results it gets back.

use serde::{Deserialize, Serialize};

/// How individual rule outcomes combine within a rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCombinator {
    /// All rules must pass
    And,
    /// At least one rule must pass
    Or,
}

/// A named set of validation rules applied to a response
///
/// Rule definitions are opaque to this crate; the validator interprets them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Rule set identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// AND/OR combination semantics
    pub combinator: RuleCombinator,

    /// Opaque rule definitions, interpreted by the validator
    pub rules: Vec<serde_json::Value>,
}

/// Outcome of evaluating one rule set against a response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSetResult {
    /// Rule set identifier
    pub rule_set_id: String,

    /// Whether the rule set passed under its combinator
    pub passed: bool,
}

/// Overall pass/fail across all rule sets
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OverallResult {
    /// Whether the response passed overall
    pub pass: bool,
}
