//! Response types returned across the provider boundary

use serde::{Deserialize, Serialize};

/// Response from a single provider call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Generated content
    pub content: String,

    /// Token usage reported by the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,

    /// Cost breakdown computed from usage and pricing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostBreakdown>,
}

impl ProviderResponse {
    /// Create a response with content only
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
            cost: None,
        }
    }

    /// Attach token usage
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Attach a cost breakdown
    pub fn with_cost(mut self, cost: CostBreakdown) -> Self {
        self.cost = Some(cost);
        self
    }
}

/// Token counts for one exchange
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: usize,

    /// Tokens in the completion
    pub completion_tokens: usize,

    /// Total tokens (prompt + completion)
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create usage from prompt and completion counts
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl std::ops::Add for TokenUsage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            prompt_tokens: self.prompt_tokens + rhs.prompt_tokens,
            completion_tokens: self.completion_tokens + rhs.completion_tokens,
            total_tokens: self.total_tokens + rhs.total_tokens,
        }
    }
}

/// Cost breakdown for one exchange, in the provider's billing currency
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Cost attributed to input tokens
    pub input_cost: f64,

    /// Cost attributed to output tokens
    pub output_cost: f64,

    /// Total cost
    pub total_cost: f64,
}

impl CostBreakdown {
    /// Create a breakdown from input and output costs
    pub fn new(input_cost: f64, output_cost: f64) -> Self {
        Self {
            input_cost,
            output_cost,
            total_cost: input_cost + output_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_totals() {
        let usage = TokenUsage::new(100, 50);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn test_token_usage_arithmetic() {
        let sum = TokenUsage::new(100, 50) + TokenUsage::new(200, 100);
        assert_eq!(sum.prompt_tokens, 300);
        assert_eq!(sum.completion_tokens, 150);
        assert_eq!(sum.total_tokens, 450);
    }

    #[test]
    fn test_cost_breakdown_totals() {
        let cost = CostBreakdown::new(0.01, 0.03);
        assert!((cost.total_cost - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_response_skips_missing_fields() {
        let response = ProviderResponse::new("ok");
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("usage"));
        assert!(!json.contains("cost"));
    }
}
