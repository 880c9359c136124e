//! Response types returned by the orchestrator

use serde::{Deserialize, Serialize};

/// Confidence attached to responses the model produced normally.
pub const MODEL_CONFIDENCE: f32 = 0.9;

/// Confidence attached to the placeholder returned when a local model fails.
pub const DEGRADED_CONFIDENCE: f32 = 0.1;

/// Model output for suggestion, test-generation and explanation requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Structured tests, passed through when a local endpoint returns them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<serde_json::Value>,
}

impl AiResponse {
    /// Wrap model text as a single suggestion.
    pub fn from_text(
        text: impl Into<String>,
        explanation: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            suggestions: vec![text.into()],
            explanation: Some(explanation.into()),
            confidence: Some(confidence),
            tests: None,
        }
    }

    /// First suggestion, if any.
    pub fn primary(&self) -> Option<&str> {
        self.suggestions.first().map(String::as_str)
    }
}

/// Structured critique parsed from a free-text architecture review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureReview {
    /// 0–10; 0 when the model gave no parsable score.
    pub score: u8,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    /// Mermaid `graph TD` sketch of the components the review mentions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram: Option<String>,
}
