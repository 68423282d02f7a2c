/// Mock decomposer for development and tests
///
/// Produces a small deterministic set of suggestions derived from the input
/// description. Used automatically when no AI API key is configured, so the
/// decomposition endpoint keeps working in local development.

use async_trait::async_trait;
use uuid::Uuid;

use adept_shared::models::task::TaskPriority;

use super::{AiError, TaskDecomposer, TaskSuggestion};

/// Deterministic stand-in for the hosted AI adapter
pub struct MockDecomposer;

impl MockDecomposer {
    /// Creates a new mock decomposer
    pub fn new() -> Self {
        MockDecomposer
    }
}

impl Default for MockDecomposer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskDecomposer for MockDecomposer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn decompose(&self, description: &str) -> Result<Vec<TaskSuggestion>, AiError> {
        let summary: String = description.chars().take(60).collect();

        let templates = [
            ("Plan the work", TaskPriority::High, 2),
            ("Build the first iteration", TaskPriority::Medium, 8),
            ("Review and refine", TaskPriority::Low, 3),
        ];

        let suggestions = templates
            .iter()
            .map(|(title, priority, effort)| TaskSuggestion {
                suggestion_id: format!("mock-{}", Uuid::new_v4()),
                title: title.to_string(),
                description: format!("{} for: {}", title, summary),
                priority: *priority,
                priority_reasoning: Some("Mock suggestion".to_string()),
                effort_estimate: *effort,
                effort_confidence: Some("low".to_string()),
                effort_reasoning: Some("Mock suggestion".to_string()),
                is_editable: true,
                source: "mock".to_string(),
            })
            .collect();

        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_decomposer_returns_suggestions() {
        let decomposer = MockDecomposer::new();
        let suggestions = decomposer
            .decompose("Build a birdhouse with a webcam")
            .await
            .unwrap();

        assert_eq!(suggestions.len(), 3);
        assert!(suggestions.iter().all(|s| s.source == "mock"));
        assert!(suggestions.iter().all(|s| s.effort_estimate >= 0));
        assert!(suggestions[0].description.contains("birdhouse"));
    }
}
