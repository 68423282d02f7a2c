/// AI task decomposition adapters
///
/// This module defines the contract for turning a free-text project
/// description into a list of candidate tasks, plus the concrete adapters:
///
/// - [`grok`]: calls the hosted Grok (xAI) chat completions API
/// - [`mock`]: deterministic suggestions for development and tests
///
/// # Adapter Contract
///
/// The transform is stateless: `decompose(description) -> Vec<TaskSuggestion>`.
/// The upstream call is fallible and failures surface as a single
/// [`AiError`] with no partial results. Output is never persisted directly;
/// callers route accepted suggestions through the normal task-creation path
/// so validation and provenance tagging apply.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use adept_shared::models::task::TaskPriority;

pub mod grok;
pub mod mock;

pub use grok::GrokClient;
pub use mock::MockDecomposer;

/// Error type for AI adapter operations
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// Upstream API call failed
    #[error("Upstream AI call failed: {0}")]
    Upstream(String),

    /// Upstream returned a response we could not parse
    #[error("Could not parse AI response: {0}")]
    InvalidResponse(String),
}

/// A single AI-generated task suggestion
///
/// The loosely-typed upstream response is coerced into this fixed shape at
/// the adapter boundary; see [`grok::parse_suggestions`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSuggestion {
    /// Client-side identifier for tracking edits to the suggestion
    pub suggestion_id: String,

    /// Suggested task title
    pub title: String,

    /// Suggested task description
    pub description: String,

    /// Suggested priority
    pub priority: TaskPriority,

    /// Why the model chose this priority
    pub priority_reasoning: Option<String>,

    /// Suggested effort in hours
    pub effort_estimate: i32,

    /// Model's confidence in the estimate (low/medium/high)
    pub effort_confidence: Option<String>,

    /// Why the model chose this estimate
    pub effort_reasoning: Option<String>,

    /// Whether the client may edit the suggestion before accepting it
    pub is_editable: bool,

    /// Which adapter produced the suggestion
    pub source: String,
}

/// Contract for task decomposition adapters
#[async_trait]
pub trait TaskDecomposer: Send + Sync {
    /// Adapter name, used in logs and the `source` field
    fn name(&self) -> &str;

    /// Breaks a project description into candidate tasks
    ///
    /// # Errors
    ///
    /// Returns `AiError` if the upstream call fails or its response cannot
    /// be coerced into [`TaskSuggestion`]s. Never returns partial results.
    async fn decompose(&self, description: &str) -> Result<Vec<TaskSuggestion>, AiError>;
}
