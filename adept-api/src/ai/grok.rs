/// Grok (xAI) task decomposition adapter
///
/// Calls the OpenAI-compatible chat completions endpoint at api.x.ai and
/// coerces the model's loosely-typed JSON output into fixed
/// [`TaskSuggestion`] values.
///
/// # Response handling
///
/// Models frequently wrap JSON in markdown code fences or surround it with
/// prose. Parsing is defensive:
///
/// 1. Strip ```json / ``` fences if present
/// 2. Try to parse the remainder as a JSON array
/// 3. On failure, fall back to the outermost `[...]` slice of the text
/// 4. Coerce each entry field-by-field, substituting defaults for missing
///    or malformed values rather than rejecting the whole batch

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use adept_shared::models::task::TaskPriority;

use super::{AiError, TaskDecomposer, TaskSuggestion};

/// Default effort estimate when the model omits or mangles the field
const DEFAULT_EFFORT_HOURS: i64 = 4;

/// Grok API client
pub struct GrokClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl GrokClient {
    /// Creates a new Grok client
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    fn build_prompt(description: &str) -> String {
        format!(
            r#"You are a project management AI assistant. Break down the following project into 5-8 actionable tasks.

Project Description:
{description}

For each task, provide:
1. A clear, actionable title (max 100 chars)
2. A detailed description (2-3 sentences)
3. Priority level (low/medium/high) with reasoning
4. Effort estimate in hours (realistic estimate)
5. Confidence level for the estimate (low/medium/high)
6. Reasoning for the effort estimate

Format your response as a JSON array with this structure:
[
  {{
    "title": "Task title",
    "description": "Detailed description",
    "priority": "high",
    "priority_reasoning": "Why this priority",
    "effort_estimate": 8,
    "effort_confidence": "medium",
    "effort_reasoning": "Why this estimate"
  }}
]

Be specific and practical. Focus on deliverable milestones. Return ONLY the JSON array, no additional text."#
        )
    }
}

#[async_trait]
impl TaskDecomposer for GrokClient {
    fn name(&self) -> &str {
        "grok"
    }

    async fn decompose(&self, description: &str) -> Result<Vec<TaskSuggestion>, AiError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a helpful project management assistant that breaks down \
                              projects into actionable tasks. Always respond with valid JSON arrays."
                        .to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::build_prompt(description),
                },
            ],
            temperature: 0.7,
            max_tokens: 2000,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::Upstream(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Upstream(format!(
                "Upstream returned {}: {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(format!("Malformed completion body: {}", e)))?;

        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AiError::InvalidResponse("Completion had no choices".to_string()))?;

        parse_suggestions(content)
    }
}

/// Parses model output into suggestions
///
/// Tolerates markdown code fences and surrounding prose; individual entries
/// with missing fields are filled with defaults rather than dropped.
pub fn parse_suggestions(content: &str) -> Result<Vec<TaskSuggestion>, AiError> {
    let text = strip_code_fences(content.trim());

    let entries: Vec<JsonValue> = match serde_json::from_str(text) {
        Ok(entries) => entries,
        Err(_) => {
            let slice = extract_json_array(text).ok_or_else(|| {
                AiError::InvalidResponse("Could not parse AI response as JSON".to_string())
            })?;
            serde_json::from_str(slice).map_err(|e| {
                AiError::InvalidResponse(format!("Could not parse AI response as JSON: {}", e))
            })?
        }
    };

    let suggestions = entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| coerce_suggestion(idx, entry))
        .collect();

    Ok(suggestions)
}

/// Strips a leading ```json (or bare ```) fence and its closing fence
fn strip_code_fences(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        match rest.find("```") {
            Some(end) => rest[..end].trim(),
            None => rest.trim(),
        }
    } else if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        match rest.find("```") {
            Some(end) => rest[..end].trim(),
            None => rest.trim(),
        }
    } else {
        text
    }
}

/// Returns the outermost `[...]` slice of the text, if any
fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Coerces one loosely-typed entry into the fixed suggestion shape
fn coerce_suggestion(idx: usize, entry: &JsonValue) -> TaskSuggestion {
    let title = entry
        .get("title")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Task {}", idx + 1));

    let description = entry
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let priority = entry
        .get("priority")
        .and_then(|v| v.as_str())
        .map(|p| match p.to_lowercase().as_str() {
            "low" => TaskPriority::Low,
            "high" => TaskPriority::High,
            _ => TaskPriority::Medium,
        })
        .unwrap_or(TaskPriority::Medium);

    let effort_estimate = entry
        .get("effort_estimate")
        .and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().map(|f| f.round() as i64))
                .or_else(|| v.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
        })
        .unwrap_or(DEFAULT_EFFORT_HOURS)
        .clamp(0, i32::MAX as i64) as i32;

    let opt_string = |key: &str| {
        entry
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };

    TaskSuggestion {
        suggestion_id: format!("grok-{}", Uuid::new_v4()),
        title,
        description,
        priority,
        priority_reasoning: opt_string("priority_reasoning"),
        effort_estimate,
        effort_confidence: opt_string("effort_confidence"),
        effort_reasoning: opt_string("effort_reasoning"),
        is_editable: true,
        source: "grok".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"[
        {
            "title": "Set up repository",
            "description": "Create the repo and CI pipeline.",
            "priority": "high",
            "priority_reasoning": "Everything depends on it",
            "effort_estimate": 2,
            "effort_confidence": "high",
            "effort_reasoning": "Routine setup"
        }
    ]"#;

    #[test]
    fn test_parse_plain_json_array() {
        let suggestions = parse_suggestions(WELL_FORMED).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].title, "Set up repository");
        assert_eq!(suggestions[0].priority, TaskPriority::High);
        assert_eq!(suggestions[0].effort_estimate, 2);
        assert!(suggestions[0].is_editable);
        assert_eq!(suggestions[0].source, "grok");
        assert!(suggestions[0].suggestion_id.starts_with("grok-"));
    }

    #[test]
    fn test_parse_json_in_code_fence() {
        let fenced = format!("```json\n{}\n```", WELL_FORMED);
        let suggestions = parse_suggestions(&fenced).unwrap();
        assert_eq!(suggestions.len(), 1);

        let bare_fenced = format!("```\n{}\n```", WELL_FORMED);
        let suggestions = parse_suggestions(&bare_fenced).unwrap();
        assert_eq!(suggestions.len(), 1);
    }

    #[test]
    fn test_parse_json_with_surrounding_prose() {
        let chatty = format!("Here are your tasks:\n{}\nLet me know if you need more.", WELL_FORMED);
        let suggestions = parse_suggestions(&chatty).unwrap();
        assert_eq!(suggestions.len(), 1);
    }

    #[test]
    fn test_parse_fills_missing_fields_with_defaults() {
        let sparse = r#"[{"priority": "URGENT"}, {"title": "Real task", "effort_estimate": "12"}]"#;
        let suggestions = parse_suggestions(sparse).unwrap();

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].title, "Task 1");
        assert_eq!(suggestions[0].priority, TaskPriority::Medium);
        assert_eq!(suggestions[0].effort_estimate, DEFAULT_EFFORT_HOURS as i32);

        assert_eq!(suggestions[1].title, "Real task");
        assert_eq!(suggestions[1].effort_estimate, 12);
    }

    #[test]
    fn test_parse_negative_effort_clamped_to_zero() {
        let entry = r#"[{"title": "T", "effort_estimate": -3}]"#;
        let suggestions = parse_suggestions(entry).unwrap();
        assert_eq!(suggestions[0].effort_estimate, 0);
    }

    #[test]
    fn test_parse_huge_effort_does_not_wrap() {
        // 2^33 would go negative under a plain `as i32` cast
        let entry = r#"[{"title": "T", "effort_estimate": 8589934592}]"#;
        let suggestions = parse_suggestions(entry).unwrap();
        assert_eq!(suggestions[0].effort_estimate, i32::MAX);
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let result = parse_suggestions("I could not generate any tasks, sorry.");
        assert!(matches!(result, Err(AiError::InvalidResponse(_))));
    }

    #[test]
    fn test_extract_json_array() {
        assert_eq!(extract_json_array("noise [1, 2] tail"), Some("[1, 2]"));
        assert_eq!(extract_json_array("no array here"), None);
        assert_eq!(extract_json_array("] backwards ["), None);
    }
}
