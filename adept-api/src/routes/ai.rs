/// AI task decomposition endpoint
///
/// # Endpoints
///
/// - `POST /v1/ai/task-decompose` - Break a project description into
///   suggested tasks
///
/// Suggestions are ephemeral: nothing is persisted until the client accepts
/// them and posts real tasks through the task endpoints.

use crate::{
    ai::TaskSuggestion,
    app::AppState,
    error::{validation_details, ApiResult},
};
use adept_shared::auth::middleware::AuthContext;
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Decomposition request
#[derive(Debug, Deserialize, Validate)]
pub struct TaskDecomposeRequest {
    /// Free-text project description (10-2000 characters)
    #[serde(alias = "projectDescription")]
    #[validate(length(
        min = 10,
        max = 2000,
        message = "Project description must be 10-2000 characters"
    ))]
    pub project_description: String,
}

/// Decomposition response
#[derive(Debug, Serialize)]
pub struct TaskDecomposeResponse {
    /// Suggested tasks, in the order the model produced them
    pub suggestions: Vec<TaskSuggestion>,
}

/// Decomposes a project description into task suggestions
///
/// Requires authentication but no project membership: the description is
/// free text, not tied to a stored project.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid token
/// - `422 Unprocessable Entity`: Description too short or too long
/// - `503 Service Unavailable`: Upstream AI provider failed
pub async fn task_decompose(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<TaskDecomposeRequest>,
) -> ApiResult<Json<TaskDecomposeResponse>> {
    req.validate().map_err(validation_details)?;

    tracing::info!(
        user_id = %auth.user_id,
        provider = state.decomposer.name(),
        "decomposing project description"
    );

    let suggestions = state
        .decomposer
        .decompose(&req.project_description)
        .await?;

    Ok(Json(TaskDecomposeResponse { suggestions }))
}
