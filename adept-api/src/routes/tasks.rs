/// Task CRUD endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects/:id/tasks` - List project tasks (Viewer+)
/// - `POST /v1/projects/:id/tasks` - Create a task (Editor+)
/// - `POST /v1/projects/:id/tasks/bulk` - Create a batch atomically (Editor+)
/// - `PUT /v1/tasks/:id` - Update a task (Editor+ via parent project)
/// - `DELETE /v1/tasks/:id` - Delete a task (Editor+ via parent project)
///
/// Task status transitions are unrestricted: any status may be set from any
/// other. Bulk creation is all-or-nothing and preserves the supplied order.

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult, ValidationErrorDetail},
    routes::check_project_access,
};
use adept_shared::{
    auth::middleware::AuthContext,
    models::{
        membership::Role,
        task::{CreateTask, Task, TaskOrigin, TaskPriority, TaskStatus, UpdateTask},
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

fn default_priority() -> TaskPriority {
    TaskPriority::Medium
}

fn default_status() -> TaskStatus {
    TaskStatus::Todo
}

/// Task creation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Task title (1-200 characters)
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    /// Optional description (up to 1000 characters)
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    /// Priority (defaults to medium)
    #[serde(default = "default_priority")]
    pub priority: TaskPriority,

    /// Status (defaults to todo)
    #[serde(default = "default_status")]
    pub status: TaskStatus,

    /// Estimated hours; must be non-negative
    #[validate(range(min = 0, message = "Effort estimate must be non-negative"))]
    pub effort_estimate: Option<i32>,

    /// Whether the task came from an accepted AI suggestion
    #[serde(default)]
    pub ai_generated: bool,

    /// Original AI priority suggestion, for audit
    pub ai_priority_suggestion: Option<TaskPriority>,

    /// Original AI effort suggestion, for audit
    pub ai_effort_suggestion: Option<i32>,
}

impl CreateTaskRequest {
    fn into_model(self) -> CreateTask {
        let origin = if self.ai_generated {
            TaskOrigin::Ai
        } else {
            TaskOrigin::User
        };

        CreateTask {
            title: self.title,
            description: self.description,
            priority: self.priority,
            status: self.status,
            effort_estimate: self.effort_estimate,
            ai_generated: self.ai_generated,
            ai_priority_suggestion: self.ai_priority_suggestion,
            ai_effort_suggestion: self.ai_effort_suggestion,
            created_by: origin,
        }
    }
}

/// Bulk task creation request
#[derive(Debug, Deserialize)]
pub struct CreateTasksBulkRequest {
    /// Tasks to create, in display order
    pub tasks: Vec<CreateTaskRequest>,
}

/// Task update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    /// New title
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    /// New description
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    /// New priority
    pub priority: Option<TaskPriority>,

    /// New status
    pub status: Option<TaskStatus>,

    /// New effort estimate
    #[validate(range(min = 0, message = "Effort estimate must be non-negative"))]
    pub effort_estimate: Option<i32>,
}

/// Lists all tasks of a project, in creation order
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Task>>> {
    check_project_access(&state.db, project_id, auth.user_id, Role::Viewer).await?;

    let tasks = Task::list_by_project(&state.db, project_id).await?;
    Ok(Json(tasks))
}

/// Creates a single task
///
/// # Errors
///
/// - `403 Forbidden`: Caller is a Viewer
/// - `404 Not Found`: Project absent or caller is not a member
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate().map_err(validation_details)?;

    check_project_access(&state.db, project_id, auth.user_id, Role::Editor).await?;

    let task = Task::create(&state.db, project_id, req.into_model()).await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// Creates a batch of tasks atomically
///
/// The whole batch is validated up front; if any item fails, nothing is
/// persisted. Tasks are inserted in the order supplied.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is a Viewer
/// - `404 Not Found`: Project absent or caller is not a member
/// - `422 Unprocessable Entity`: Any item failed validation (none persisted)
pub async fn create_tasks_bulk(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateTasksBulkRequest>,
) -> ApiResult<(StatusCode, Json<Vec<Task>>)> {
    if req.tasks.is_empty() {
        return Err(ApiError::BadRequest("Task batch is empty".to_string()));
    }

    // Validate the whole batch before touching the database
    let mut details = Vec::new();
    for (idx, task) in req.tasks.iter().enumerate() {
        if let Err(errors) = task.validate() {
            for (field, field_errors) in errors.field_errors() {
                for error in field_errors {
                    details.push(ValidationErrorDetail {
                        field: format!("tasks[{}].{}", idx, field),
                        message: error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| "Validation failed".to_string()),
                    });
                }
            }
        }
    }
    if !details.is_empty() {
        return Err(ApiError::ValidationError(details));
    }

    check_project_access(&state.db, project_id, auth.user_id, Role::Editor).await?;

    let batch = req.tasks.into_iter().map(CreateTaskRequest::into_model).collect();
    let tasks = Task::create_bulk(&state.db, project_id, batch).await?;

    Ok((StatusCode::CREATED, Json(tasks)))
}

/// Updates a task
///
/// Authorization goes through the parent project. Last write wins on
/// concurrent edits; no version token is kept.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is a Viewer
/// - `404 Not Found`: Task absent, or caller is not a member of its project
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate().map_err(validation_details)?;

    let existing = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    check_project_access(&state.db, existing.project_id, auth.user_id, Role::Editor).await?;

    let update = UpdateTask {
        title: req.title,
        description: req.description,
        priority: req.priority,
        status: req.status,
        effort_estimate: req.effort_estimate,
    };

    // No-op update: return current state without touching updated_at
    if update.is_empty() {
        return Ok(Json(existing));
    }

    let task = Task::update(&state.db, task_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task))
}

/// Deletes a task
///
/// # Errors
///
/// - `403 Forbidden`: Caller is a Viewer
/// - `404 Not Found`: Task absent, or caller is not a member of its project
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let existing = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    check_project_access(&state.db, existing.project_id, auth.user_id, Role::Editor).await?;

    Task::delete(&state.db, task_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
