/// Project CRUD endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects` - List projects the caller belongs to
/// - `POST /v1/projects` - Create a project (caller becomes Owner)
/// - `GET /v1/projects/:id` - Get a project (Viewer+)
/// - `PUT /v1/projects/:id` - Update a project (Editor+)
/// - `DELETE /v1/projects/:id` - Delete a project (Owner)

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult},
    routes::check_project_access,
};
use adept_shared::{
    auth::middleware::AuthContext,
    models::{
        membership::Role,
        project::{CreateProject, Project, UpdateProject},
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

/// Project creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    /// Project title (1-100 characters)
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,

    /// Optional description (up to 1000 characters)
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
}

/// Project update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    /// New title
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: Option<String>,

    /// New description
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
}

/// Lists all projects where the caller holds a membership
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Project>>> {
    let projects = Project::list_for_user(&state.db, auth.user_id).await?;
    Ok(Json(projects))
}

/// Creates a project
///
/// The caller becomes its Owner; the project row and the Owner membership
/// are written in one transaction.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    req.validate().map_err(validation_details)?;

    let project = Project::create_with_owner(
        &state.db,
        CreateProject {
            user_id: auth.user_id,
            title: req.title,
            description: req.description,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// Gets a single project
///
/// # Errors
///
/// - `404 Not Found`: Project absent or caller is not a member
pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    check_project_access(&state.db, project_id, auth.user_id, Role::Viewer).await?;

    let project = Project::find_by_id(&state.db, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found or access denied".to_string()))?;

    Ok(Json(project))
}

/// Updates a project's title and/or description
///
/// # Errors
///
/// - `403 Forbidden`: Caller is a Viewer
/// - `404 Not Found`: Project absent or caller is not a member
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate().map_err(validation_details)?;

    check_project_access(&state.db, project_id, auth.user_id, Role::Editor).await?;

    let project = Project::update(
        &state.db,
        project_id,
        UpdateProject {
            title: req.title,
            description: req.description,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Project not found or access denied".to_string()))?;

    Ok(Json(project))
}

/// Deletes a project
///
/// Tasks, memberships, and pending invitations cascade.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an Owner
/// - `404 Not Found`: Project absent or caller is not a member
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    check_project_access(&state.db, project_id, auth.user_id, Role::Owner).await?;

    let deleted = Project::delete(&state.db, project_id).await?;
    if !deleted {
        return Err(ApiError::NotFound(
            "Project not found or access denied".to_string(),
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}
