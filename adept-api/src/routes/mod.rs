/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (register, login, refresh, me)
/// - `users`: Profile management
/// - `projects`: Project CRUD
/// - `tasks`: Task CRUD and bulk creation
/// - `team`: Members and invitations
/// - `ai`: AI task decomposition
/// - `analytics`: Aggregate read-only metrics

use adept_shared::auth::authorization;
use adept_shared::models::membership::Role;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;

pub mod health;
pub mod auth;
pub mod users;
pub mod projects;
pub mod tasks;
pub mod team;
pub mod ai;
pub mod analytics;

/// Resolves the caller's role in a project, enforcing a minimum
///
/// Non-members get a 404 (existence must not leak); members below the
/// required role get a 403.
pub(crate) async fn check_project_access(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
    required: Role,
) -> Result<Role, ApiError> {
    let role = authorization::require_role(pool, project_id, user_id, required).await?;
    Ok(role)
}
