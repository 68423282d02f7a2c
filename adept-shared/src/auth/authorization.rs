/// Authorization helpers and permission checks
///
/// This module provides utilities for role-based access control (RBAC) at the
/// project level.
///
/// # Permission Model
///
/// 1. **Project Membership**: User must be a member of the project
/// 2. **Role-Based Permissions**: Defined by Role (Owner, Editor, Viewer)
///
/// Membership is checked before role: a caller who is not a member at all gets
/// `NotMember`, which the API layer renders as a 404 so that project existence
/// is never revealed to outsiders. A member who lacks the required role gets
/// `InsufficientRole`, rendered as a 403.
///
/// # Example
///
/// ```no_run
/// use adept_shared::auth::authorization::require_role;
/// use adept_shared::models::membership::Role;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// async fn check_permissions(
///     pool: &PgPool,
///     project_id: Uuid,
///     user_id: Uuid,
/// ) -> Result<(), Box<dyn std::error::Error>> {
///     // Check user can edit tasks in the project
///     require_role(pool, project_id, user_id, Role::Editor).await?;
///     Ok(())
/// }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::membership::{Membership, Role};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// User is not a member of the project
    #[error("Not a member of project {0}")]
    NotMember(Uuid),

    /// User doesn't have required role
    #[error("Insufficient permissions: requires {required:?}, has {actual:?}")]
    InsufficientRole { required: Role, actual: Role },

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Checks if a user is a member of a project
///
/// Returns the user's role on success.
///
/// # Errors
///
/// Returns `AuthzError::NotMember` if user is not a member
pub async fn require_membership(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Role, AuthzError> {
    Membership::get_role(pool, project_id, user_id)
        .await?
        .ok_or(AuthzError::NotMember(project_id))
}

/// Checks if a user has at least the required role in a project
///
/// Returns the user's actual role on success.
///
/// # Errors
///
/// - `AuthzError::NotMember` if user is not a member of the project
/// - `AuthzError::InsufficientRole` if the member's role is below `required`
pub async fn require_role(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
    required: Role,
) -> Result<Role, AuthzError> {
    let actual = require_membership(pool, project_id, user_id).await?;

    if !actual.has_permission(&required) {
        return Err(AuthzError::InsufficientRole { required, actual });
    }

    Ok(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authz_error_display() {
        let project_id = Uuid::new_v4();
        let err = AuthzError::NotMember(project_id);
        assert!(err.to_string().contains("Not a member"));

        let err = AuthzError::InsufficientRole {
            required: Role::Owner,
            actual: Role::Viewer,
        };
        assert!(err.to_string().contains("Insufficient permissions"));
    }

    // Integration tests for membership lookups require a running database
}
