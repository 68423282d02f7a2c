/// Membership model and database operations
///
/// This module provides the Membership model for user-project relationships with RBAC.
/// It implements a many-to-many relationship between users and projects with
/// role-based access control.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('owner', 'editor', 'viewer');
///
/// CREATE TABLE project_members (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role project_role NOT NULL DEFAULT 'editor',
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT uq_project_user UNIQUE (project_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **owner**: Full control, manage members and invitations, delete project
/// - **editor**: Create and manage tasks, update the project
/// - **viewer**: Read-only access
///
/// Every project must keep at least one owner. Removal or demotion of the
/// last owner is rejected inside the mutation's own transaction
/// ([`Membership::update_role_guarded`], [`Membership::remove_guarded`]),
/// with the owner rows locked so concurrent demotions cannot slip past the
/// check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// RBAC roles for project memberships
///
/// The ordering is total: Viewer < Editor < Owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control: manage members, invitations, delete project
    Owner,

    /// Can create and manage tasks, update the project
    Editor,

    /// Read-only access to project data
    Viewer,
}

impl Role {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    /// Checks if this role meets the permission level of the required role
    ///
    /// Hierarchy: Owner > Editor > Viewer
    pub fn has_permission(&self, required: &Role) -> bool {
        self.permission_level() >= required.permission_level()
    }

    /// Returns numeric permission level for comparison
    fn permission_level(&self) -> u8 {
        match self {
            Role::Owner => 3,
            Role::Editor => 2,
            Role::Viewer => 1,
        }
    }

    /// Can create, update, and delete tasks
    pub fn can_edit_tasks(&self) -> bool {
        self.has_permission(&Role::Editor)
    }

    /// Can manage members and invitations
    pub fn can_manage_team(&self) -> bool {
        matches!(self, Role::Owner)
    }
}

/// Membership model representing a user-project relationship with role
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// Unique membership ID
    pub id: Uuid,

    /// Project ID
    pub project_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the project
    pub role: Role,

    /// When the user joined the project
    pub joined_at: DateTime<Utc>,
}

/// Input for creating a new membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    /// Project ID
    pub project_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role to assign (defaults to Editor)
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Editor
}

/// Outcome of a membership mutation guarded by the owner invariant
#[derive(Debug)]
pub enum GuardedChange<T> {
    /// Mutation applied
    Applied(T),

    /// No membership exists for the (project, user) pair
    NotFound,

    /// Rejected: the target is the project's only owner
    LastOwner,
}

/// Membership joined with the member's user record, for team listings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemberWithUser {
    /// Membership ID
    pub id: Uuid,

    /// Member's user ID
    pub user_id: Uuid,

    /// Member's email
    pub email: String,

    /// Member's display name
    pub username: Option<String>,

    /// Role within the project
    pub role: Role,

    /// When the user joined the project
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    /// Creates a new membership (adds user to project)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Membership already exists (unique constraint violation)
    /// - Project or user doesn't exist (foreign key violation)
    pub async fn create(pool: &PgPool, data: CreateMembership) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING id, project_id, user_id, role, joined_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.role)
        .fetch_one(pool)
        .await?;

        Ok(membership)
    }

    /// Creates a membership, or updates the role if one already exists
    ///
    /// Used by invitation acceptance so that re-inviting an existing member
    /// with a different role never produces a duplicate row.
    pub async fn upsert(
        pool: &PgPool,
        data: CreateMembership,
    ) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (project_id, user_id)
            DO UPDATE SET role = EXCLUDED.role
            RETURNING id, project_id, user_id, role, joined_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.role)
        .fetch_one(pool)
        .await?;

        Ok(membership)
    }

    /// Finds a specific membership by project and user
    pub async fn find(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, project_id, user_id, role, joined_at
            FROM project_members
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Gets a user's role in a project
    ///
    /// Returns the role if the user is a member, None otherwise.
    pub async fn get_role(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Role>, sqlx::Error> {
        let role: Option<Role> = sqlx::query_scalar(
            r#"
            SELECT role FROM project_members
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    /// Changes a member's role, refusing to demote the last owner
    ///
    /// The check and the update run in one transaction. The project's owner
    /// rows are locked first (in a stable order, so concurrent guarded
    /// mutations of the same project serialize instead of deadlocking); a
    /// racing demotion of the other remaining owner therefore waits and then
    /// sees the post-commit owner count.
    pub async fn update_role_guarded(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<GuardedChange<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let owners = Self::lock_owners(&mut tx, project_id).await?;

        let target: Option<Membership> = sqlx::query_as(
            r#"
            SELECT id, project_id, user_id, role, joined_at
            FROM project_members
            WHERE project_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(target) = target else {
            tx.rollback().await?;
            return Ok(GuardedChange::NotFound);
        };

        if target.role == Role::Owner && role != Role::Owner && owners <= 1 {
            tx.rollback().await?;
            return Ok(GuardedChange::LastOwner);
        }

        let membership = sqlx::query_as::<_, Membership>(
            r#"
            UPDATE project_members
            SET role = $3
            WHERE project_id = $1 AND user_id = $2
            RETURNING id, project_id, user_id, role, joined_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(GuardedChange::Applied(membership))
    }

    /// Removes a member, refusing to remove the last owner
    ///
    /// Same locking discipline as [`Membership::update_role_guarded`].
    pub async fn remove_guarded(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<GuardedChange<()>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let owners = Self::lock_owners(&mut tx, project_id).await?;

        let target: Option<(Role,)> = sqlx::query_as(
            r#"
            SELECT role FROM project_members
            WHERE project_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((target_role,)) = target else {
            tx.rollback().await?;
            return Ok(GuardedChange::NotFound);
        };

        if target_role == Role::Owner && owners <= 1 {
            tx.rollback().await?;
            return Ok(GuardedChange::LastOwner);
        }

        sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(GuardedChange::Applied(()))
    }

    /// Lists all members of a project joined with their user records
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<MemberWithUser>, sqlx::Error> {
        let members = sqlx::query_as::<_, MemberWithUser>(
            r#"
            SELECT pm.id, pm.user_id, u.email, u.username, pm.role, pm.joined_at
            FROM project_members pm
            JOIN users u ON u.id = pm.user_id
            WHERE pm.project_id = $1
            ORDER BY pm.joined_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Lists all memberships for a user
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let memberships = sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, project_id, user_id, role, joined_at
            FROM project_members
            WHERE user_id = $1
            ORDER BY joined_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(memberships)
    }

    /// Locks every owner row of a project and returns the count
    ///
    /// `FOR UPDATE` with a stable ordering serializes concurrent guarded
    /// mutations of the same project's owner set.
    async fn lock_owners(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        project_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM project_members
            WHERE project_id = $1 AND role = 'owner'
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(project_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows.len() as i64)
    }

    /// Counts owners of a project
    ///
    /// Used to enforce the at-least-one-owner invariant before removing a
    /// member or demoting a role.
    pub async fn count_owners(pool: &PgPool, project_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM project_members WHERE project_id = $1 AND role = 'owner'",
        )
        .bind(project_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str() {
        assert_eq!(Role::Owner.as_str(), "owner");
        assert_eq!(Role::Editor.as_str(), "editor");
        assert_eq!(Role::Viewer.as_str(), "viewer");
    }

    #[test]
    fn test_role_ordering_is_total() {
        // Owner > Editor > Viewer
        assert!(Role::Owner.has_permission(&Role::Owner));
        assert!(Role::Owner.has_permission(&Role::Editor));
        assert!(Role::Owner.has_permission(&Role::Viewer));

        assert!(!Role::Editor.has_permission(&Role::Owner));
        assert!(Role::Editor.has_permission(&Role::Editor));
        assert!(Role::Editor.has_permission(&Role::Viewer));

        assert!(!Role::Viewer.has_permission(&Role::Owner));
        assert!(!Role::Viewer.has_permission(&Role::Editor));
        assert!(Role::Viewer.has_permission(&Role::Viewer));
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::Owner.can_edit_tasks());
        assert!(Role::Owner.can_manage_team());

        assert!(Role::Editor.can_edit_tasks());
        assert!(!Role::Editor.can_manage_team());

        assert!(!Role::Viewer.can_edit_tasks());
        assert!(!Role::Viewer.can_manage_team());
    }

    #[test]
    fn test_create_membership_default_role() {
        assert_eq!(default_role(), Role::Editor);
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"owner\"");
        let role: Role = serde_json::from_str("\"viewer\"").unwrap();
        assert_eq!(role, Role::Viewer);
    }

    // Integration tests for database operations require a running database
}
