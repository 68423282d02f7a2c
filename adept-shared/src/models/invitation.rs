/// Invitation model and database operations
///
/// Invitations let a project Owner add members by email. Each invitation
/// carries an unguessable single-use token and a fixed expiry (7 days).
/// Acceptance converts the invitation into a Membership; `expired` is
/// derived from clock comparison rather than stored as a status.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE invitation_status AS ENUM ('pending', 'accepted', 'declined', 'cancelled');
///
/// CREATE TABLE project_invitations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     invited_by_user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     accepted_by_user_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     invited_email VARCHAR(255) NOT NULL,
///     role project_role NOT NULL DEFAULT 'editor',
///     invitation_token VARCHAR(64) NOT NULL UNIQUE,
///     status invitation_status NOT NULL DEFAULT 'pending',
///     responded_at TIMESTAMPTZ,
///     expires_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::membership::Role;

/// How long an invitation stays redeemable
pub const INVITATION_TTL_DAYS: i64 = 7;

/// Length of the random invitation token (characters)
const TOKEN_LENGTH: usize = 43;

/// Stored invitation lifecycle states
///
/// Expiry is not a stored state: a pending invitation past its `expires_at`
/// is treated as expired at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
}

impl InvitationStatus {
    /// Converts status to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
            InvitationStatus::Cancelled => "cancelled",
        }
    }
}

/// Invitation model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invitation {
    /// Unique invitation ID (UUID v4)
    pub id: Uuid,

    /// Project the invitee would join
    pub project_id: Uuid,

    /// Who sent the invitation
    pub invited_by_user_id: Uuid,

    /// Who accepted it (None while pending)
    pub accepted_by_user_id: Option<Uuid>,

    /// Email address of the invitee; need not belong to an existing user
    pub invited_email: String,

    /// Role granted on acceptance
    pub role: Role,

    /// Single-use acceptance token
    pub invitation_token: String,

    /// Stored lifecycle state
    pub status: InvitationStatus,

    /// When the invitation was accepted or declined
    pub responded_at: Option<DateTime<Utc>>,

    /// When the invitation lapses
    pub expires_at: DateTime<Utc>,

    /// When the invitation was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new invitation
#[derive(Debug, Clone)]
pub struct CreateInvitation {
    /// Project the invitee would join
    pub project_id: Uuid,

    /// Who is sending the invitation
    pub invited_by_user_id: Uuid,

    /// Email address of the invitee
    pub invited_email: String,

    /// Role granted on acceptance
    pub role: Role,
}

/// Generates an unguessable invitation token
///
/// 43 alphanumeric characters from the thread-local CSPRNG, matching the
/// entropy of 32 url-safe base64 bytes.
pub fn generate_invitation_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

impl Invitation {
    /// Creates a new pending invitation
    ///
    /// Generates a fresh token and sets expiry to now + 7 days.
    ///
    /// # Errors
    ///
    /// Returns an error if a pending invitation for the same (project, email)
    /// already exists (partial unique index violation) or the database fails.
    pub async fn create(pool: &PgPool, data: CreateInvitation) -> Result<Self, sqlx::Error> {
        let token = generate_invitation_token();
        let expires_at = Utc::now() + Duration::days(INVITATION_TTL_DAYS);

        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO project_invitations
                (project_id, invited_by_user_id, invited_email, role,
                 invitation_token, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, project_id, invited_by_user_id, accepted_by_user_id,
                      invited_email, role, invitation_token, status,
                      responded_at, expires_at, created_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.invited_by_user_id)
        .bind(data.invited_email)
        .bind(data.role)
        .bind(token)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;

        Ok(invitation)
    }

    /// Finds an invitation by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, project_id, invited_by_user_id, accepted_by_user_id,
                   invited_email, role, invitation_token, status,
                   responded_at, expires_at, created_at
            FROM project_invitations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(invitation)
    }

    /// Finds an invitation by its token
    pub async fn find_by_token(pool: &PgPool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, project_id, invited_by_user_id, accepted_by_user_id,
                   invited_email, role, invitation_token, status,
                   responded_at, expires_at, created_at
            FROM project_invitations
            WHERE invitation_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(invitation)
    }

    /// Finds a pending invitation for a (project, email) pair
    pub async fn find_pending(
        pool: &PgPool,
        project_id: Uuid,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, project_id, invited_by_user_id, accepted_by_user_id,
                   invited_email, role, invitation_token, status,
                   responded_at, expires_at, created_at
            FROM project_invitations
            WHERE project_id = $1 AND invited_email = $2 AND status = 'pending'
            "#,
        )
        .bind(project_id)
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(invitation)
    }

    /// Lists pending invitations for a project
    pub async fn list_pending_by_project(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let invitations = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, project_id, invited_by_user_id, accepted_by_user_id,
                   invited_email, role, invitation_token, status,
                   responded_at, expires_at, created_at
            FROM project_invitations
            WHERE project_id = $1 AND status = 'pending'
            ORDER BY created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(invitations)
    }

    /// Marks the invitation accepted and creates the membership atomically
    ///
    /// The status flip is guarded by `status = 'pending'` so a concurrent
    /// second accept of the same token updates zero rows and reports failure
    /// instead of producing a duplicate membership.
    ///
    /// Returns true if the invitation was consumed, false if it was no
    /// longer pending.
    pub async fn accept(
        pool: &PgPool,
        id: Uuid,
        accepting_user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let consumed: Option<(Uuid, Role)> = sqlx::query_as(
            r#"
            UPDATE project_invitations
            SET status = 'accepted', accepted_by_user_id = $2, responded_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING project_id, role
            "#,
        )
        .bind(id)
        .bind(accepting_user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((project_id, role)) = consumed else {
            tx.rollback().await?;
            return Ok(false);
        };

        sqlx::query(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (project_id, user_id)
            DO UPDATE SET role = EXCLUDED.role
            "#,
        )
        .bind(project_id)
        .bind(accepting_user_id)
        .bind(role)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(true)
    }

    /// Moves a pending invitation to a terminal state (declined or cancelled)
    ///
    /// Returns true if the invitation was updated, false if it was no longer
    /// pending.
    pub async fn close(
        pool: &PgPool,
        id: Uuid,
        status: InvitationStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE project_invitations
            SET status = $2, responded_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Rotates the token and resets expiry on a pending invitation
    ///
    /// The previous token becomes unredeemable, preserving single-use.
    /// Returns the refreshed invitation if it was still pending.
    pub async fn resend(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let token = generate_invitation_token();
        let expires_at = Utc::now() + Duration::days(INVITATION_TTL_DAYS);

        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            UPDATE project_invitations
            SET invitation_token = $2, expires_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING id, project_id, invited_by_user_id, accepted_by_user_id,
                      invited_email, role, invitation_token, status,
                      responded_at, expires_at, created_at
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .fetch_optional(pool)
        .await?;

        Ok(invitation)
    }

    /// Whether the invitation has lapsed
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Whether the invitation can still be redeemed
    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending && !self.is_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_invitation(status: InvitationStatus, expires_at: DateTime<Utc>) -> Invitation {
        Invitation {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            invited_by_user_id: Uuid::new_v4(),
            accepted_by_user_id: None,
            invited_email: "bob@x.com".to_string(),
            role: Role::Editor,
            invitation_token: generate_invitation_token(),
            status,
            responded_at: None,
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_is_random_and_sized() {
        let t1 = generate_invitation_token();
        let t2 = generate_invitation_token();

        assert_eq!(t1.len(), TOKEN_LENGTH);
        assert_eq!(t2.len(), TOKEN_LENGTH);
        assert_ne!(t1, t2);
        assert!(t1.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_pending_invitation_within_ttl() {
        let inv = sample_invitation(
            InvitationStatus::Pending,
            Utc::now() + Duration::days(INVITATION_TTL_DAYS),
        );
        assert!(!inv.is_expired());
        assert!(inv.is_pending());
    }

    #[test]
    fn test_pending_invitation_past_ttl_is_expired() {
        // accepted after 8 days must be treated as expired
        let inv = sample_invitation(InvitationStatus::Pending, Utc::now() - Duration::days(1));
        assert!(inv.is_expired());
        assert!(!inv.is_pending());
    }

    #[test]
    fn test_terminal_states_are_not_pending() {
        let expires = Utc::now() + Duration::days(INVITATION_TTL_DAYS);
        for status in [
            InvitationStatus::Accepted,
            InvitationStatus::Declined,
            InvitationStatus::Cancelled,
        ] {
            let inv = sample_invitation(status, expires);
            assert!(!inv.is_pending());
        }
    }

    #[test]
    fn test_status_as_str() {
        assert_eq!(InvitationStatus::Pending.as_str(), "pending");
        assert_eq!(InvitationStatus::Accepted.as_str(), "accepted");
        assert_eq!(InvitationStatus::Declined.as_str(), "declined");
        assert_eq!(InvitationStatus::Cancelled.as_str(), "cancelled");
    }

    // Integration tests for database operations require a running database
}
