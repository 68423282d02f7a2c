/// Team management endpoints: members and invitations
///
/// # Endpoints
///
/// - `GET /v1/projects/:id/members` - List members (Viewer+)
/// - `PUT /v1/projects/:id/members/:user_id` - Change a member's role (Owner)
/// - `DELETE /v1/projects/:id/members/:user_id` - Remove a member (Owner)
/// - `GET /v1/projects/:id/invitations` - List pending invitations (Owner)
/// - `POST /v1/projects/:id/invitations` - Invite by email (Owner)
/// - `GET /v1/team/invitations/by-token/:token` - Invitation preview (public)
/// - `POST /v1/team/invitations/:id/accept` - Accept (invitee)
/// - `POST /v1/team/invitations/:id/decline` - Decline (invitee)
/// - `POST /v1/team/invitations/:id/resend` - Rotate token + expiry (Owner)
/// - `DELETE /v1/team/invitations/:id` - Cancel (Owner)
///
/// # Invariants
///
/// Every project keeps at least one Owner: removing or demoting the last
/// Owner fails with `409 Conflict`. Invitations are single-use; a consumed
/// or closed invitation answers `410 Gone`, an expired one `410` with the
/// `expired` error code.

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult},
    routes::check_project_access,
};
use adept_shared::{
    auth::middleware::AuthContext,
    models::{
        invitation::{CreateInvitation, Invitation, InvitationStatus},
        membership::{GuardedChange, MemberWithUser, Membership, Role},
        project::Project,
        user::User,
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Invitation creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvitationRequest {
    /// Email address to invite; need not belong to an existing user
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Role granted on acceptance (defaults to Editor)
    #[serde(default = "default_invite_role")]
    pub role: Role,
}

fn default_invite_role() -> Role {
    Role::Editor
}

/// Role change request
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    /// New role for the member
    pub role: Role,
}

/// Invitation view returned to clients
#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    /// Invitation ID
    pub id: String,

    /// Project the invitee would join
    pub project_id: String,

    /// Project title, for display in the acceptance page
    pub project_name: String,

    /// Invited email address
    pub email: String,

    /// Role granted on acceptance
    pub role: Role,

    /// Stored lifecycle state
    pub status: InvitationStatus,

    /// Single-use acceptance token
    pub token: String,

    /// Who sent the invitation
    pub invited_by: String,

    /// When the invitation lapses
    pub expires_at: DateTime<Utc>,

    /// When the invitation was created
    pub created_at: DateTime<Utc>,
}

impl InvitationResponse {
    fn new(invitation: Invitation, project_name: String) -> Self {
        Self {
            id: invitation.id.to_string(),
            project_id: invitation.project_id.to_string(),
            project_name,
            email: invitation.invited_email,
            role: invitation.role,
            status: invitation.status,
            token: invitation.invitation_token,
            invited_by: invitation.invited_by_user_id.to_string(),
            expires_at: invitation.expires_at,
            created_at: invitation.created_at,
        }
    }
}

/// Lists all members of a project
pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<MemberWithUser>>> {
    check_project_access(&state.db, project_id, auth.user_id, Role::Viewer).await?;

    let members = Membership::list_by_project(&state.db, project_id).await?;
    Ok(Json(members))
}

/// Changes a member's role
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an Owner
/// - `404 Not Found`: Project hidden, or target is not a member
/// - `409 Conflict`: Demotion would leave the project without an Owner
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> ApiResult<Json<Membership>> {
    check_project_access(&state.db, project_id, auth.user_id, Role::Owner).await?;

    // Guard and mutation run in one transaction; a concurrent demotion of
    // the other remaining owner serializes against this one
    match Membership::update_role_guarded(&state.db, project_id, user_id, req.role).await? {
        GuardedChange::Applied(membership) => Ok(Json(membership)),
        GuardedChange::NotFound => Err(ApiError::NotFound(
            "Member not found in this project".to_string(),
        )),
        GuardedChange::LastOwner => Err(ApiError::Conflict(
            "Cannot demote the last owner of a project".to_string(),
        )),
    }
}

/// Removes a member from a project
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an Owner
/// - `404 Not Found`: Project hidden, or target is not a member
/// - `409 Conflict`: Removal would leave the project without an Owner
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    check_project_access(&state.db, project_id, auth.user_id, Role::Owner).await?;

    match Membership::remove_guarded(&state.db, project_id, user_id).await? {
        GuardedChange::Applied(()) => Ok(StatusCode::NO_CONTENT),
        GuardedChange::NotFound => Err(ApiError::NotFound(
            "Member not found in this project".to_string(),
        )),
        GuardedChange::LastOwner => Err(ApiError::Conflict(
            "Cannot remove the last owner of a project".to_string(),
        )),
    }
}

/// Lists pending invitations for a project
///
/// Owner-only: invitation records carry tokens and invitee emails.
pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Invitation>>> {
    check_project_access(&state.db, project_id, auth.user_id, Role::Owner).await?;

    let invitations = Invitation::list_pending_by_project(&state.db, project_id).await?;
    Ok(Json(invitations))
}

/// Invites a user to a project by email
///
/// The email does not have to belong to an existing account; the invitation
/// is matched against the accepting user's email at acceptance time.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an Owner
/// - `404 Not Found`: Project hidden from the caller
/// - `409 Conflict`: Invitee is already a member, or a pending invitation
///   for this email already exists
pub async fn create_invitation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateInvitationRequest>,
) -> ApiResult<(StatusCode, Json<InvitationResponse>)> {
    req.validate().map_err(validation_details)?;

    check_project_access(&state.db, project_id, auth.user_id, Role::Owner).await?;

    let project = Project::find_by_id(&state.db, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found or access denied".to_string()))?;

    // Reject if the email already maps to a member
    if let Some(invitee) = User::find_by_email(&state.db, &req.email).await? {
        if Membership::find(&state.db, project_id, invitee.id).await?.is_some() {
            return Err(ApiError::Conflict(
                "User is already a member of this project".to_string(),
            ));
        }
    }

    if Invitation::find_pending(&state.db, project_id, &req.email).await?.is_some() {
        return Err(ApiError::Conflict(
            "Pending invitation already exists for this email".to_string(),
        ));
    }

    let invitation = Invitation::create(
        &state.db,
        CreateInvitation {
            project_id,
            invited_by_user_id: auth.user_id,
            invited_email: req.email,
            role: req.role,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(InvitationResponse::new(invitation, project.title)),
    ))
}

/// Looks up an invitation by token, for the acceptance page
///
/// Public: the token itself is the credential.
///
/// # Errors
///
/// - `404 Not Found`: Unknown token
/// - `410 Gone`: Already accepted, declined, or cancelled
/// - `410 Gone` (expired): Past its TTL
pub async fn get_invitation_by_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<InvitationResponse>> {
    let invitation = Invitation::find_by_token(&state.db, &token)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))?;

    ensure_redeemable(&invitation)?;

    let project_name = Project::find_by_id(&state.db, invitation.project_id)
        .await?
        .map(|p| p.title)
        .unwrap_or_else(|| "Unknown Project".to_string());

    Ok(Json(InvitationResponse::new(invitation, project_name)))
}

/// Accepts an invitation
///
/// The accepting user's email must exactly match the invited email
/// (case-sensitive comparison). On success the membership is created or its
/// role updated, and the invitation is consumed; a second accept of the
/// same invitation fails with `410 Gone` and never duplicates a membership.
///
/// # Errors
///
/// - `403 Forbidden`: Caller's email does not match the invitation
/// - `404 Not Found`: Unknown invitation
/// - `410 Gone`: Already consumed or closed
/// - `410 Gone` (expired): Past its TTL; no membership is created
pub async fn accept_invitation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(invitation_id): Path<Uuid>,
) -> ApiResult<Json<Membership>> {
    let invitation = Invitation::find_by_id(&state.db, invitation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    if user.email != invitation.invited_email {
        return Err(ApiError::Forbidden(
            "This invitation is for a different email address".to_string(),
        ));
    }

    ensure_redeemable(&invitation)?;

    let consumed = Invitation::accept(&state.db, invitation.id, auth.user_id).await?;
    if !consumed {
        // Raced with another accept or a cancellation
        return Err(ApiError::Gone(
            "Invitation has already been used".to_string(),
        ));
    }

    let membership = Membership::find(&state.db, invitation.project_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::InternalError("Membership missing after accept".to_string()))?;

    Ok(Json(membership))
}

/// Declines an invitation
///
/// # Errors
///
/// - `403 Forbidden`: Caller's email does not match the invitation
/// - `404 Not Found`: Unknown invitation
/// - `410 Gone`: Already consumed or closed
pub async fn decline_invitation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(invitation_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let invitation = Invitation::find_by_id(&state.db, invitation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    if user.email != invitation.invited_email {
        return Err(ApiError::Forbidden(
            "This invitation is for a different email address".to_string(),
        ));
    }

    if invitation.status != InvitationStatus::Pending {
        return Err(ApiError::Gone(format!(
            "Invitation has already been {}",
            invitation.status.as_str()
        )));
    }

    let closed = Invitation::close(&state.db, invitation.id, InvitationStatus::Declined).await?;
    if !closed {
        return Err(ApiError::Gone(
            "Invitation has already been used".to_string(),
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Regenerates a pending invitation's token and expiry
///
/// The previous token stops working, keeping the invitation single-use.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an Owner of the project
/// - `404 Not Found`: Unknown invitation or project hidden from caller
/// - `410 Gone`: Invitation is no longer pending
pub async fn resend_invitation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(invitation_id): Path<Uuid>,
) -> ApiResult<Json<InvitationResponse>> {
    let invitation = Invitation::find_by_id(&state.db, invitation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))?;

    check_project_access(&state.db, invitation.project_id, auth.user_id, Role::Owner).await?;

    if invitation.status != InvitationStatus::Pending {
        return Err(ApiError::Gone(format!(
            "Invitation has already been {}",
            invitation.status.as_str()
        )));
    }

    let refreshed = Invitation::resend(&state.db, invitation.id)
        .await?
        .ok_or_else(|| ApiError::Gone("Invitation has already been used".to_string()))?;

    let project_name = Project::find_by_id(&state.db, refreshed.project_id)
        .await?
        .map(|p| p.title)
        .unwrap_or_else(|| "Unknown Project".to_string());

    Ok(Json(InvitationResponse::new(refreshed, project_name)))
}

/// Cancels a pending invitation
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an Owner of the project
/// - `404 Not Found`: Unknown invitation or project hidden from caller
/// - `410 Gone`: Invitation is no longer pending
pub async fn cancel_invitation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(invitation_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let invitation = Invitation::find_by_id(&state.db, invitation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))?;

    check_project_access(&state.db, invitation.project_id, auth.user_id, Role::Owner).await?;

    let closed = Invitation::close(&state.db, invitation.id, InvitationStatus::Cancelled).await?;
    if !closed {
        return Err(ApiError::Gone(format!(
            "Invitation has already been {}",
            invitation.status.as_str()
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Rejects consumed, closed, or expired invitations
fn ensure_redeemable(invitation: &Invitation) -> Result<(), ApiError> {
    if invitation.status != InvitationStatus::Pending {
        return Err(ApiError::Gone(format!(
            "Invitation has already been {}",
            invitation.status.as_str()
        )));
    }

    if invitation.is_expired() {
        return Err(ApiError::Expired("Invitation has expired".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use adept_shared::models::invitation::generate_invitation_token;
    use chrono::Duration;

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
    fn test_redeemable_pending_invitation() {
        let inv = sample_invitation(InvitationStatus::Pending, Utc::now() + Duration::days(7));
        assert!(ensure_redeemable(&inv).is_ok());
    }

    #[test]
    fn test_accepted_invitation_is_gone() {
        let inv = sample_invitation(InvitationStatus::Accepted, Utc::now() + Duration::days(7));
        assert!(matches!(ensure_redeemable(&inv), Err(ApiError::Gone(_))));
    }

    #[test]
    fn test_expired_invitation_is_expired_not_gone() {
        // pending but past its TTL
        let inv = sample_invitation(InvitationStatus::Pending, Utc::now() - Duration::days(1));
        assert!(matches!(ensure_redeemable(&inv), Err(ApiError::Expired(_))));
    }

    #[test]
    fn test_cancelled_invitation_is_gone_even_if_unexpired() {
        let inv = sample_invitation(InvitationStatus::Cancelled, Utc::now() + Duration::days(7));
        assert!(matches!(ensure_redeemable(&inv), Err(ApiError::Gone(_))));
    }
}
