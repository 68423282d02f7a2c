/// Integration tests for the Adept API
///
/// These tests verify the full system works end-to-end:
/// - API endpoints with authentication
/// - Bulk task creation (ordering and atomicity at the HTTP layer)
/// - Owner-invariant enforcement on membership routes
/// - Invitation acceptance flow
///
/// They require a running PostgreSQL database plus DATABASE_URL and
/// JWT_SECRET in the environment.
/// Run with: cargo test --test integration_test -- --test-threads=1

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::TestContext;
use serde_json::json;
use tower::Service as _;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Requests without a bearer token are rejected before any handler runs
#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let ctx = TestContext::new().await.unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/v1/projects")
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

/// A bulk batch comes back from the listing endpoint in submission order
#[tokio::test]
async fn test_bulk_create_lists_in_submission_order() {
    let ctx = TestContext::new().await.unwrap();

    let tasks: Vec<serde_json::Value> = (1..=6)
        .map(|i| json!({"title": format!("Phase {}", i)}))
        .collect();

    let request = Request::builder()
        .method("POST")
        .uri(format!("/v1/projects/{}/tasks/bulk", ctx.project.id))
        .header("authorization", ctx.auth_header())
        .header("content-type", "application/json")
        .body(Body::from(json!({ "tasks": tasks }).to_string()))
        .unwrap();

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = Request::builder()
        .method("GET")
        .uri(format!("/v1/projects/{}/tasks", ctx.project.id))
        .header("authorization", ctx.auth_header())
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let listed = body_json(response).await;
    let titles: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    let expected: Vec<String> = (1..=6).map(|i| format!("Phase {}", i)).collect();
    assert_eq!(titles, expected.iter().map(String::as_str).collect::<Vec<_>>());

    ctx.cleanup().await.unwrap();
}

/// A batch with one invalid item persists nothing
#[tokio::test]
async fn test_bulk_create_rejects_whole_batch_on_invalid_item() {
    let ctx = TestContext::new().await.unwrap();

    let request = Request::builder()
        .method("POST")
        .uri(format!("/v1/projects/{}/tasks/bulk", ctx.project.id))
        .header("authorization", ctx.auth_header())
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "tasks": [
                    {"title": "Valid"},
                    {"title": ""}
                ]
            })
            .to_string(),
        ))
        .unwrap();

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let request = Request::builder()
        .method("GET")
        .uri(format!("/v1/projects/{}/tasks", ctx.project.id))
        .header("authorization", ctx.auth_header())
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.clone().call(request).await.unwrap();
    let listed = body_json(response).await;
    assert!(listed.as_array().unwrap().is_empty());

    ctx.cleanup().await.unwrap();
}

/// The sole Owner of a project cannot remove themselves
#[tokio::test]
async fn test_removing_sole_owner_conflicts() {
    let ctx = TestContext::new().await.unwrap();

    let request = Request::builder()
        .method("DELETE")
        .uri(format!(
            "/v1/projects/{}/members/{}",
            ctx.project.id, ctx.user.id
        ))
        .header("authorization", ctx.auth_header())
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["error"], "conflict");

    ctx.cleanup().await.unwrap();
}

/// The sole Owner of a project cannot demote themselves either
#[tokio::test]
async fn test_demoting_sole_owner_conflicts() {
    let ctx = TestContext::new().await.unwrap();

    let request = Request::builder()
        .method("PUT")
        .uri(format!(
            "/v1/projects/{}/members/{}",
            ctx.project.id, ctx.user.id
        ))
        .header("authorization", ctx.auth_header())
        .header("content-type", "application/json")
        .body(Body::from(json!({"role": "editor"}).to_string()))
        .unwrap();

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    ctx.cleanup().await.unwrap();
}

/// Accepting an invitation twice: the first succeeds, the second is Gone
#[tokio::test]
async fn test_invitation_accept_is_single_use() {
    let ctx = TestContext::new().await.unwrap();
    let (invitee, invitee_auth) = ctx.create_user_with_token().await.unwrap();

    let request = Request::builder()
        .method("POST")
        .uri(format!("/v1/projects/{}/invitations", ctx.project.id))
        .header("authorization", ctx.auth_header())
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"email": invitee.email, "role": "editor"}).to_string(),
        ))
        .unwrap();

    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let invitation = body_json(response).await;
    let invitation_id = invitation["id"].as_str().unwrap().to_string();

    let accept = |auth: String| {
        Request::builder()
            .method("POST")
            .uri(format!("/v1/team/invitations/{}/accept", invitation_id))
            .header("authorization", auth)
            .body(Body::empty())
            .unwrap()
    };

    let response = ctx.app.clone().call(accept(invitee_auth.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let membership = body_json(response).await;
    assert_eq!(membership["role"], "editor");

    // The invitation was consumed; a repeat accept must not succeed
    let response = ctx.app.clone().call(accept(invitee_auth)).await.unwrap();
    assert_eq!(response.status(), StatusCode::GONE);

    let body = body_json(response).await;
    assert_eq!(body["error"], "gone");

    ctx.delete_user(invitee.id).await.unwrap();
    ctx.cleanup().await.unwrap();
}
