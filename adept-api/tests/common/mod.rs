/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - Test database setup and cleanup
/// - Test user/project creation
/// - JWT token generation
/// - API client helpers

use adept_api::app::{build_router, AppState};
use adept_api::config::Config;
use adept_shared::auth::jwt::{create_token, Claims, TokenType};
use adept_shared::db::migrations::run_migrations;
use adept_shared::models::project::{CreateProject, Project};
use adept_shared::models::user::{CreateUser, User};
use sqlx::PgPool;
use uuid::Uuid;

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    pub user: User,
    pub project: Project,
    pub jwt_token: String,
}

impl TestContext {
    /// Creates a new test context with a fresh user and project
    pub async fn new() -> anyhow::Result<Self> {
        // Load test configuration
        let config = Config::from_env()?;

        // Connect to database and apply migrations
        let db = PgPool::connect(&config.database.url).await?;
        run_migrations(&db).await?;

        // Create test user
        let user = User::create(
            &db,
            CreateUser {
                email: format!("test-{}@example.com", Uuid::new_v4()),
                password_hash: "test_hash".to_string(), // Not used in tests
                username: Some("Test User".to_string()),
            },
        )
        .await?;

        // Create a project owned by the test user
        let project = Project::create_with_owner(
            &db,
            CreateProject {
                user_id: user.id,
                title: format!("Test Project {}", Uuid::new_v4()),
                description: None,
            },
        )
        .await?;

        // Generate JWT token
        let claims = Claims::new(user.id, TokenType::Access);
        let jwt_token = create_token(&claims, &config.jwt.secret)?;

        // Build app
        let state = AppState::new(db.clone(), config.clone());
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            config,
            user,
            project,
            jwt_token,
        })
    }

    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.jwt_token)
    }

    /// Creates an additional user with their own bearer token
    pub async fn create_user_with_token(&self) -> anyhow::Result<(User, String)> {
        let user = User::create(
            &self.db,
            CreateUser {
                email: format!("test-{}@example.com", Uuid::new_v4()),
                password_hash: "test_hash".to_string(),
                username: None,
            },
        )
        .await?;

        let claims = Claims::new(user.id, TokenType::Access);
        let token = create_token(&claims, &self.config.jwt.secret)?;

        Ok((user, format!("Bearer {}", token)))
    }

    /// Deletes a user created outside the context (helpers above)
    pub async fn delete_user(&self, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Cleans up test data
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        // Delete the project (cascades to tasks, members, invitations)
        Project::delete(&self.db, self.project.id).await?;
        self.delete_user(self.user.id).await?;
        Ok(())
    }
}
