/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use adept_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = adept_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    ai::{GrokClient, MockDecomposer, TaskDecomposer},
    config::Config,
};
use adept_shared::auth::{jwt, middleware::AuthContext};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Task decomposition adapter
    pub decomposer: Arc<dyn TaskDecomposer>,
}

impl AppState {
    /// Creates new application state
    ///
    /// Picks the Grok adapter when an API key is configured, the mock
    /// adapter otherwise.
    pub fn new(db: PgPool, config: Config) -> Self {
        let decomposer: Arc<dyn TaskDecomposer> = match &config.ai.api_key {
            Some(key) => Arc::new(GrokClient::new(
                key.clone(),
                config.ai.base_url.clone(),
                config.ai.model.clone(),
            )),
            None => {
                tracing::warn!("GROK_API_KEY not set, using mock task decomposer");
                Arc::new(MockDecomposer::new())
            }
        };

        Self {
            db,
            config: Arc::new(config),
            decomposer,
        }
    }

    /// Creates application state with an explicit decomposer (for tests)
    pub fn with_decomposer(
        db: PgPool,
        config: Config,
        decomposer: Arc<dyn TaskDecomposer>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            decomposer,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                                 # Health check (public)
/// ├── /v1/                                    # API v1 (versioned)
/// │   ├── /auth/
/// │   │   ├── POST /register                  # public
/// │   │   ├── POST /login                     # public
/// │   │   ├── POST /refresh                   # public
/// │   │   └── GET  /me                        # bearer
/// │   ├── /users/
/// │   │   └── PUT  /profile                   # bearer
/// │   ├── /projects/                          # bearer + role
/// │   │   ├── GET/POST    /
/// │   │   ├── GET/PUT/DELETE /:id
/// │   │   ├── GET/POST    /:id/tasks
/// │   │   ├── POST        /:id/tasks/bulk
/// │   │   ├── GET         /:id/members
/// │   │   ├── PUT/DELETE  /:id/members/:user_id
/// │   │   └── GET/POST    /:id/invitations
/// │   ├── /tasks/
/// │   │   └── PUT/DELETE  /:id
/// │   ├── /team/invitations/
/// │   │   ├── GET    /by-token/:token         # public
/// │   │   ├── POST   /:id/accept|decline|resend
/// │   │   └── DELETE /:id                     # cancel
/// │   ├── /ai/
/// │   │   └── POST /task-decompose
/// │   └── /analytics/
/// │       └── GET /kpis|task-trends|priority-distribution|status-distribution
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let auth_public_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    // Current-user routes (require JWT authentication)
    let auth_me_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let user_routes = Router::new()
        .route("/profile", put(routes::users::update_profile))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Project, task, and membership routes (require JWT authentication)
    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/:project_id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/:project_id/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/:project_id/tasks/bulk", post(routes::tasks::create_tasks_bulk))
        .route("/:project_id/members", get(routes::team::list_members))
        .route(
            "/:project_id/members/:user_id",
            put(routes::team::update_member_role).delete(routes::team::remove_member),
        )
        .route(
            "/:project_id/invitations",
            get(routes::team::list_invitations).post(routes::team::create_invitation),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let task_routes = Router::new()
        .route(
            "/:task_id",
            put(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Invitation lifecycle; token lookup is public, the rest needs a bearer
    let invitation_public_routes = Router::new().route(
        "/invitations/by-token/:token",
        get(routes::team::get_invitation_by_token),
    );

    let invitation_routes = Router::new()
        .route("/invitations/:invitation_id/accept", post(routes::team::accept_invitation))
        .route("/invitations/:invitation_id/decline", post(routes::team::decline_invitation))
        .route("/invitations/:invitation_id/resend", post(routes::team::resend_invitation))
        .route("/invitations/:invitation_id", delete(routes::team::cancel_invitation))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let ai_routes = Router::new()
        .route("/task-decompose", post(routes::ai::task_decompose))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let analytics_routes = Router::new()
        .route("/kpis", get(routes::analytics::get_kpis))
        .route("/task-trends", get(routes::analytics::get_task_trends))
        .route(
            "/priority-distribution",
            get(routes::analytics::get_priority_distribution),
        )
        .route(
            "/status-distribution",
            get(routes::analytics::get_status_distribution),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Build complete v1 API
    let v1_routes = Router::new()
        .nest("/auth", auth_public_routes.merge(auth_me_routes))
        .nest("/users", user_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/team", invitation_public_routes.merge(invitation_routes))
        .nest("/ai", ai_routes)
        .nest("/analytics", analytics_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Extracts and validates the access token from the Authorization header,
/// then injects AuthContext into request extensions.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| crate::error::ApiError::Unauthorized("Expected Bearer token".to_string()))?;

    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    let auth_context = AuthContext::from_jwt(claims.sub);
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
