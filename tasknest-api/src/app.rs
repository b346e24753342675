//! Application state and router builder
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tasknest_api::{app::{build_router, AppState}, config::Config};
//! use tasknest_shared::{email::LogMailer, store::MemoryStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(LogMailer), config);
//! let app = build_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use crate::{config::Config, middleware::{auth::require_auth, security::SecurityHeadersLayer}};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tasknest_shared::{
    accounts::AccountService,
    auth::TokenIssuer,
    email::{Mailer, Notifier},
    store::Store,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Room for multipart framing on top of the avatar bytes themselves
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
///
/// Cloned into each handler via Axum's `State` extractor; every field is a
/// cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// User and task persistence
    pub store: Arc<dyn Store>,

    /// Account and session operations
    pub accounts: AccountService,

    /// Welcome and cancellation emails
    pub notifier: Notifier,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        let accounts = AccountService::new(
            store.clone(),
            TokenIssuer::new(&config.jwt.secret),
            config.hashing_cost(),
        );
        let notifier = Notifier::new(mailer, config.email.from.clone());

        Self {
            store,
            accounts,
            notifier,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET    /health
/// ├── POST   /users                 signup
/// ├── POST   /users/login
/// ├── GET    /users/:id/avatar
/// │
/// │   authenticated:
/// ├── POST   /users/logout
/// ├── POST   /users/logoutAll
/// ├── GET    /users/me
/// ├── PATCH  /users/me
/// ├── DELETE /users/me
/// ├── POST   /users/me/avatar
/// ├── DELETE /users/me/avatar
/// ├── POST   /tasks
/// ├── GET    /tasks
/// ├── GET    /tasks/:id
/// ├── PATCH  /tasks/:id
/// └── DELETE /tasks/:id
/// ```
///
/// Layers, outermost first: security headers, CORS, request tracing, and
/// authentication on the protected routes only.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/users", post(routes::users::signup))
        .route("/users/login", post(routes::users::login))
        .route("/users/:id/avatar", get(routes::avatar::get_avatar));

    let avatar_limit = state.config.api.avatar_max_bytes + MULTIPART_OVERHEAD;

    let protected_routes = Router::new()
        .route("/users/logout", post(routes::users::logout))
        .route("/users/logoutAll", post(routes::users::logout_all))
        .route(
            "/users/me",
            get(routes::users::me)
                .patch(routes::users::update_me)
                .delete(routes::users::delete_me),
        )
        .route(
            "/users/me/avatar",
            post(routes::avatar::upload_avatar)
                .delete(routes::avatar::delete_avatar)
                .layer(DefaultBodyLimit::max(avatar_limit)),
        )
        .route(
            "/tasks",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let cors = if state.config.cors_allows_any() {
        CorsLayer::permissive()
    } else {
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
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
