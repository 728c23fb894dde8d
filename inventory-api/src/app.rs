/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use inventory_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = inventory_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::{handle_middleware_error, ApiError},
    middleware::security::SecurityHeadersLayer,
};
use axum::{
    error_handling::HandleErrorLayer,
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post},
    Router,
};
use inventory_shared::{
    assets::store::AssetStore,
    auth::{cookie::CookieProfile, middleware::authenticate, password::CredentialStore},
    repository::{
        postgres::{PgSettingsRepository, PgUserRepository},
        SettingsRepository, UserRepository,
    },
};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Headroom above the upload limit for multipart framing and text fields
const BODY_LIMIT_OVERHEAD: u64 = 1024 * 1024;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every field
/// is either an `Arc` or cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,

    pub settings: Arc<dyn SettingsRepository>,

    /// Pool backing the repositories, when they are PostgreSQL-backed
    pub db: Option<PgPool>,

    pub credentials: CredentialStore,

    pub assets: AssetStore,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates state backed by PostgreSQL
    pub fn new(db: PgPool, config: Config) -> Self {
        let users = Arc::new(PgUserRepository::new(db.clone()));
        let settings = Arc::new(PgSettingsRepository::new(db.clone()));

        let mut state = Self::with_repositories(users, settings, config);
        state.db = Some(db);
        state
    }

    /// Creates state over arbitrary repositories
    pub fn with_repositories(
        users: Arc<dyn UserRepository>,
        settings: Arc<dyn SettingsRepository>,
        config: Config,
    ) -> Self {
        let assets = AssetStore::new(config.uploads.dir.clone(), config.uploads.max_bytes);

        Self {
            users,
            settings,
            db: None,
            credentials: CredentialStore::default(),
            assets,
            config: Arc::new(config),
        }
    }

    /// Replaces the password hashing parameters
    pub fn with_credentials(mut self, credentials: CredentialStore) -> Self {
        self.credentials = credentials;
        self
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Session cookie attributes for the deployment environment
    pub fn cookie_profile(&self) -> CookieProfile {
        self.config.api.environment.cookie_profile()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /                         # liveness text
/// ├── GET /version
/// ├── GET /health
/// ├── /uploads/**                   # static files from the upload root
/// └── /api/
///     ├── /users/
///     │   ├── POST   /register      # public
///     │   ├── POST   /login         # public
///     │   ├── POST   /logout        # public
///     │   ├── GET    /              # authenticated
///     │   ├── GET    /:id           # authenticated
///     │   ├── PATCH  /:id           # self or admin
///     │   ├── PATCH  /:id/avatar    # self or admin, multipart
///     │   └── DELETE /:id           # self or admin
///     └── /basic-settings           # admin; GET POST PATCH DELETE
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, tracing, timeout, body limit,
/// then authentication on protected routes.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_user_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout));

    let protected_user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route(
            "/:id",
            get(routes::users::get_user)
                .patch(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route("/:id/avatar", patch(routes::users::update_avatar))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let settings_routes = Router::new()
        .route(
            "/",
            get(routes::settings::get_settings)
                .post(routes::settings::create_settings)
                .patch(routes::settings::update_settings)
                .delete(routes::settings::delete_settings),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let api_routes = Router::new()
        .nest("/users", public_user_routes.merge(protected_user_routes))
        .nest("/basic-settings", settings_routes);

    let cors = build_cors(&state.config.api.cors_origins);

    let body_limit = state
        .config
        .uploads
        .max_bytes
        .saturating_add(BODY_LIMIT_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    let production = state.config.api.environment.is_production();

    Router::new()
        .route("/", get(routes::health::root))
        .route("/version", get(routes::health::version))
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .nest_service("/uploads", ServeDir::new(state.assets.root()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(Duration::from_secs(state.config.api.request_timeout_seconds)),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production, production))
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        // Any origin; browsers refuse credentials with a wildcard
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
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
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Session authentication layer
///
/// Verifies the session token from the configured transport and inserts the
/// resulting `AuthContext` into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(
        req.headers(),
        state.jwt_secret(),
        state.config.jwt.transport,
    )?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
