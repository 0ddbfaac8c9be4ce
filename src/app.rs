use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::JwtKeys;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, validate_user_middleware};
use crate::sheets::{sink_from_config, SheetSink};

/// Shared handles every request handler can reach
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub keys: Arc<JwtKeys>,
    pub sheets: Arc<dyn SheetSink>,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(pool: PgPool, keys: JwtKeys, sheets: Arc<dyn SheetSink>, bcrypt_cost: u32) -> Self {
        Self {
            pool,
            keys: Arc::new(keys),
            sheets,
            bcrypt_cost,
        }
    }

    /// Build the pool, token keys and spreadsheet sink from configuration
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = DatabaseManager::connect_lazy(&config.database)?;
        let sheets = sink_from_config(&config.sheets)?;
        Ok(Self::new(
            pool,
            JwtKeys::from_config(&config.security),
            sheets,
            config.security.bcrypt_cost,
        ))
    }
}

pub fn app(state: AppState, cors_origins: &[String]) -> Router {
    let protected_routes = Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(site_routes())
        .merge(material_routes())
        .merge(allocation_routes())
        .merge(expense_routes())
        .merge(activity_routes())
        .merge(attendance_routes())
        .merge(report_routes())
        // Layers run bottom-up: token first, then the user lookup
        .route_layer(from_fn_with_state(state.clone(), validate_user_middleware))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        // Public
        .route("/", get(public::system::root))
        .route("/health", get(public::system::health))
        .route("/api/auth/login", post(public::auth::login_post))
        // Protected API
        .merge(protected_routes)
        // Global middleware
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    CorsLayer::permissive().allow_origin(AllowOrigin::list(allowed))
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register_post))
        .route("/api/auth/me", get(auth::me_get))
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route("/api/users/supervisors", get(users::supervisors_get))
        .route("/api/users/:id", put(users::user_put).delete(users::user_delete))
}

fn site_routes() -> Router<AppState> {
    use protected::sites;

    Router::new()
        .route("/api/sites", get(sites::sites_get).post(sites::sites_post))
        .route("/api/sites/:id", put(sites::site_put))
}

fn material_routes() -> Router<AppState> {
    use protected::materials;

    Router::new()
        .route(
            "/api/materials",
            get(materials::materials_get).post(materials::materials_post),
        )
        .route("/api/materials/:id", put(materials::material_put))
}

fn allocation_routes() -> Router<AppState> {
    use protected::allocations;

    Router::new()
        .route(
            "/api/allocations",
            get(allocations::allocations_get).post(allocations::allocations_post),
        )
        .route("/api/allocations/balance", get(allocations::balance_get))
}

fn expense_routes() -> Router<AppState> {
    use protected::expenses;

    Router::new()
        .route(
            "/api/expenses",
            get(expenses::expenses_get).post(expenses::expenses_post),
        )
        .route(
            "/api/expenses/:id",
            get(expenses::expense_get).put(expenses::expense_put),
        )
        .route("/api/expenses/:id/status", put(expenses::status_put))
}

fn activity_routes() -> Router<AppState> {
    use protected::activities;

    Router::new()
        .route(
            "/api/activities",
            get(activities::activities_get).post(activities::activities_post),
        )
        .route(
            "/api/activities/:id",
            axum::routing::delete(activities::activity_delete),
        )
}

fn attendance_routes() -> Router<AppState> {
    use protected::attendance;

    Router::new()
        .route(
            "/api/attendance",
            get(attendance::attendance_get).post(attendance::attendance_post),
        )
        .route("/api/attendance/:id/status", put(attendance::status_put))
}

fn report_routes() -> Router<AppState> {
    use protected::reports;

    Router::new().route("/api/reports/summary", get(reports::summary_get))
}
