use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{
    Expiry, MemoryStore, SessionManagerLayer, SessionStore, cookie::SameSite,
};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::{Config, ServerConfig};
use crate::db::Store;
use crate::state::SharedState;

mod audit;
pub mod auth;
mod classes;
pub mod client_ip;
mod courses;
pub mod csrf;
mod error;
mod invoices;
mod observability;
mod permissions;
mod professors;
mod reports;
mod salaries;
mod settings;
mod students;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        self.shared.config()
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

fn session_layer<S: SessionStore + Clone>(
    store: S,
    server: &ServerConfig,
) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_secure(server.secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_idle_minutes,
        )))
}

pub async fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let server = state.config().server.clone();

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/health", get(observability::health))
        .route("/metrics", get(observability::get_metrics))
        .route("/csrf", get(csrf::get_token))
        .route("/auth/login", post(auth::login))
        .route("/auth/2fa/resend", post(auth::request_login_code))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/password/forgot", post(auth::request_password_reset))
        .route("/auth/password/reset", post(auth::reset_password));

    let api_router = if server.persistent_sessions {
        let pool = state.store().conn.get_sqlite_connection_pool().clone();
        let session_store = SqliteStore::new(pool);
        session_store.migrate().await?;
        api_router.layer(session_layer(session_store, &server))
    } else {
        api_router.layer(session_layer(MemoryStore::default(), &server))
    };

    let cors_layer = if server.cors_allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = server
            .cors_allowed_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    };

    Ok(Router::new()
        .nest("/api", api_router.with_state(state))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware)))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/password", post(auth::change_password))
        .route("/auth/requests", get(auth::list_requests))
        .route("/auth/requests/{public_id}", post(auth::handle_request))
        .route(
            "/permissions",
            get(permissions::get_matrix).post(permissions::update),
        )
        .route("/permissions/access", get(permissions::check))
        .route(
            "/permissions/request-access",
            post(permissions::request_access),
        )
        .route(
            "/permissions/verify-access",
            post(permissions::verify_access),
        )
        .route("/permissions/pin", post(permissions::change_pin))
        .route(
            "/settings",
            get(settings::get_settings).post(settings::update_setting),
        )
        .route("/settings/unlock", post(settings::unlock))
        .route("/audit/activity", get(audit::list_activity))
        .route("/audit/pin", get(audit::list_pin_audit))
        .route("/dashboard/stats", get(audit::dashboard_stats))
        .route("/reports", get(reports::get_report))
        .route(
            "/courses",
            get(courses::list_courses).post(courses::create_course),
        )
        .route("/courses/{public_id}/update", post(courses::update_course))
        .route("/courses/{public_id}/delete", post(courses::delete_course))
        .route(
            "/classes",
            get(classes::list_classes).post(classes::create_class),
        )
        .route("/classes/{public_id}", get(classes::get_class))
        .route("/classes/{public_id}/update", post(classes::update_class))
        .route("/classes/{public_id}/delete", post(classes::delete_class))
        .route(
            "/students",
            get(students::list_students).post(students::create_student),
        )
        .route("/students/{public_id}/update", post(students::update_student))
        .route("/students/{public_id}/delete", post(students::delete_student))
        .route(
            "/professors",
            get(professors::list_professors).post(professors::create_professor),
        )
        .route(
            "/professors/{public_id}/update",
            post(professors::update_professor),
        )
        .route(
            "/professors/{public_id}/delete",
            post(professors::delete_professor),
        )
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route("/invoices/{public_id}/update", post(invoices::update_invoice))
        .route("/invoices/{public_id}/delete", post(invoices::delete_invoice))
        .route(
            "/salaries",
            get(salaries::list_salaries).post(salaries::create_salary),
        )
        .route("/salaries/{public_id}/update", post(salaries::update_salary))
        .route("/salaries/{public_id}/delete", post(salaries::delete_salary))
        // Later layers run first: authenticate, then check the CSRF token.
        .route_layer(middleware::from_fn(csrf::csrf_middleware))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
