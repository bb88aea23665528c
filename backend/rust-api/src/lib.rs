use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    // The quiz endpoints are consumed by a browser client on another
    // origin.
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to specific origins in production

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        // Quiz endpoints (public, CORS-enabled)
        .nest("/api", quiz_routes().layer(cors))
        // Auth endpoints
        .route("/auth/login", post(handlers::auth::login))
        // Admin endpoints (require JWT + ADMIN role)
        .nest(
            "/admin",
            admin_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn quiz_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/question", get(handlers::quiz::get_question))
        .route("/check-answer", post(handlers::quiz::check_answer))
        .route("/interactions", post(handlers::quiz::log_interaction))
        .route("/session-stats", post(handlers::quiz::log_session_stats))
}

fn admin_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route(
            "/questions",
            get(handlers::questions::list_questions).post(handlers::questions::create_question),
        )
        .route("/users", get(handlers::admin::list_users))
        .route("/session-stats", get(handlers::admin::list_session_stats))
        .route_layer(middleware::from_fn(
            middlewares::auth::admin_guard_middleware,
        ))
}
