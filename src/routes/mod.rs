//! Route definitions for the stadium booking API.

pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod health;
pub mod notifications;
pub mod reservations;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::AppState;

/// Largest accepted JSON request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Full application router: health probes plus everything under `/api`.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.frontend_url);

    Router::new()
        .merge(health_routes())
        .nest("/api", api_routes())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/verify-email", post(auth::verify_email))
        // Users
        .route("/users", get(users::list))
        .route("/users/{id}", axum::routing::delete(users::delete))
        .route("/users/{id}/approve", post(users::approve))
        .route("/users/{id}/decline", post(users::decline))
        // Catalogue
        .route("/clubs", get(catalog::list_clubs))
        .route("/clubs/{id}", get(catalog::get_club).put(catalog::update_club))
        .route("/sports", get(catalog::list_sports).post(catalog::create_sport))
        .route(
            "/stadiums",
            get(catalog::list_stadiums).post(catalog::create_stadium),
        )
        .route(
            "/stadiums/{id}",
            get(catalog::get_stadium)
                .put(catalog::update_stadium)
                .delete(catalog::delete_stadium),
        )
        // Reservations and billing
        .route(
            "/reservations",
            get(reservations::list).post(reservations::create),
        )
        .route("/reservations/{id}/status", patch(reservations::update_status))
        .route(
            "/series",
            get(reservations::list_series).post(reservations::create_series),
        )
        .route("/series/{id}", axum::routing::delete(reservations::cancel_series))
        .route("/payments", get(reservations::list_payments))
        .route("/payments/generate", post(reservations::generate_payments))
        .route("/payments/mark-overdue", post(reservations::mark_overdue))
        .route("/payments/{id}/record", post(reservations::record_payment))
        // Notifications
        .route("/notifications", get(notifications::list))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        // Dashboard
        .route("/dashboard/stats", get(dashboard::stats))
}

/// Credentialed CORS for the configured frontend origin.
fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origin = match frontend_url.trim_end_matches('/').parse::<HeaderValue>() {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            tracing::warn!(frontend_url, "Invalid FRONTEND_URL, cross-origin requests will be refused");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
