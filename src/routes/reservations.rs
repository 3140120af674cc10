//! Reservation, series and payment routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::middleware::auth::CurrentUser;
use crate::middleware::rbac::RequireAdmin;
use crate::models::billing::{
    CreateSeries, MonthlyPayment, PaymentFilters, RecordPayment, ReservationSeries, SeriesCreated,
};
use crate::models::pagination::{Page, Pagination};
use crate::models::reservation::{
    CreateReservation, Reservation, ReservationFilters, ReservationSummary,
    UpdateReservationStatus,
};
use crate::services::{payment, reservation, series};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateParams {
    pub month: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Affected {
    pub count: u64,
}

/// GET /api/reservations
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<ReservationFilters>,
) -> Result<Json<Page<ReservationSummary>>, AppError> {
    Ok(Json(
        reservation::list(&state.db, user.actor(), &filters, &pagination).await?,
    ))
}

/// POST /api/reservations
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CreateReservation>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let created = reservation::create(&state.db, user.actor(), &body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /api/reservations/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateReservationStatus>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(
        reservation::update_status(&state.db, id, body.status, user.actor()).await?,
    ))
}

/// POST /api/series
pub async fn create_series(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CreateSeries>,
) -> Result<(StatusCode, Json<SeriesCreated>), AppError> {
    let created = series::create(
        &state.db,
        user.actor(),
        &body,
        state.config.series_horizon_weeks,
        state.config.default_payment_due_day,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/series
pub async fn list_series(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ReservationSeries>>, AppError> {
    Ok(Json(series::list(&state.db, user.actor()).await?))
}

/// DELETE /api/series/{id}
pub async fn cancel_series(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Affected>, AppError> {
    let count = series::cancel(&state.db, id, user.actor()).await?;
    Ok(Json(Affected { count }))
}

/// POST /api/payments/generate?month=YYYY-MM
pub async fn generate_payments(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<GenerateParams>,
) -> Result<Json<Affected>, AppError> {
    let month = match params.month.as_deref() {
        Some(value) => payment::parse_month(value)
            .ok_or_else(|| AppError::Validation("month must be formatted YYYY-MM".to_string()))?,
        None => payment::month_start(Utc::now().date_naive()),
    };
    let count =
        payment::generate_for_month(&state.db, month, state.config.default_payment_due_day).await?;
    Ok(Json(Affected { count }))
}

/// POST /api/payments/mark-overdue
pub async fn mark_overdue(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Affected>, AppError> {
    let count = payment::mark_overdue(&state.db, Utc::now().date_naive()).await?;
    Ok(Json(Affected { count }))
}

/// POST /api/payments/{id}/record
pub async fn record_payment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(body): Json<RecordPayment>,
) -> Result<Json<MonthlyPayment>, AppError> {
    Ok(Json(
        payment::record(&state.db, id, body.amount, admin.actor()).await?,
    ))
}

/// GET /api/payments
pub async fn list_payments(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<PaymentFilters>,
) -> Result<Json<Page<MonthlyPayment>>, AppError> {
    Ok(Json(
        payment::list(&state.db, user.actor(), &filters, &pagination).await?,
    ))
}
