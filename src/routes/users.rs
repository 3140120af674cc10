//! Admin user management routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::middleware::rbac::RequireAdmin;
use crate::models::pagination::{Page, Pagination};
use crate::models::user::{UserFilters, UserResponse};
use crate::services::user as user_service;
use crate::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct DeleteParams {
    #[serde(default)]
    pub hard: bool,
}

/// GET /api/users
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<UserFilters>,
) -> Result<Json<Page<UserResponse>>, AppError> {
    Ok(Json(user_service::list(&state.db, &filters, &pagination).await?))
}

/// POST /api/users/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(user_service::approve(&state.db, id, admin.actor()).await?))
}

/// POST /api/users/{id}/decline
pub async fn decline(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(user_service::decline(&state.db, id, admin.actor()).await?))
}

/// DELETE /api/users/{id}?hard=true
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, AppError> {
    if params.hard {
        user_service::hard_delete(&state.db, id, admin.actor()).await?;
    } else {
        user_service::soft_delete(&state.db, id, admin.actor()).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
