//! Notification inbox routes for the current user.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::middleware::auth::CurrentUser;
use crate::models::locale::Locale;
use crate::models::notification::{NotificationQuery, NotificationView};
use crate::services::notification as notification_service;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct Updated {
    pub updated: u64,
}

/// GET /api/notifications?locale=fr
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<NotificationView>>, AppError> {
    let locale = query.locale.as_deref().and_then(Locale::from_tag);
    let items = notification_service::list_for_user(&state.db, user.id)
        .await?
        .into_iter()
        .map(|n| NotificationView::new(n, locale))
        .collect();
    Ok(Json(items))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<UnreadCount>, AppError> {
    let count = notification_service::unread_count(&state.db, user.id).await?;
    Ok(Json(UnreadCount { count }))
}

/// POST /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<NotificationView>, AppError> {
    let n = notification_service::mark_read(&state.db, user.id, id).await?;
    Ok(Json(NotificationView::new(n, None)))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Updated>, AppError> {
    let updated = notification_service::mark_all_read(&state.db, user.id).await?;
    Ok(Json(Updated { updated }))
}
