//! Dashboard routes: aggregated statistics for the overview page.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::errors::AppError;
use crate::middleware::auth::CurrentUser;
use crate::services::dashboard::{self, DashboardResponse};
use crate::services::date_range::DateRangeQuery;
use crate::AppState;

/// GET /api/dashboard/stats
pub async fn stats(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<DashboardResponse>, AppError> {
    tracing::debug!(user_id = %user.id, "Dashboard stats requested");
    let response = dashboard::get_stats(&state.db, &query).await?;
    Ok(Json(response))
}
