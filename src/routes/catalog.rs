//! Clubs, sports and stadiums.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::middleware::auth::CurrentUser;
use crate::middleware::rbac::RequireAdmin;
use crate::models::club::{Club, ClubSummary, UpdateClub};
use crate::models::pagination::{Page, Pagination};
use crate::models::sport::{CreateSport, Sport};
use crate::models::stadium::{CreateStadium, Stadium, StadiumDetail, StadiumFilters, UpdateStadium};
use crate::services::{club as club_service, sport as sport_service, stadium as stadium_service};
use crate::AppState;

/// GET /api/clubs
pub async fn list_clubs(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<ClubSummary>>, AppError> {
    Ok(Json(club_service::list(&state.db, &pagination).await?))
}

/// GET /api/clubs/{id}
pub async fn get_club(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ClubSummary>, AppError> {
    Ok(Json(club_service::find_by_id(&state.db, id, user.actor()).await?))
}

/// PUT /api/clubs/{id}
pub async fn update_club(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateClub>,
) -> Result<Json<Club>, AppError> {
    body.validate()?;
    Ok(Json(club_service::update(&state.db, id, &body, user.actor()).await?))
}

/// GET /api/sports
pub async fn list_sports(State(state): State<AppState>) -> Result<Json<Vec<Sport>>, AppError> {
    Ok(Json(sport_service::list(&state.db).await?))
}

/// POST /api/sports
pub async fn create_sport(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(body): Json<CreateSport>,
) -> Result<(StatusCode, Json<Sport>), AppError> {
    body.validate()?;
    let sport = sport_service::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(sport)))
}

/// GET /api/stadiums
pub async fn list_stadiums(
    State(state): State<AppState>,
    Query(filters): Query<StadiumFilters>,
) -> Result<Json<Vec<Stadium>>, AppError> {
    Ok(Json(stadium_service::list(&state.db, &filters).await?))
}

/// GET /api/stadiums/{id}
pub async fn get_stadium(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StadiumDetail>, AppError> {
    Ok(Json(stadium_service::find_by_id(&state.db, id).await?))
}

/// POST /api/stadiums
pub async fn create_stadium(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(body): Json<CreateStadium>,
) -> Result<(StatusCode, Json<StadiumDetail>), AppError> {
    body.validate()?;
    let stadium = stadium_service::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(stadium)))
}

/// PUT /api/stadiums/{id}
pub async fn update_stadium(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStadium>,
) -> Result<Json<StadiumDetail>, AppError> {
    body.validate()?;
    Ok(Json(stadium_service::update(&state.db, id, &body).await?))
}

/// DELETE /api/stadiums/{id}
pub async fn delete_stadium(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    stadium_service::soft_delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
