//! Authentication routes: registration, login, refresh, logout, profile.

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::AppError;
use crate::middleware::auth::{CurrentUser, SESSION_COOKIE};
use crate::models::club::{Club, RegisterClub};
use crate::models::user::UserResponse;
use crate::services::auth as auth_service;
use crate::services::auth::TokenPair;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserResponse,
    pub club: Club,
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterClub>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    body.validate()?;
    let registration = auth_service::register_club(&state.db, &body).await?;

    // Mail delivery lives outside this service; the link is only logged.
    tracing::debug!(
        user_id = %registration.user.id,
        link = %format!("{}/verify-email?token={}", state.config.frontend_url, registration.verification_token),
        "Email verification link issued"
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserResponse::from(registration.user),
            club: registration.club,
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<TokenPair>), AppError> {
    let tokens = auth_service::login(
        &state.db,
        &body.email,
        &body.password,
        &state.config.jwt_secret,
        state.config.jwt_access_token_expiry_secs,
        state.config.jwt_refresh_token_expiry_secs,
    )
    .await?;

    let jar = jar.add(session_cookie(tokens.access_token.clone()));
    Ok((jar, Json(tokens)))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RefreshRequest>,
) -> Result<(CookieJar, Json<TokenPair>), AppError> {
    let tokens = auth_service::refresh_token(
        &state.db,
        &body.refresh_token,
        &state.config.jwt_secret,
        state.config.jwt_access_token_expiry_secs,
        state.config.jwt_refresh_token_expiry_secs,
    )
    .await?;

    let jar = jar.add(session_cookie(tokens.access_token.clone()));
    Ok((jar, Json(tokens)))
}

/// POST /api/auth/logout. Tokens are stateless; only the cookie is cleared.
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    )
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = auth_service::find_user_by_id(&state.db, current_user.id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// POST /api/auth/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<VerifyEmailRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = auth_service::verify_email(&state.db, body.token.trim()).await?;
    Ok(Json(UserResponse::from(user)))
}
