//! Authentication service: password hashing, JWT, login, club registration.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::club::{Club, RegisterClub};
use crate::models::locale::Locale;
use crate::models::user::{User, UserRole};
use crate::services::notification::{self, templates};

/// JWT claims embedded in access and refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub user_id: String,
    pub role: String,
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Result of a club registration. The verification token is handed to the
/// mail collaborator, never returned to the client.
#[derive(Debug)]
pub struct Registration {
    pub user: User,
    pub club: Club,
    pub verification_token: String,
}

/// Hash a plaintext password with argon2id.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {e}")))
}

/// Verify a plaintext password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// SHA-256 hex digest of an opaque token; only digests are stored.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn generate_tokens(
    user: &User,
    jwt_secret: &str,
    access_expiry_secs: i64,
    refresh_expiry_secs: i64,
) -> Result<TokenPair, AppError> {
    let now = Utc::now();
    let encoding_key = EncodingKey::from_secret(jwt_secret.as_bytes());

    let claims_for = |token_type: &str, expiry_secs: i64| Claims {
        sub: user.email.clone(),
        user_id: user.id.to_string(),
        role: user.role.as_str().to_string(),
        token_type: token_type.to_string(),
        exp: (now + Duration::seconds(expiry_secs)).timestamp(),
        iat: now.timestamp(),
    };

    let access_token = jsonwebtoken::encode(
        &Header::default(),
        &claims_for("access", access_expiry_secs),
        &encoding_key,
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {e}")))?;

    let refresh_token = jsonwebtoken::encode(
        &Header::default(),
        &claims_for("refresh", refresh_expiry_secs),
        &encoding_key,
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {e}")))?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: access_expiry_secs,
    })
}

/// Validate a JWT and return the claims.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<Claims, AppError> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    jsonwebtoken::decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthorized)
}

/// Register a club owner account together with its club.
///
/// The account starts unapproved and unverified; every administrator gets a
/// notification so the request shows up in the dashboard.
pub async fn register_club(pool: &PgPool, input: &RegisterClub) -> Result<Registration, AppError> {
    let password_hash = hash_password(&input.password)?;
    let verification_token = Uuid::new_v4().simple().to_string();
    let locale = input
        .preferred_locale
        .as_deref()
        .and_then(Locale::from_tag)
        .unwrap_or_default();

    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password_hash, phone, role, verification_token_hash, preferred_locale)
        VALUES ($1, LOWER($2), $3, $4, 'CLUB', $5, $6)
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.email)
    .bind(&password_hash)
    .bind(&input.phone)
    .bind(hash_token(&verification_token))
    .bind(locale.as_str())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Email already registered".to_string())
        }
        _ => AppError::Database(e),
    })?;

    let club = sqlx::query_as::<_, Club>(
        r#"
        INSERT INTO clubs (user_id, name, sport_id, address)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(&input.club_name)
    .bind(input.sport_id)
    .bind(&input.address)
    .fetch_one(&mut *tx)
    .await?;

    notification::notify_admins(
        &mut *tx,
        Some(user.id),
        "CLUB",
        Some(club.id),
        templates::club_registered(&club.name),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, club_id = %club.id, "Club registered, awaiting approval");

    Ok(Registration {
        user,
        club,
        verification_token,
    })
}

/// Mark the account owning `token` as verified.
pub async fn verify_email(pool: &PgPool, token: &str) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET email_verified = true, verification_token_hash = NULL, updated_at = NOW()
        WHERE verification_token_hash = $1 AND deleted_at IS NULL
        RETURNING *
        "#,
    )
    .bind(hash_token(token))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Validation("Invalid or expired verification token".to_string()))
}

/// Authenticate by email and password, returning a token pair.
pub async fn login(
    pool: &PgPool,
    email: &str,
    password: &str,
    jwt_secret: &str,
    access_expiry_secs: i64,
    refresh_expiry_secs: i64,
) -> Result<TokenPair, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE email = LOWER($1) AND deleted_at IS NULL",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    if !verify_password(password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Rejected login: bad password");
        return Err(AppError::Unauthorized);
    }

    if user.role == UserRole::Club && !user.is_approved {
        return Err(AppError::Forbidden(
            "Account is pending administrator approval".to_string(),
        ));
    }

    generate_tokens(&user, jwt_secret, access_expiry_secs, refresh_expiry_secs)
}

/// Refresh an access token using a valid refresh token.
pub async fn refresh_token(
    pool: &PgPool,
    refresh_token_str: &str,
    jwt_secret: &str,
    access_expiry_secs: i64,
    refresh_expiry_secs: i64,
) -> Result<TokenPair, AppError> {
    let claims = validate_token(refresh_token_str, jwt_secret)?;

    if claims.token_type != "refresh" {
        return Err(AppError::Unauthorized);
    }

    let user_id: Uuid = claims
        .user_id
        .parse()
        .map_err(|_| AppError::Unauthorized)?;

    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    generate_tokens(&user, jwt_secret, access_expiry_secs, refresh_expiry_secs)
}

pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "hash".to_string(),
            phone: None,
            role,
            is_approved: true,
            email_verified: true,
            verification_token_hash: None,
            preferred_locale: "fr".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn password_hash_and_verify() {
        let hash = hash_password("Stade2025!").unwrap();
        assert_ne!(hash, "Stade2025!");
        assert!(verify_password("Stade2025!", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn token_generation_and_validation() {
        let secret = "test-secret-key-for-jwt";
        let tokens = generate_tokens(&user(UserRole::Admin), secret, 900, 604_800).unwrap();
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.expires_in, 900);

        let claims = validate_token(&tokens.access_token, secret).unwrap();
        assert_eq!(claims.sub, "test@example.com");
        assert_eq!(claims.token_type, "access");
        assert_eq!(claims.role, "ADMIN");

        let refresh_claims = validate_token(&tokens.refresh_token, secret).unwrap();
        assert_eq!(refresh_claims.token_type, "refresh");
    }

    #[test]
    fn token_signed_with_other_secret_rejected() {
        let tokens = generate_tokens(&user(UserRole::Club), "one", 900, 900).unwrap();
        assert!(validate_token(&tokens.access_token, "two").is_err());
    }

    #[test]
    fn expired_token_rejected() {
        // Well beyond the default 60s leeway.
        let tokens = generate_tokens(&user(UserRole::Club), "s", -3600, -3600).unwrap();
        assert!(validate_token(&tokens.access_token, "s").is_err());
    }

    #[test]
    fn token_hash_is_stable_hex() {
        let digest = hash_token("abc");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_token("abc"));
        assert_ne!(digest, hash_token("abd"));
    }
}
