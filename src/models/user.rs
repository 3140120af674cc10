//! User accounts: administrators and club owners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Club,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Club => "CLUB",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(UserRole::Admin),
            "CLUB" => Some(UserRole::Club),
            _ => None,
        }
    }
}

/// Full user row from database (includes password_hash — never serialize to API).
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_approved: bool,
    pub email_verified: bool,
    pub verification_token_hash: Option<String>,
    pub preferred_locale: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins may act on anything; clubs only on rows they own.
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_approved: bool,
    pub email_verified: bool,
    pub preferred_locale: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            phone: u.phone,
            role: u.role,
            is_approved: u.is_approved,
            email_verified: u.email_verified,
            preferred_locale: u.preferred_locale,
            created_at: u.created_at,
        }
    }
}

/// Query filters for the admin user list.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserFilters {
    pub role: Option<UserRole>,
    pub approved: Option<bool>,
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::nil(),
            name: "Wydad Juniors".to_string(),
            email: "wydad@example.ma".to_string(),
            password_hash: "secret_hash".to_string(),
            phone: Some("+212600000000".to_string()),
            role: UserRole::Club,
            is_approved: false,
            email_verified: false,
            verification_token_hash: Some("abc".to_string()),
            preferred_locale: "ar".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn user_role_serialization() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"ADMIN\"");
        let role: UserRole = serde_json::from_str("\"CLUB\"").unwrap();
        assert_eq!(role, UserRole::Club);
    }

    #[test]
    fn user_role_parse_round_trips_as_str() {
        for role in [UserRole::Admin, UserRole::Club] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("SUPERUSER"), None);
    }

    #[test]
    fn actor_ownership() {
        let owner = Uuid::new_v4();
        let club = Actor { id: owner, role: UserRole::Club };
        let other = Actor { id: Uuid::new_v4(), role: UserRole::Club };
        let admin = Actor { id: Uuid::new_v4(), role: UserRole::Admin };
        assert!(club.can_access(owner));
        assert!(!other.can_access(owner));
        assert!(admin.can_access(owner));
    }

    #[test]
    fn user_response_excludes_secrets() {
        let json = serde_json::to_string(&UserResponse::from(sample_user())).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("verification"));
        assert!(json.contains("\"isApproved\":false"));
    }
}
