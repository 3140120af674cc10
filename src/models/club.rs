//! Clubs: the organisations that book stadium slots, one per club user.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{8,15}$").expect("valid phone regex"));

/// Accept international or local phone numbers: optional `+`, 8 to 15 digits.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    if PHONE_RE.is_match(&compact) {
        Ok(())
    } else {
        Err(ValidationError::new("phone"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Club {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub sport_id: Option<Uuid>,
    pub address: Option<String>,
    pub monthly_fee: Option<f64>,
    pub payment_due_day: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Club row joined with its owner for admin listings.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClubSummary {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    pub owner_name: String,
    pub owner_email: String,
    pub is_approved: bool,
    pub sport_id: Option<Uuid>,
    pub monthly_fee: Option<f64>,
    pub payment_due_day: i32,
    pub created_at: DateTime<Utc>,
}

/// Public club registration form: creates the owner account and the club together.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterClub {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(min = 2, max = 120))]
    pub club_name: String,
    pub sport_id: Option<Uuid>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(length(min = 2, max = 2))]
    pub preferred_locale: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClub {
    #[validate(length(min = 2, max = 120))]
    pub name: Option<String>,
    pub sport_id: Option<Uuid>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(range(min = 0.0))]
    pub monthly_fee: Option<f64>,
    #[validate(range(min = 1, max = 28))]
    pub payment_due_day: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> RegisterClub {
        RegisterClub {
            name: "Karim Benali".to_string(),
            email: "karim@club.ma".to_string(),
            password: "Sup3rSecret!".to_string(),
            phone: Some("+212 612 345 678".to_string()),
            club_name: "Raja Académie".to_string(),
            sport_id: None,
            address: None,
            preferred_locale: Some("fr".to_string()),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(registration().validate().is_ok());
    }

    #[test]
    fn bad_email_and_short_password_rejected() {
        let mut form = registration();
        form.email = "not-an-email".to_string();
        form.password = "short".to_string();
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn phone_pattern() {
        assert!(validate_phone("0612345678").is_ok());
        assert!(validate_phone("+33 6 12 34 56 78").is_ok());
        assert!(validate_phone("12-34").is_err());
        assert!(validate_phone("phone").is_err());
    }

    #[test]
    fn due_day_out_of_range_rejected() {
        let update = UpdateClub {
            payment_due_day: Some(31),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
