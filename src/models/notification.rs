//! Trilingual notification records addressed to a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::locale::{Locale, LocalizedText};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "notification_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    ClubRegistered,
    AccountApproved,
    AccountDeclined,
    ReservationCreated,
    ReservationStatusChanged,
    PaymentRecorded,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub model: String,
    pub model_id: Option<Uuid>,
    pub title_fr: String,
    pub title_ar: String,
    pub title_en: String,
    pub message_fr: String,
    pub message_ar: String,
    pub message_en: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn title(&self) -> LocalizedText {
        LocalizedText::new(&self.title_fr, &self.title_ar, &self.title_en)
    }

    pub fn message(&self) -> LocalizedText {
        LocalizedText::new(&self.message_fr, &self.message_ar, &self.message_en)
    }
}

/// Notification as listed to its recipient, optionally resolved to one language.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl NotificationView {
    pub fn new(notification: Notification, locale: Option<Locale>) -> Self {
        let (title, message) = match locale {
            Some(l) => (
                Some(notification.title().get(l).to_string()),
                Some(notification.message().get(l).to_string()),
            ),
            None => (None, None),
        };
        Self {
            notification,
            title,
            message,
        }
    }
}

/// A notification to be inserted.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub model: &'static str,
    pub model_id: Option<Uuid>,
    pub title: LocalizedText,
    pub message: LocalizedText,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotificationQuery {
    pub locale: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Notification {
        Notification {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            actor_id: None,
            kind: NotificationKind::AccountApproved,
            model: "USER".to_string(),
            model_id: None,
            title_fr: "Compte approuvé".to_string(),
            title_ar: "تمت الموافقة على الحساب".to_string(),
            title_en: "Account approved".to_string(),
            message_fr: "m-fr".to_string(),
            message_ar: "m-ar".to_string(),
            message_en: "m-en".to_string(),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn view_resolves_requested_locale() {
        let json = serde_json::to_value(NotificationView::new(sample(), Some(Locale::En))).unwrap();
        assert_eq!(json["title"], "Account approved");
        assert_eq!(json["message"], "m-en");
        assert_eq!(json["kind"], "ACCOUNT_APPROVED");
    }

    #[test]
    fn view_without_locale_keeps_only_triplets() {
        let json = serde_json::to_value(NotificationView::new(sample(), None)).unwrap();
        assert!(json.get("title").is_none());
        assert_eq!(json["titleAr"], "تمت الموافقة على الحساب");
    }
}
