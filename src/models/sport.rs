//! Sports offered by stadiums and practised by clubs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::locale::LocalizedText;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Sport {
    pub id: Uuid,
    pub name_fr: String,
    pub name_ar: String,
    pub name_en: String,
    pub created_at: DateTime<Utc>,
}

impl Sport {
    pub fn name(&self) -> LocalizedText {
        LocalizedText::new(&self.name_fr, &self.name_ar, &self.name_en)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSport {
    #[validate(length(min = 2, max = 60))]
    pub name_fr: String,
    #[validate(length(min = 2, max = 60))]
    pub name_ar: String,
    #[validate(length(min = 2, max = 60))]
    pub name_en: String,
}
