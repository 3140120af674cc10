//! Stadiums with pricing, image gallery and the sports they host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::sport::Sport;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Stadium {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub google_map_url: Option<String>,
    pub monthly_price: f64,
    pub price_per_session: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StadiumImage {
    pub id: Uuid,
    pub stadium_id: Uuid,
    pub url: String,
    pub position: i32,
}

/// Stadium with its gallery and sports, as returned by the detail endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StadiumDetail {
    #[serde(flatten)]
    pub stadium: Stadium,
    pub images: Vec<StadiumImage>,
    pub sports: Vec<Sport>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStadium {
    #[validate(length(min = 2, max = 120))]
    pub name: String,
    #[validate(length(min = 2, max = 255))]
    pub address: String,
    #[validate(url)]
    pub google_map_url: Option<String>,
    #[validate(range(min = 0.0))]
    pub monthly_price: f64,
    #[validate(range(min = 0.0))]
    pub price_per_session: f64,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub sport_ids: Vec<Uuid>,
}

/// Partial update. `image_urls` and `sport_ids`, when present, replace the existing sets.
#[derive(Debug, Clone, Deserialize, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStadium {
    #[validate(length(min = 2, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 2, max = 255))]
    pub address: Option<String>,
    #[validate(url)]
    pub google_map_url: Option<String>,
    #[validate(range(min = 0.0))]
    pub monthly_price: Option<f64>,
    #[validate(range(min = 0.0))]
    pub price_per_session: Option<f64>,
    pub is_active: Option<bool>,
    pub image_urls: Option<Vec<String>>,
    pub sport_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StadiumFilters {
    pub sport_id: Option<Uuid>,
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_price_rejected() {
        let input = CreateStadium {
            name: "Stade Municipal".to_string(),
            address: "Avenue Hassan II".to_string(),
            google_map_url: None,
            monthly_price: -10.0,
            price_per_session: 200.0,
            image_urls: vec![],
            sport_ids: vec![],
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn detail_flattens_stadium_fields() {
        let detail = StadiumDetail {
            stadium: Stadium {
                id: Uuid::nil(),
                name: "Complexe Sportif".to_string(),
                address: "Rue 12".to_string(),
                google_map_url: None,
                monthly_price: 1500.0,
                price_per_session: 250.0,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
            },
            images: vec![],
            sports: vec![],
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["name"], "Complexe Sportif");
        assert_eq!(json["pricePerSession"], 250.0);
        assert!(json.get("deletedAt").is_none());
        assert!(json["images"].as_array().unwrap().is_empty());
    }
}
