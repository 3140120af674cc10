//! Recurring weekly series, monthly subscriptions and their payments.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "billing_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingType {
    Session,
    Monthly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "subscription_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
    PartiallyPaid,
}

/// A recurring weekly booking template. `day_of_week` counts from Sunday = 0.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReservationSeries {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stadium_id: Uuid,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub billing_type: BillingType,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSeries {
    pub stadium_id: Uuid,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub billing_type: BillingType,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySubscription {
    pub id: Uuid,
    pub series_id: Uuid,
    pub user_id: Uuid,
    pub monthly_amount: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPayment {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub user_id: Uuid,
    pub month: NaiveDate,
    pub amount: f64,
    pub amount_paid: f64,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of creating a series.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesCreated {
    pub series: ReservationSeries,
    pub reservations_created: usize,
    pub subscription: Option<MonthlySubscription>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayment {
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFilters {
    pub status: Option<PaymentStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::PartiallyPaid).unwrap(),
            "\"PARTIALLY_PAID\""
        );
        let billing: BillingType = serde_json::from_str("\"MONTHLY\"").unwrap();
        assert_eq!(billing, BillingType::Monthly);
    }

    #[test]
    fn create_series_accepts_time_strings() {
        let input: CreateSeries = serde_json::from_value(serde_json::json!({
            "stadiumId": Uuid::nil(),
            "dayOfWeek": 3,
            "startTime": "18:00:00",
            "endTime": "19:30:00",
            "billingType": "SESSION",
            "startDate": "2025-09-01",
            "endDate": null
        }))
        .unwrap();
        assert_eq!(input.day_of_week, 3);
        assert_eq!(input.start_time, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert!(input.end_date.is_none());
    }
}
