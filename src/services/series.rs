//! Recurring weekly series: occurrence generation and monthly subscriptions.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::billing::{
    BillingType, CreateSeries, MonthlyPayment, MonthlySubscription, ReservationSeries,
    SeriesCreated,
};
use crate::models::club::Club;
use crate::models::reservation::ReservationStatus;
use crate::models::user::Actor;
use crate::services::payment::{due_date_for, month_start};
use crate::services::reservation::{blocking_between, lock_bookable_stadium, overlaps};

/// Longest span a single series may cover.
pub const MAX_SERIES_WEEKS: u32 = 52;

/// Dates from `from` through `until` (inclusive) falling on `day_of_week` (Sunday = 0).
/// Stops at the end of the calendar.
pub fn weekly_occurrences(from: NaiveDate, until: NaiveDate, day_of_week: u32) -> Vec<NaiveDate> {
    let offset = (7 + day_of_week as i64 - from.weekday().num_days_from_sunday() as i64) % 7;
    let mut dates = Vec::new();
    let mut current = from.checked_add_signed(Duration::days(offset));
    while let Some(date) = current.filter(|d| *d <= until) {
        dates.push(date);
        current = date.checked_add_signed(Duration::weeks(1));
    }
    dates
}

/// Last date covered by `weeks` weeks starting on `start_date`.
pub fn horizon_end(start_date: NaiveDate, weeks: u32) -> Option<NaiveDate> {
    start_date
        .checked_add_signed(Duration::weeks(i64::from(weeks)))
        .and_then(|d| d.pred_opt())
}

fn validate(input: &CreateSeries) -> Result<(), AppError> {
    if !(0..=6).contains(&input.day_of_week) {
        return Err(AppError::Validation(
            "dayOfWeek must be between 0 (Sunday) and 6 (Saturday)".to_string(),
        ));
    }
    if input.end_time <= input.start_time {
        return Err(AppError::Validation(
            "Series slot must end after it starts".to_string(),
        ));
    }
    if matches!(input.end_date, Some(end) if end < input.start_date) {
        return Err(AppError::Validation(
            "endDate must not be before startDate".to_string(),
        ));
    }
    let latest = horizon_end(input.start_date, MAX_SERIES_WEEKS)
        .ok_or_else(|| AppError::Validation("startDate is out of range".to_string()))?;
    if matches!(input.end_date, Some(end) if end > latest) {
        return Err(AppError::Validation(format!(
            "A series may span at most {MAX_SERIES_WEEKS} weeks"
        )));
    }
    Ok(())
}

/// Create a weekly series for the actor and book every upcoming occurrence.
///
/// Any occurrence colliding with a blocking reservation aborts the whole
/// series. `MONTHLY` series also open a subscription and bill the first month.
pub async fn create(
    pool: &PgPool,
    actor: Actor,
    input: &CreateSeries,
    horizon_weeks: u32,
    default_due_day: u32,
) -> Result<SeriesCreated, AppError> {
    validate(input)?;

    let now = Utc::now();
    let until = match input.end_date {
        Some(end) => end,
        None => horizon_end(input.start_date, horizon_weeks.min(MAX_SERIES_WEEKS))
            .ok_or_else(|| AppError::Validation("startDate is out of range".to_string()))?,
    };

    let slots: Vec<(DateTime<Utc>, DateTime<Utc>)> =
        weekly_occurrences(input.start_date, until, input.day_of_week as u32)
            .into_iter()
            .map(|date| {
                (
                    date.and_time(input.start_time).and_utc(),
                    date.and_time(input.end_time).and_utc(),
                )
            })
            .filter(|(start, _)| *start >= now)
            .collect();

    let (Some(first), Some(last)) = (slots.first(), slots.last()) else {
        return Err(AppError::Validation(
            "Series has no upcoming occurrences".to_string(),
        ));
    };
    let (window_start, window_end) = (first.0, last.1);

    let mut tx = pool.begin().await?;

    let stadium = lock_bookable_stadium(&mut tx, input.stadium_id).await?;

    let existing = blocking_between(&mut tx, stadium.id, window_start, window_end).await?;
    if let Some((start, _)) = slots.iter().find(|(s, e)| {
        existing
            .iter()
            .any(|(es, ee)| overlaps(*s, *e, *es, *ee))
    }) {
        return Err(AppError::Conflict(format!(
            "Occurrence on {} is already booked",
            start.date_naive()
        )));
    }

    let series = sqlx::query_as::<_, ReservationSeries>(
        r#"
        INSERT INTO reservation_series
            (user_id, stadium_id, day_of_week, start_time, end_time, billing_type, start_date, end_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(actor.id)
    .bind(stadium.id)
    .bind(input.day_of_week)
    .bind(input.start_time)
    .bind(input.end_time)
    .bind(input.billing_type)
    .bind(input.start_date)
    .bind(input.end_date)
    .fetch_one(&mut *tx)
    .await?;

    // Monthly occurrences are covered by the subscription, not priced per slot.
    let per_slot = match input.billing_type {
        BillingType::Session => stadium.price_per_session,
        BillingType::Monthly => 0.0,
    };
    let starts: Vec<DateTime<Utc>> = slots.iter().map(|(s, _)| *s).collect();
    let ends: Vec<DateTime<Utc>> = slots.iter().map(|(_, e)| *e).collect();

    let inserted = sqlx::query(
        r#"
        INSERT INTO reservations (user_id, stadium_id, series_id, start_time, end_time, amount)
        SELECT $1, $2, $3, t.start_time, t.end_time, $6
        FROM UNNEST($4::timestamptz[], $5::timestamptz[]) AS t(start_time, end_time)
        "#,
    )
    .bind(actor.id)
    .bind(stadium.id)
    .bind(series.id)
    .bind(&starts)
    .bind(&ends)
    .bind(per_slot)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let subscription = match input.billing_type {
        BillingType::Session => None,
        BillingType::Monthly => {
            let club = sqlx::query_as::<_, Club>("SELECT * FROM clubs WHERE user_id = $1")
                .bind(actor.id)
                .fetch_optional(&mut *tx)
                .await?;
            let monthly_amount = club
                .as_ref()
                .and_then(|c| c.monthly_fee)
                .unwrap_or(stadium.monthly_price);
            let due_day = club
                .as_ref()
                .map(|c| c.payment_due_day as u32)
                .unwrap_or(default_due_day);

            let subscription = sqlx::query_as::<_, MonthlySubscription>(
                r#"
                INSERT INTO monthly_subscriptions (series_id, user_id, monthly_amount, start_date, end_date)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(series.id)
            .bind(actor.id)
            .bind(monthly_amount)
            .bind(input.start_date)
            .bind(input.end_date)
            .fetch_one(&mut *tx)
            .await?;

            let month = month_start(input.start_date);
            sqlx::query_as::<_, MonthlyPayment>(
                r#"
                INSERT INTO monthly_payments (subscription_id, user_id, month, amount, due_date)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(subscription.id)
            .bind(actor.id)
            .bind(month)
            .bind(monthly_amount)
            .bind(due_date_for(month, due_day))
            .fetch_one(&mut *tx)
            .await?;

            Some(subscription)
        }
    };

    tx.commit().await?;

    tracing::info!(
        series_id = %series.id,
        stadium_id = %stadium.id,
        billing_type = ?series.billing_type,
        reservations = inserted,
        "Reservation series created"
    );

    Ok(SeriesCreated {
        series,
        reservations_created: inserted as usize,
        subscription,
    })
}

/// Series visible to the actor, newest first.
pub async fn list(pool: &PgPool, actor: Actor) -> Result<Vec<ReservationSeries>, AppError> {
    let rows = if actor.is_admin() {
        sqlx::query_as::<_, ReservationSeries>(
            "SELECT * FROM reservation_series ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, ReservationSeries>(
            "SELECT * FROM reservation_series WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(actor.id)
        .fetch_all(pool)
        .await?
    };
    Ok(rows)
}

/// Deactivate a series, cancel its upcoming reservations and its subscription.
/// Returns the number of reservations cancelled.
pub async fn cancel(pool: &PgPool, id: Uuid, actor: Actor) -> Result<u64, AppError> {
    let mut tx = pool.begin().await?;

    let series = sqlx::query_as::<_, ReservationSeries>(
        "SELECT * FROM reservation_series WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .filter(|s| actor.can_access(s.user_id))
    .ok_or_else(|| AppError::NotFound("Series not found".to_string()))?;

    if !series.is_active {
        return Err(AppError::Conflict("Series is already cancelled".to_string()));
    }

    sqlx::query("UPDATE reservation_series SET is_active = false WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let cancelled = sqlx::query(
        r#"
        UPDATE reservations SET status = $2, updated_at = NOW()
        WHERE series_id = $1 AND start_time > NOW() AND status = ANY($3)
        "#,
    )
    .bind(id)
    .bind(ReservationStatus::Cancelled)
    .bind(&ReservationStatus::BLOCKING[..])
    .execute(&mut *tx)
    .await?
    .rows_affected();

    sqlx::query(
        "UPDATE monthly_subscriptions SET status = 'CANCELLED' WHERE series_id = $1 AND status = 'ACTIVE'",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(series_id = %id, actor_id = %actor.id, cancelled, "Reservation series cancelled");
    Ok(cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn occurrences_start_on_first_matching_weekday() {
        // 2025-09-01 is a Monday; Wednesday = 3.
        let dates = weekly_occurrences(date(2025, 9, 1), date(2025, 9, 30), 3);
        assert_eq!(
            dates,
            vec![date(2025, 9, 3), date(2025, 9, 10), date(2025, 9, 17), date(2025, 9, 24)]
        );
        assert!(dates.iter().all(|d| d.weekday() == Weekday::Wed));
    }

    #[test]
    fn occurrences_include_both_ends() {
        let dates = weekly_occurrences(date(2025, 9, 7), date(2025, 9, 14), 0);
        assert_eq!(dates, vec![date(2025, 9, 7), date(2025, 9, 14)]);
    }

    #[test]
    fn empty_when_range_too_short() {
        assert!(weekly_occurrences(date(2025, 9, 1), date(2025, 9, 2), 5).is_empty());
    }

    #[test]
    fn horizon_covers_exactly_n_weeks() {
        let start = date(2025, 9, 1);
        let end = horizon_end(start, 12).unwrap();
        assert_eq!(weekly_occurrences(start, end, 1).len(), 12);
    }

    #[test]
    fn occurrences_stop_at_end_of_calendar() {
        let from = NaiveDate::MAX - Duration::days(10);
        let dates = weekly_occurrences(from, NaiveDate::MAX, 3);
        assert!(!dates.is_empty() && dates.len() <= 2);
    }

    fn slot(start_date: NaiveDate, end_date: Option<NaiveDate>) -> CreateSeries {
        CreateSeries {
            stadium_id: Uuid::nil(),
            day_of_week: 3,
            start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            billing_type: BillingType::Session,
            start_date,
            end_date,
        }
    }

    #[test]
    fn accepts_a_full_year() {
        let start = date(2026, 11, 1);
        assert!(validate(&slot(start, horizon_end(start, MAX_SERIES_WEEKS))).is_ok());
    }

    #[test]
    fn rejects_span_beyond_one_year() {
        let start = date(2026, 11, 1);
        assert!(matches!(
            validate(&slot(start, Some(date(2027, 11, 1)))),
            Err(AppError::Validation(_))
        ));

        let far: CreateSeries = serde_json::from_value(serde_json::json!({
            "stadiumId": Uuid::nil(),
            "dayOfWeek": 3,
            "startTime": "18:00:00",
            "endTime": "19:00:00",
            "billingType": "SESSION",
            "startDate": "2026-11-01",
            "endDate": "+262000-12-31"
        }))
        .unwrap();
        assert!(matches!(validate(&far), Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_start_at_end_of_calendar() {
        let start = NaiveDate::MAX - Duration::days(3);
        assert!(matches!(
            validate(&slot(start, Some(NaiveDate::MAX))),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn rejects_inverted_slot() {
        let input = CreateSeries {
            stadium_id: Uuid::nil(),
            day_of_week: 2,
            start_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            billing_type: BillingType::Session,
            start_date: date(2025, 9, 1),
            end_date: None,
        };
        assert!(matches!(validate(&input), Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_out_of_range_weekday() {
        let input = CreateSeries {
            stadium_id: Uuid::nil(),
            day_of_week: 7,
            start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            billing_type: BillingType::Monthly,
            start_date: date(2025, 9, 1),
            end_date: Some(date(2025, 12, 31)),
        };
        assert!(validate(&input).is_err());
    }
}
