//! Monthly subscription payments: generation, overdue marking and recording.

use chrono::{Datelike, Months, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::billing::{MonthlyPayment, PaymentFilters, PaymentStatus};
use crate::models::pagination::{Page, Pagination};
use crate::models::user::Actor;
use crate::services::notification::{self, templates};

/// Amounts closer than this are treated as equal.
const CENT: f64 = 0.005;

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn days_in_month(month: NaiveDate) -> u32 {
    let first = month_start(month);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Due date for `month`, with `due_day` clamped into the month.
pub fn due_date_for(month: NaiveDate, due_day: u32) -> NaiveDate {
    let first = month_start(month);
    let day = due_day.clamp(1, days_in_month(first));
    first.with_day(day).unwrap_or(first)
}

/// Parse a `YYYY-MM` month into its first day.
pub fn parse_month(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d").ok()
}

/// Status of a payment once `paid` of `amount` has been received.
pub fn payment_status_after(amount: f64, paid: f64) -> PaymentStatus {
    if paid + CENT >= amount {
        PaymentStatus::Paid
    } else if paid > CENT {
        PaymentStatus::PartiallyPaid
    } else {
        PaymentStatus::Pending
    }
}

/// Insert one payment per active subscription covering `month`. Existing rows
/// are left alone, so running twice for the same month is harmless.
pub async fn generate_for_month(
    pool: &PgPool,
    month: NaiveDate,
    default_due_day: u32,
) -> Result<u64, AppError> {
    let first = month_start(month);
    let days = days_in_month(first) as i32;
    let last = first + chrono::Duration::days(i64::from(days - 1));

    let result = sqlx::query(
        r#"
        INSERT INTO monthly_payments (subscription_id, user_id, month, amount, due_date)
        SELECT ms.id, ms.user_id, $1::date, ms.monthly_amount,
               $1::date + (LEAST(COALESCE(c.payment_due_day, $3), $4) - 1)
        FROM monthly_subscriptions ms
        JOIN users u ON u.id = ms.user_id AND u.deleted_at IS NULL
        LEFT JOIN clubs c ON c.user_id = ms.user_id
        WHERE ms.status = 'ACTIVE'
          AND ms.start_date <= $2
          AND (ms.end_date IS NULL OR ms.end_date >= $1::date)
        ON CONFLICT (subscription_id, month) DO NOTHING
        "#,
    )
    .bind(first)
    .bind(last)
    .bind(default_due_day as i32)
    .bind(days)
    .execute(pool)
    .await?;

    tracing::info!(month = %first, created = result.rows_affected(), "Monthly payments generated");
    Ok(result.rows_affected())
}

/// Flag unsettled payments whose due date is before `today`.
pub async fn mark_overdue(pool: &PgPool, today: NaiveDate) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE monthly_payments SET status = 'OVERDUE'
        WHERE status IN ('PENDING', 'PARTIALLY_PAID') AND due_date < $1
        "#,
    )
    .bind(today)
    .execute(pool)
    .await?;

    tracing::info!(%today, updated = result.rows_affected(), "Overdue payments marked");
    Ok(result.rows_affected())
}

/// Add `amount` to a payment and notify the payer.
pub async fn record(
    pool: &PgPool,
    id: Uuid,
    amount: f64,
    actor: Actor,
) -> Result<MonthlyPayment, AppError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::Validation(
            "Payment amount must be positive".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let payment = sqlx::query_as::<_, MonthlyPayment>(
        "SELECT * FROM monthly_payments WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

    if payment.status == PaymentStatus::Paid {
        return Err(AppError::Conflict("Payment is already settled".to_string()));
    }

    let paid = payment.amount_paid + amount;
    if paid > payment.amount + CENT {
        return Err(AppError::Validation(format!(
            "Amount exceeds the outstanding balance of {:.2}",
            payment.amount - payment.amount_paid
        )));
    }

    let status = payment_status_after(payment.amount, paid);
    let paid_at = (status == PaymentStatus::Paid).then(Utc::now);

    let updated = sqlx::query_as::<_, MonthlyPayment>(
        r#"
        UPDATE monthly_payments SET amount_paid = $2, status = $3, paid_at = COALESCE($4, paid_at)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(paid)
    .bind(status)
    .bind(paid_at)
    .fetch_one(&mut *tx)
    .await?;

    let remaining = (updated.amount - updated.amount_paid).max(0.0);
    notification::create(
        &mut tx,
        templates::payment_recorded(amount, remaining).addressed_to(
            updated.user_id,
            Some(actor.id),
            "PAYMENT",
            Some(updated.id),
        ),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(payment_id = %id, amount, status = ?updated.status, "Payment recorded");
    Ok(updated)
}

/// Payments visible to the actor, most recent month first.
pub async fn list(
    pool: &PgPool,
    actor: Actor,
    filters: &PaymentFilters,
    pagination: &Pagination,
) -> Result<Page<MonthlyPayment>, AppError> {
    let mut conditions: Vec<String> = Vec::new();
    let mut param_index = 0u32;

    if !actor.is_admin() {
        param_index += 1;
        conditions.push(format!("user_id = ${param_index}"));
    }
    if filters.status.is_some() {
        param_index += 1;
        conditions.push(format!("status = ${param_index}"));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM monthly_payments {where_clause}");
    let data_sql = format!(
        "SELECT * FROM monthly_payments {where_clause} ORDER BY month DESC, due_date LIMIT {} OFFSET {}",
        pagination.limit(),
        pagination.offset()
    );

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    let mut data_query = sqlx::query_as::<_, MonthlyPayment>(&data_sql);

    if !actor.is_admin() {
        count_query = count_query.bind(actor.id);
        data_query = data_query.bind(actor.id);
    }
    if let Some(status) = filters.status {
        count_query = count_query.bind(status);
        data_query = data_query.bind(status);
    }

    let total = count_query.fetch_one(pool).await?;
    let items = data_query.fetch_all(pool).await?;

    Ok(Page::new(items, total, pagination))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn due_day_clamps_to_short_months() {
        assert_eq!(due_date_for(date(2025, 2, 1), 31), date(2025, 2, 28));
        assert_eq!(due_date_for(date(2024, 2, 1), 30), date(2024, 2, 29));
        assert_eq!(due_date_for(date(2025, 4, 17), 5), date(2025, 4, 5));
        assert_eq!(due_date_for(date(2025, 4, 1), 0), date(2025, 4, 1));
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(date(2025, 1, 20)), 31);
        assert_eq!(days_in_month(date(2025, 6, 1)), 30);
        assert_eq!(days_in_month(date(2025, 12, 1)), 31);
    }

    #[test]
    fn parses_year_month() {
        assert_eq!(parse_month("2025-03"), Some(date(2025, 3, 1)));
        assert_eq!(parse_month("2025-13"), None);
        assert_eq!(parse_month("March"), None);
    }

    #[test]
    fn status_follows_amount_paid() {
        assert_eq!(payment_status_after(500.0, 0.0), PaymentStatus::Pending);
        assert_eq!(payment_status_after(500.0, 200.0), PaymentStatus::PartiallyPaid);
        assert_eq!(payment_status_after(500.0, 500.0), PaymentStatus::Paid);
        assert_eq!(payment_status_after(100.0, 99.999), PaymentStatus::Paid);
    }
}
