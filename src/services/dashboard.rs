//! Dashboard statistics: two concurrent query waves merged into one payload.
//!
//! The headline aggregates must all succeed or the request fails. The
//! derived metrics degrade one by one: a failing query is logged and its
//! slot falls back to an empty list or zero.

use std::future::Future;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::reservation::{ReservationStatus, ReservationSummary};
use crate::models::user::{User, UserResponse, UserRole};
use crate::services::date_range::{self, DateRange, DateRangeQuery};
use crate::services::reservation::SUMMARY_SELECT;

/// Number of rows in the recent and top-N lists.
const LIST_LIMIT: i64 = 5;

/// Every paid amount with the instant it was received, from single
/// reservations and monthly payments, excluding soft-deleted payers.
const REVENUE_EVENTS: &str = r#"
    SELECT r.amount AS amount, r.paid_at AS paid_at
    FROM reservations r
    JOIN users u ON u.id = r.user_id
    WHERE r.is_paid AND r.paid_at IS NOT NULL AND u.deleted_at IS NULL
    UNION ALL
    SELECT p.amount_paid AS amount, p.paid_at AS paid_at
    FROM monthly_payments p
    JOIN users u ON u.id = p.user_id
    WHERE p.paid_at IS NOT NULL AND p.amount_paid > 0 AND u.deleted_at IS NULL
"#;

/// Headline counters.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_clubs: i64,
    pub total_reservations: i64,
    pub pending_reservations: i64,
    pub total_revenue: f64,
    pub revenue_last_30_days: f64,
    pub active_stadiums: i64,
    pub active_users: i64,
}

/// Revenue and bookings for one `YYYY-MM` bucket inside the window.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RevenuePoint {
    pub month: String,
    pub revenue: f64,
    pub bookings: i64,
}

/// Revenue and bookings for month 1..=12 of the selected year.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MonthRevenue {
    pub month: i32,
    pub revenue: f64,
    pub bookings: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SportCount {
    pub sport_id: Uuid,
    pub name_fr: String,
    pub name_ar: String,
    pub name_en: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCounts {
    pub total: i64,
    pub paid: i64,
    pub pending: i64,
    pub overdue: i64,
    pub partially_paid: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StatusCount {
    pub status: ReservationStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RoleCount {
    pub role: UserRole,
    pub count: i64,
}

/// A stadium or club ranked by reservation count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub id: Uuid,
    pub name: String,
    pub reservation_count: i64,
}

#[derive(Debug, FromRow)]
struct RankRow {
    id: Uuid,
    reservation_count: i64,
}

/// Filters echoed back to the client together with the resolved window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilters {
    pub time_range: Option<String>,
    pub year: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Full `/api/dashboard/stats` payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub stats: DashboardStats,
    pub recent_reservations: Vec<ReservationSummary>,
    pub recent_users: Vec<UserResponse>,
    pub revenue_data: Vec<RevenuePoint>,
    pub sport_distribution: Vec<SportCount>,
    pub payment_counts: PaymentCounts,
    pub reservations_by_status: Vec<StatusCount>,
    pub users_by_role: Vec<RoleCount>,
    pub revenue_by_month: Vec<MonthRevenue>,
    pub top_stadiums: Vec<RankedEntry>,
    pub top_clubs: Vec<RankedEntry>,
    pub available_years: Vec<i32>,
    pub filters: AppliedFilters,
}

/// Build the dashboard for the window described by `query`.
pub async fn get_stats(pool: &PgPool, query: &DateRangeQuery) -> Result<DashboardResponse, AppError> {
    get_stats_at(pool, query, Utc::now()).await
}

pub async fn get_stats_at(
    pool: &PgPool,
    query: &DateRangeQuery,
    now: DateTime<Utc>,
) -> Result<DashboardResponse, AppError> {
    let range = date_range::resolve(query, now);
    let year = date_range::selected_year(query, now);
    tracing::debug!(
        start = ?range.start,
        end = ?range.end,
        valid = range.is_valid(),
        year,
        "Resolved dashboard window"
    );

    let stats = fetch_stats(pool, &range).await?;

    let (
        recent_reservations,
        recent_users,
        revenue_data,
        sport_distribution,
        payment_counts,
        reservations_by_status,
        users_by_role,
        revenue_by_month,
        top_stadiums,
        top_clubs,
        available_years,
    ) = tokio::join!(
        degrade("recent_reservations", fetch_recent_reservations(pool, &range)),
        degrade("recent_users", fetch_recent_users(pool, &range)),
        degrade("revenue_data", fetch_revenue_data(pool, &range)),
        degrade("sport_distribution", fetch_sport_distribution(pool, &range)),
        degrade("payment_counts", fetch_payment_counts(pool, &range)),
        degrade("reservations_by_status", fetch_reservations_by_status(pool, &range)),
        degrade("users_by_role", fetch_users_by_role(pool, &range)),
        degrade("revenue_by_month", fetch_revenue_by_month(pool, year)),
        degrade("top_stadiums", fetch_top_stadiums(pool, &range)),
        degrade("top_clubs", fetch_top_clubs(pool, &range)),
        degrade("available_years", fetch_available_years(pool)),
    );

    Ok(DashboardResponse {
        stats,
        recent_reservations,
        recent_users,
        revenue_data,
        sport_distribution,
        payment_counts,
        reservations_by_status,
        users_by_role,
        revenue_by_month,
        top_stadiums,
        top_clubs,
        available_years: with_year(available_years, now.year()),
        filters: AppliedFilters {
            time_range: query.time_range.clone(),
            year: query.year.clone(),
            start_date: range.start,
            end_date: range.end,
        },
    })
}

/// Await a derived metric, substituting the type's default on failure.
pub async fn degrade<T, F>(metric: &'static str, fut: F) -> T
where
    T: Default,
    F: Future<Output = Result<T, AppError>>,
{
    match fut.await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(metric, error = %e, "Dashboard metric failed, using default");
            T::default()
        }
    }
}

/// Insert `year` into a descending list of years if missing.
fn with_year(mut years: Vec<i32>, year: i32) -> Vec<i32> {
    if !years.contains(&year) {
        years.push(year);
    }
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

/// First wave: all headline counters, concurrently. Any failure aborts.
async fn fetch_stats(pool: &PgPool, range: &DateRange) -> Result<DashboardStats, AppError> {
    let (
        total_users,
        total_clubs,
        total_reservations,
        pending_reservations,
        total_revenue,
        revenue_last_30_days,
        active_stadiums,
        active_users,
    ) = tokio::try_join!(
        count_in_window(
            pool,
            range,
            "SELECT COUNT(*) FROM users WHERE deleted_at IS NULL AND created_at BETWEEN $1 AND $2",
        ),
        count_in_window(
            pool,
            range,
            r#"
            SELECT COUNT(*) FROM clubs c
            JOIN users u ON u.id = c.user_id
            WHERE u.deleted_at IS NULL AND c.created_at BETWEEN $1 AND $2
            "#,
        ),
        count_in_window(
            pool,
            range,
            r#"
            SELECT COUNT(*) FROM reservations r
            JOIN users u ON u.id = r.user_id
            WHERE u.deleted_at IS NULL AND r.created_at BETWEEN $1 AND $2
            "#,
        ),
        count_in_window(
            pool,
            range,
            r#"
            SELECT COUNT(*) FROM reservations r
            JOIN users u ON u.id = r.user_id
            WHERE u.deleted_at IS NULL AND r.status = 'PENDING'
              AND r.created_at BETWEEN $1 AND $2
            "#,
        ),
        fetch_total_revenue(pool, range),
        fetch_revenue_last_30_days(pool),
        fetch_active_stadiums(pool),
        count_in_window(
            pool,
            range,
            r#"
            SELECT COUNT(DISTINCT r.user_id) FROM reservations r
            JOIN users u ON u.id = r.user_id
            WHERE u.deleted_at IS NULL AND r.created_at BETWEEN $1 AND $2
            "#,
        ),
    )?;

    Ok(DashboardStats {
        total_users,
        total_clubs,
        total_reservations,
        pending_reservations,
        total_revenue,
        revenue_last_30_days,
        active_stadiums,
        active_users,
    })
}

/// Run a `COUNT` query whose `$1`/`$2` are the window bounds.
async fn count_in_window(pool: &PgPool, range: &DateRange, sql: &str) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>(sql)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

async fn fetch_total_revenue(pool: &PgPool, range: &DateRange) -> Result<f64, AppError> {
    let sql = format!(
        "WITH revenue AS ({REVENUE_EVENTS}) \
         SELECT COALESCE(SUM(amount), 0)::float8 FROM revenue WHERE paid_at BETWEEN $1 AND $2"
    );
    let total = sqlx::query_scalar::<_, f64>(&sql)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(pool)
        .await?;
    Ok(total)
}

async fn fetch_revenue_last_30_days(pool: &PgPool) -> Result<f64, AppError> {
    let sql = format!(
        "WITH revenue AS ({REVENUE_EVENTS}) \
         SELECT COALESCE(SUM(amount), 0)::float8 FROM revenue \
         WHERE paid_at >= NOW() - INTERVAL '30 days'"
    );
    let total = sqlx::query_scalar::<_, f64>(&sql).fetch_one(pool).await?;
    Ok(total)
}

async fn fetch_active_stadiums(pool: &PgPool) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM stadiums WHERE is_active AND deleted_at IS NULL",
    )
    .fetch_one(pool)
    .await?;
    Ok(count)
}

async fn fetch_recent_reservations(
    pool: &PgPool,
    range: &DateRange,
) -> Result<Vec<ReservationSummary>, AppError> {
    let sql = format!(
        "{SUMMARY_SELECT} WHERE u.deleted_at IS NULL AND r.created_at BETWEEN $1 AND $2 \
         ORDER BY r.created_at DESC LIMIT {LIST_LIMIT}"
    );
    let rows = sqlx::query_as::<_, ReservationSummary>(&sql)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

async fn fetch_recent_users(pool: &PgPool, range: &DateRange) -> Result<Vec<UserResponse>, AppError> {
    let rows = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE deleted_at IS NULL AND created_at BETWEEN $1 AND $2
        ORDER BY created_at DESC
        LIMIT $3
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .bind(LIST_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(UserResponse::from).collect())
}

async fn fetch_revenue_data(pool: &PgPool, range: &DateRange) -> Result<Vec<RevenuePoint>, AppError> {
    let sql = format!(
        r#"
        WITH revenue AS ({REVENUE_EVENTS}),
        rev AS (
            SELECT to_char(date_trunc('month', paid_at), 'YYYY-MM') AS month, SUM(amount) AS revenue
            FROM revenue
            WHERE paid_at BETWEEN $1 AND $2
            GROUP BY 1
        ),
        book AS (
            SELECT to_char(date_trunc('month', r.created_at), 'YYYY-MM') AS month, COUNT(*) AS bookings
            FROM reservations r
            JOIN users u ON u.id = r.user_id
            WHERE u.deleted_at IS NULL AND r.created_at BETWEEN $1 AND $2
            GROUP BY 1
        )
        SELECT COALESCE(rev.month, book.month) AS month,
               COALESCE(rev.revenue, 0)::float8 AS revenue,
               COALESCE(book.bookings, 0)::int8 AS bookings
        FROM rev
        FULL OUTER JOIN book ON book.month = rev.month
        ORDER BY 1
        "#
    );
    let rows = sqlx::query_as::<_, RevenuePoint>(&sql)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Reservations per sport, attributed through the booking club's sport.
async fn fetch_sport_distribution(pool: &PgPool, range: &DateRange) -> Result<Vec<SportCount>, AppError> {
    let rows = sqlx::query_as::<_, SportCount>(
        r#"
        SELECT s.id AS sport_id, s.name_fr, s.name_ar, s.name_en, COUNT(r.id) AS count
        FROM reservations r
        JOIN users u ON u.id = r.user_id
        JOIN clubs c ON c.user_id = r.user_id
        JOIN sports s ON s.id = c.sport_id
        WHERE u.deleted_at IS NULL AND r.created_at BETWEEN $1 AND $2
        GROUP BY s.id, s.name_fr, s.name_ar, s.name_en
        ORDER BY count DESC
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn fetch_payment_counts(pool: &PgPool, range: &DateRange) -> Result<PaymentCounts, AppError> {
    let row = sqlx::query_as::<_, PaymentCounts>(
        r#"
        SELECT
            COUNT(*) AS total,
            COALESCE(SUM(CASE WHEN p.status = 'PAID'           THEN 1 ELSE 0 END), 0)::int8 AS paid,
            COALESCE(SUM(CASE WHEN p.status = 'PENDING'        THEN 1 ELSE 0 END), 0)::int8 AS pending,
            COALESCE(SUM(CASE WHEN p.status = 'OVERDUE'        THEN 1 ELSE 0 END), 0)::int8 AS overdue,
            COALESCE(SUM(CASE WHEN p.status = 'PARTIALLY_PAID' THEN 1 ELSE 0 END), 0)::int8 AS partially_paid
        FROM monthly_payments p
        JOIN users u ON u.id = p.user_id
        WHERE u.deleted_at IS NULL AND p.created_at BETWEEN $1 AND $2
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

async fn fetch_reservations_by_status(
    pool: &PgPool,
    range: &DateRange,
) -> Result<Vec<StatusCount>, AppError> {
    let rows = sqlx::query_as::<_, StatusCount>(
        r#"
        SELECT r.status, COUNT(*) AS count
        FROM reservations r
        JOIN users u ON u.id = r.user_id
        WHERE u.deleted_at IS NULL AND r.created_at BETWEEN $1 AND $2
        GROUP BY r.status
        ORDER BY count DESC
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn fetch_users_by_role(pool: &PgPool, range: &DateRange) -> Result<Vec<RoleCount>, AppError> {
    let rows = sqlx::query_as::<_, RoleCount>(
        r#"
        SELECT role, COUNT(*) AS count
        FROM users
        WHERE deleted_at IS NULL AND created_at BETWEEN $1 AND $2
        GROUP BY role
        ORDER BY role
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn fetch_revenue_by_month(pool: &PgPool, year: i32) -> Result<Vec<MonthRevenue>, AppError> {
    let sql = format!(
        r#"
        WITH revenue AS ({REVENUE_EVENTS})
        SELECT m.month::int4 AS month,
            COALESCE((
                SELECT SUM(amount) FROM revenue
                WHERE EXTRACT(YEAR FROM paid_at) = $1 AND EXTRACT(MONTH FROM paid_at) = m.month
            ), 0)::float8 AS revenue,
            (
                SELECT COUNT(*) FROM reservations r
                JOIN users u ON u.id = r.user_id
                WHERE u.deleted_at IS NULL
                  AND EXTRACT(YEAR FROM r.created_at) = $1
                  AND EXTRACT(MONTH FROM r.created_at) = m.month
            )::int8 AS bookings
        FROM generate_series(1, 12) AS m(month)
        ORDER BY m.month
        "#
    );
    let rows = sqlx::query_as::<_, MonthRevenue>(&sql)
        .bind(year)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Top stadiums by reservations in the window; names looked up per row.
async fn fetch_top_stadiums(pool: &PgPool, range: &DateRange) -> Result<Vec<RankedEntry>, AppError> {
    let ranks = sqlx::query_as::<_, RankRow>(
        r#"
        SELECT r.stadium_id AS id, COUNT(*) AS reservation_count
        FROM reservations r
        JOIN users u ON u.id = r.user_id
        WHERE u.deleted_at IS NULL AND r.created_at BETWEEN $1 AND $2
        GROUP BY r.stadium_id
        ORDER BY reservation_count DESC
        LIMIT $3
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .bind(LIST_LIMIT)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(ranks.len());
    for rank in ranks {
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM stadiums WHERE id = $1")
            .bind(rank.id)
            .fetch_optional(pool)
            .await?
            .unwrap_or_else(|| "Unknown".to_string());
        entries.push(RankedEntry {
            id: rank.id,
            name,
            reservation_count: rank.reservation_count,
        });
    }
    Ok(entries)
}

/// Top club accounts by reservations in the window; club names looked up per row.
async fn fetch_top_clubs(pool: &PgPool, range: &DateRange) -> Result<Vec<RankedEntry>, AppError> {
    let ranks = sqlx::query_as::<_, RankRow>(
        r#"
        SELECT r.user_id AS id, COUNT(*) AS reservation_count
        FROM reservations r
        JOIN users u ON u.id = r.user_id
        WHERE u.deleted_at IS NULL AND u.role = 'CLUB' AND r.created_at BETWEEN $1 AND $2
        GROUP BY r.user_id
        ORDER BY reservation_count DESC
        LIMIT $3
        "#,
    )
    .bind(range.start)
    .bind(range.end)
    .bind(LIST_LIMIT)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(ranks.len());
    for rank in ranks {
        let name = sqlx::query_scalar::<_, String>(
            "SELECT COALESCE(c.name, u.name) FROM users u LEFT JOIN clubs c ON c.user_id = u.id WHERE u.id = $1",
        )
        .bind(rank.id)
        .fetch_optional(pool)
        .await?
        .unwrap_or_else(|| "Unknown".to_string());
        entries.push(RankedEntry {
            id: rank.id,
            name,
            reservation_count: rank.reservation_count,
        });
    }
    Ok(entries)
}

async fn fetch_available_years(pool: &PgPool) -> Result<Vec<i32>, AppError> {
    let years = sqlx::query_scalar::<_, i32>(
        "SELECT DISTINCT EXTRACT(YEAR FROM created_at)::int4 AS year FROM reservations ORDER BY year DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(years)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn failing<T>() -> Result<T, AppError> {
        Err(AppError::Database(sqlx::Error::PoolTimedOut))
    }

    #[tokio::test]
    async fn degrade_passes_through_success() {
        let value = degrade("top_stadiums", async { Ok::<_, AppError>(vec![1, 2, 3]) }).await;
        assert_eq!(value, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn degrade_substitutes_defaults_on_failure() {
        let list: Vec<RankedEntry> = degrade("top_clubs", failing()).await;
        assert!(list.is_empty());

        let counts: PaymentCounts = degrade("payment_counts", failing()).await;
        assert_eq!(counts, PaymentCounts::default());

        let total: f64 = degrade("revenue", failing()).await;
        assert_eq!(total, 0.0);
    }

    #[test]
    fn with_year_inserts_and_sorts_descending() {
        assert_eq!(with_year(vec![2023, 2021], 2025), vec![2025, 2023, 2021]);
        assert_eq!(with_year(vec![2025, 2024], 2025), vec![2025, 2024]);
        assert_eq!(with_year(vec![], 2025), vec![2025]);
    }

    #[test]
    fn response_uses_camel_case_keys() {
        let response = DashboardResponse {
            stats: DashboardStats {
                total_users: 3,
                total_clubs: 2,
                total_reservations: 10,
                pending_reservations: 4,
                total_revenue: 1200.0,
                revenue_last_30_days: 300.0,
                active_stadiums: 5,
                active_users: 2,
            },
            recent_reservations: vec![],
            recent_users: vec![],
            revenue_data: vec![],
            sport_distribution: vec![],
            payment_counts: PaymentCounts::default(),
            reservations_by_status: vec![StatusCount {
                status: ReservationStatus::Pending,
                count: 4,
            }],
            users_by_role: vec![RoleCount {
                role: UserRole::Club,
                count: 2,
            }],
            revenue_by_month: vec![],
            top_stadiums: vec![],
            top_clubs: vec![],
            available_years: vec![2025],
            filters: AppliedFilters {
                time_range: Some("month".to_string()),
                year: None,
                start_date: None,
                end_date: None,
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        for key in [
            "stats",
            "recentReservations",
            "recentUsers",
            "revenueData",
            "sportDistribution",
            "reservationsByStatus",
            "usersByRole",
            "revenueByMonth",
            "topStadiums",
            "topClubs",
            "availableYears",
            "filters",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["stats"]["pendingReservations"], 4);
        assert_eq!(json["reservationsByStatus"][0]["status"], "PENDING");
        assert_eq!(json["usersByRole"][0]["role"], "CLUB");
        assert_eq!(json["filters"]["timeRange"], "month");
    }
}
