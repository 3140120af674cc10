//! Single-slot reservations: booking with overlap checks and the status graph.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::pagination::{Page, Pagination};
use crate::models::reservation::{
    CreateReservation, Reservation, ReservationFilters, ReservationStatus, ReservationSummary,
};
use crate::models::stadium::Stadium;
use crate::models::user::{Actor, UserRole};
use crate::services::notification::{self, templates};

/// Reservation columns joined with booker and stadium names.
pub(crate) const SUMMARY_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.name AS user_name, r.stadium_id, s.name AS stadium_name,
           r.series_id, r.start_time, r.end_time, r.status, r.is_paid, r.amount, r.created_at
    FROM reservations r
    JOIN users u ON u.id = r.user_id
    JOIN stadiums s ON s.id = r.stadium_id
"#;

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)`.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Edges of the reservation status graph.
pub fn is_valid_transition(from: ReservationStatus, to: ReservationStatus) -> bool {
    use ReservationStatus::*;
    matches!(
        (from, to),
        (Pending, Approved)
            | (Pending, Declined)
            | (Pending, Cancelled)
            | (Approved, Paid)
            | (Approved, Unpaid)
            | (Approved, Cancelled)
            | (Unpaid, Paid)
            | (Unpaid, Cancelled)
    )
}

/// Graph edge plus role check: club owners may only cancel.
pub fn validate_transition(
    from: ReservationStatus,
    to: ReservationStatus,
    actor_role: UserRole,
) -> Result<(), AppError> {
    if !is_valid_transition(from, to) {
        return Err(AppError::InvalidTransition(format!(
            "Cannot transition reservation from {from:?} to {to:?}"
        )));
    }
    if actor_role == UserRole::Club && to != ReservationStatus::Cancelled {
        return Err(AppError::Forbidden(
            "Clubs can only cancel their reservations".to_string(),
        ));
    }
    Ok(())
}

/// Lock and return a bookable stadium inside the caller's transaction.
pub(crate) async fn lock_bookable_stadium(
    conn: &mut PgConnection,
    stadium_id: Uuid,
) -> Result<Stadium, AppError> {
    let stadium = sqlx::query_as::<_, Stadium>(
        "SELECT * FROM stadiums WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
    )
    .bind(stadium_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Stadium not found".to_string()))?;

    if !stadium.is_active {
        return Err(AppError::Validation(
            "Stadium is not open for reservations".to_string(),
        ));
    }
    Ok(stadium)
}

/// Slot-blocking reservations at `stadium_id` intersecting `[start, end)`.
pub(crate) async fn blocking_between(
    conn: &mut PgConnection,
    stadium_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, AppError> {
    let rows = sqlx::query_as::<_, (DateTime<Utc>, DateTime<Utc>)>(
        r#"
        SELECT start_time, end_time FROM reservations
        WHERE stadium_id = $1 AND status = ANY($2)
          AND start_time < $4 AND end_time > $3
        ORDER BY start_time
        "#,
    )
    .bind(stadium_id)
    .bind(&ReservationStatus::BLOCKING[..])
    .bind(start)
    .bind(end)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Book a single slot for the actor at the stadium's per-session price.
pub async fn create(
    pool: &PgPool,
    actor: Actor,
    input: &CreateReservation,
) -> Result<Reservation, AppError> {
    if input.end_time <= input.start_time {
        return Err(AppError::Validation(
            "Reservation must end after it starts".to_string(),
        ));
    }
    if input.start_time < Utc::now() {
        return Err(AppError::Validation(
            "Reservation cannot start in the past".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let stadium = lock_bookable_stadium(&mut tx, input.stadium_id).await?;

    if !blocking_between(&mut tx, stadium.id, input.start_time, input.end_time)
        .await?
        .is_empty()
    {
        return Err(AppError::Conflict(
            "The requested slot is already booked".to_string(),
        ));
    }

    let reservation = sqlx::query_as::<_, Reservation>(
        r#"
        INSERT INTO reservations (user_id, stadium_id, start_time, end_time, amount)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(actor.id)
    .bind(stadium.id)
    .bind(input.start_time)
    .bind(input.end_time)
    .bind(stadium.price_per_session)
    .fetch_one(&mut *tx)
    .await?;

    notification::notify_admins(
        &mut tx,
        Some(actor.id),
        "RESERVATION",
        Some(reservation.id),
        templates::reservation_created(&stadium.name),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(reservation_id = %reservation.id, stadium_id = %stadium.id, "Reservation created");
    Ok(reservation)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Reservation, AppError> {
    sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))
}

/// Reservations visible to the actor: all for admins, own for clubs.
pub async fn list(
    pool: &PgPool,
    actor: Actor,
    filters: &ReservationFilters,
    pagination: &Pagination,
) -> Result<Page<ReservationSummary>, AppError> {
    let mut conditions: Vec<String> = vec!["u.deleted_at IS NULL".to_string()];
    let mut param_index = 0u32;

    if !actor.is_admin() {
        param_index += 1;
        conditions.push(format!("r.user_id = ${param_index}"));
    }
    if filters.status.is_some() {
        param_index += 1;
        conditions.push(format!("r.status = ${param_index}"));
    }
    if filters.stadium_id.is_some() {
        param_index += 1;
        conditions.push(format!("r.stadium_id = ${param_index}"));
    }

    let where_clause = format!("WHERE {}", conditions.join(" AND "));
    let count_sql = format!(
        "SELECT COUNT(*) FROM reservations r JOIN users u ON u.id = r.user_id {where_clause}"
    );
    let data_sql = format!(
        "{SUMMARY_SELECT} {where_clause} ORDER BY r.start_time DESC LIMIT {} OFFSET {}",
        pagination.limit(),
        pagination.offset()
    );

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    let mut data_query = sqlx::query_as::<_, ReservationSummary>(&data_sql);

    macro_rules! bind_both {
        ($val:expr) => {
            count_query = count_query.bind($val);
            data_query = data_query.bind($val);
        };
    }

    if !actor.is_admin() {
        bind_both!(actor.id);
    }
    if let Some(status) = filters.status {
        bind_both!(status);
    }
    if let Some(stadium_id) = filters.stadium_id {
        bind_both!(stadium_id);
    }

    let total = count_query.fetch_one(pool).await?;
    let items = data_query.fetch_all(pool).await?;

    Ok(Page::new(items, total, pagination))
}

/// Move a reservation along the status graph and notify the other party.
pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    to: ReservationStatus,
    actor: Actor,
) -> Result<Reservation, AppError> {
    let current = find_by_id(pool, id).await?;
    if !actor.can_access(current.user_id) {
        return Err(AppError::NotFound("Reservation not found".to_string()));
    }
    validate_transition(current.status, to, actor.role)?;

    let mut tx = pool.begin().await?;

    let updated = sqlx::query_as::<_, Reservation>(
        r#"
        UPDATE reservations SET
            status = $2,
            is_paid = is_paid OR $2 = 'PAID'::reservation_status,
            paid_at = CASE WHEN $2 = 'PAID'::reservation_status THEN NOW() ELSE paid_at END,
            updated_at = NOW()
        WHERE id = $1 AND status = $3
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(to)
    .bind(current.status)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::Conflict("Reservation was modified concurrently".to_string()))?;

    let template = templates::reservation_status_changed(to);
    if actor.id == updated.user_id {
        notification::notify_admins(&mut tx, Some(actor.id), "RESERVATION", Some(id), template)
            .await?;
    } else {
        notification::create(
            &mut tx,
            template.addressed_to(updated.user_id, Some(actor.id), "RESERVATION", Some(id)),
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        reservation_id = %id,
        from = ?current.status,
        to = ?to,
        actor_id = %actor.id,
        "Reservation status changed"
    );
    Ok(updated)
}
