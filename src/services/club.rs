use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::club::{Club, ClubSummary, UpdateClub};
use crate::models::pagination::{Page, Pagination};
use crate::models::user::Actor;

const SUMMARY_SELECT: &str = r#"
    SELECT c.id, c.name, c.user_id, u.name AS owner_name, u.email AS owner_email,
           u.is_approved, c.sport_id, c.monthly_fee, c.payment_due_day, c.created_at
    FROM clubs c
    JOIN users u ON u.id = c.user_id
    WHERE u.deleted_at IS NULL
"#;

pub async fn list(pool: &PgPool, pagination: &Pagination) -> Result<Page<ClubSummary>, AppError> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM clubs c JOIN users u ON u.id = c.user_id WHERE u.deleted_at IS NULL",
    )
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as::<_, ClubSummary>(&format!(
        "{SUMMARY_SELECT} ORDER BY c.name LIMIT $1 OFFSET $2"
    ))
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::new(items, total, pagination))
}

/// Fetch a club the actor may see: admins see all, owners their own.
pub async fn find_by_id(pool: &PgPool, id: Uuid, actor: Actor) -> Result<ClubSummary, AppError> {
    sqlx::query_as::<_, ClubSummary>(&format!("{SUMMARY_SELECT} AND c.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .filter(|c| actor.can_access(c.user_id))
        .ok_or_else(|| AppError::NotFound("Club not found".to_string()))
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    input: &UpdateClub,
    actor: Actor,
) -> Result<Club, AppError> {
    let current = find_by_id(pool, id, actor).await?;

    if let Some(sport_id) = input.sport_id {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM sports WHERE id = $1)")
            .bind(sport_id)
            .fetch_one(pool)
            .await?;
        if !exists {
            return Err(AppError::Validation("Unknown sport".to_string()));
        }
    }

    let club = sqlx::query_as::<_, Club>(
        r#"
        UPDATE clubs SET
            name = COALESCE($2, name),
            sport_id = COALESCE($3, sport_id),
            address = COALESCE($4, address),
            monthly_fee = COALESCE($5, monthly_fee),
            payment_due_day = COALESCE($6, payment_due_day),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(current.id)
    .bind(&input.name)
    .bind(input.sport_id)
    .bind(&input.address)
    .bind(input.monthly_fee)
    .bind(input.payment_due_day)
    .fetch_one(pool)
    .await?;

    tracing::info!(club_id = %club.id, actor_id = %actor.id, "Club updated");
    Ok(club)
}
