//! Admin-side account management: listing, approval and deletion.

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::pagination::{Page, Pagination};
use crate::models::user::{Actor, User, UserFilters, UserResponse};
use crate::services::notification::{self, templates, Template};

pub async fn list(
    pool: &PgPool,
    filters: &UserFilters,
    pagination: &Pagination,
) -> Result<Page<UserResponse>, AppError> {
    let mut conditions: Vec<String> = vec!["deleted_at IS NULL".to_string()];
    let mut param_index = 0u32;

    if filters.role.is_some() {
        param_index += 1;
        conditions.push(format!("role = ${param_index}"));
    }
    if filters.approved.is_some() {
        param_index += 1;
        conditions.push(format!("is_approved = ${param_index}"));
    }
    let search = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));
    if search.is_some() {
        param_index += 1;
        conditions.push(format!("(name ILIKE ${param_index} OR email ILIKE ${param_index})"));
    }

    let where_clause = format!("WHERE {}", conditions.join(" AND "));
    let count_sql = format!("SELECT COUNT(*) FROM users {where_clause}");
    let data_sql = format!(
        "SELECT * FROM users {where_clause} ORDER BY created_at DESC LIMIT {} OFFSET {}",
        pagination.limit(),
        pagination.offset()
    );

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    let mut data_query = sqlx::query_as::<_, User>(&data_sql);

    if let Some(role) = filters.role {
        count_query = count_query.bind(role);
        data_query = data_query.bind(role);
    }
    if let Some(approved) = filters.approved {
        count_query = count_query.bind(approved);
        data_query = data_query.bind(approved);
    }
    if let Some(ref pattern) = search {
        count_query = count_query.bind(pattern);
        data_query = data_query.bind(pattern);
    }

    let total = count_query.fetch_one(pool).await?;
    let users = data_query.fetch_all(pool).await?;

    Ok(Page::new(
        users.into_iter().map(UserResponse::from).collect(),
        total,
        pagination,
    ))
}

async fn set_approval(
    pool: &PgPool,
    id: Uuid,
    approved: bool,
    actor: Actor,
    template: Template,
) -> Result<UserResponse, AppError> {
    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET is_approved = $2, updated_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(approved)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    notification::create(
        &mut tx,
        template.addressed_to(user.id, Some(actor.id), "USER", Some(user.id)),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(user_id = %id, approved, actor_id = %actor.id, "User approval changed");
    Ok(UserResponse::from(user))
}

pub async fn approve(pool: &PgPool, id: Uuid, actor: Actor) -> Result<UserResponse, AppError> {
    set_approval(pool, id, true, actor, templates::account_approved()).await
}

pub async fn decline(pool: &PgPool, id: Uuid, actor: Actor) -> Result<UserResponse, AppError> {
    set_approval(pool, id, false, actor, templates::account_declined()).await
}

/// Stamp `deleted_at`, cancelling upcoming reservations, series and subscriptions.
pub async fn soft_delete(pool: &PgPool, id: Uuid, actor: Actor) -> Result<(), AppError> {
    if id == actor.id {
        return Err(AppError::Validation("You cannot delete your own account".to_string()));
    }

    let mut tx = pool.begin().await?;

    let affected = sqlx::query(
        "UPDATE users SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if affected == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let cancelled = sqlx::query(
        r#"
        UPDATE reservations SET status = 'CANCELLED', updated_at = NOW()
        WHERE user_id = $1 AND start_time > NOW()
          AND status IN ('PENDING', 'APPROVED', 'UNPAID')
        "#,
    )
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    sqlx::query("UPDATE reservation_series SET is_active = false WHERE user_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "UPDATE monthly_subscriptions SET status = 'CANCELLED' WHERE user_id = $1 AND status = 'ACTIVE'",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(user_id = %id, cancelled, actor_id = %actor.id, "User soft-deleted");
    Ok(())
}

/// Remove the user and everything hanging off it. Order matters: children first.
pub async fn hard_delete(pool: &PgPool, id: Uuid, actor: Actor) -> Result<(), AppError> {
    if id == actor.id {
        return Err(AppError::Validation("You cannot delete your own account".to_string()));
    }

    let mut tx = pool.begin().await?;

    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if !exists {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    const CASCADE: [&str; 7] = [
        "DELETE FROM notifications WHERE user_id = $1 OR actor_id = $1",
        "DELETE FROM monthly_payments WHERE user_id = $1",
        "DELETE FROM monthly_subscriptions WHERE user_id = $1",
        "DELETE FROM reservations WHERE user_id = $1",
        "DELETE FROM reservation_series WHERE user_id = $1",
        "DELETE FROM clubs WHERE user_id = $1",
        "DELETE FROM users WHERE id = $1",
    ];
    for statement in CASCADE {
        sqlx::query(statement).bind(id).execute(&mut *tx).await?;
    }

    tx.commit().await?;

    tracing::warn!(user_id = %id, actor_id = %actor.id, "User permanently deleted");
    Ok(())
}
