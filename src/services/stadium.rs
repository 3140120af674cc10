//! Stadium catalogue with image galleries and hosted sports.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::sport::Sport;
use crate::models::stadium::{
    CreateStadium, Stadium, StadiumDetail, StadiumFilters, StadiumImage, UpdateStadium,
};

/// Active stadiums, optionally restricted to one sport or a name/address search.
pub async fn list(pool: &PgPool, filters: &StadiumFilters) -> Result<Vec<Stadium>, AppError> {
    let search = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));

    let stadiums = sqlx::query_as::<_, Stadium>(
        r#"
        SELECT s.* FROM stadiums s
        WHERE s.deleted_at IS NULL AND s.is_active = true
          AND ($1::uuid IS NULL OR EXISTS (
                SELECT 1 FROM stadium_sports ss WHERE ss.stadium_id = s.id AND ss.sport_id = $1))
          AND ($2::text IS NULL OR s.name ILIKE $2 OR s.address ILIKE $2)
        ORDER BY s.name
        "#,
    )
    .bind(filters.sport_id)
    .bind(search)
    .fetch_all(pool)
    .await?;
    Ok(stadiums)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<StadiumDetail, AppError> {
    let stadium = sqlx::query_as::<_, Stadium>(
        "SELECT * FROM stadiums WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Stadium not found".to_string()))?;

    let images = sqlx::query_as::<_, StadiumImage>(
        "SELECT * FROM stadium_images WHERE stadium_id = $1 ORDER BY position",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let sports = sqlx::query_as::<_, Sport>(
        r#"
        SELECT sp.* FROM sports sp
        JOIN stadium_sports ss ON ss.sport_id = sp.id
        WHERE ss.stadium_id = $1
        ORDER BY sp.name_fr
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(StadiumDetail {
        stadium,
        images,
        sports,
    })
}

async fn replace_images(
    conn: &mut PgConnection,
    stadium_id: Uuid,
    urls: &[String],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM stadium_images WHERE stadium_id = $1")
        .bind(stadium_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO stadium_images (stadium_id, url, position)
        SELECT $1, t.url, (t.ord - 1)::int
        FROM UNNEST($2::text[]) WITH ORDINALITY AS t(url, ord)
        "#,
    )
    .bind(stadium_id)
    .bind(urls)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn replace_sports(
    conn: &mut PgConnection,
    stadium_id: Uuid,
    sport_ids: &[Uuid],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM stadium_sports WHERE stadium_id = $1")
        .bind(stadium_id)
        .execute(&mut *conn)
        .await?;
    let inserted = sqlx::query(
        r#"
        INSERT INTO stadium_sports (stadium_id, sport_id)
        SELECT DISTINCT $1, sp.id FROM sports sp WHERE sp.id = ANY($2)
        "#,
    )
    .bind(stadium_id)
    .bind(sport_ids)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    let mut distinct = sport_ids.to_vec();
    distinct.sort();
    distinct.dedup();
    if inserted as usize != distinct.len() {
        return Err(AppError::Validation("Unknown sport in sportIds".to_string()));
    }
    Ok(())
}

pub async fn create(pool: &PgPool, input: &CreateStadium) -> Result<StadiumDetail, AppError> {
    let mut tx = pool.begin().await?;

    let stadium = sqlx::query_as::<_, Stadium>(
        r#"
        INSERT INTO stadiums (name, address, google_map_url, monthly_price, price_per_session)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.address)
    .bind(&input.google_map_url)
    .bind(input.monthly_price)
    .bind(input.price_per_session)
    .fetch_one(&mut *tx)
    .await?;

    replace_images(&mut tx, stadium.id, &input.image_urls).await?;
    replace_sports(&mut tx, stadium.id, &input.sport_ids).await?;

    tx.commit().await?;

    tracing::info!(stadium_id = %stadium.id, name = %stadium.name, "Stadium created");
    find_by_id(pool, stadium.id).await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    input: &UpdateStadium,
) -> Result<StadiumDetail, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query_as::<_, Stadium>(
        r#"
        UPDATE stadiums SET
            name = COALESCE($2, name),
            address = COALESCE($3, address),
            google_map_url = COALESCE($4, google_map_url),
            monthly_price = COALESCE($5, monthly_price),
            price_per_session = COALESCE($6, price_per_session),
            is_active = COALESCE($7, is_active),
            updated_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.address)
    .bind(&input.google_map_url)
    .bind(input.monthly_price)
    .bind(input.price_per_session)
    .bind(input.is_active)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Stadium not found".to_string()))?;

    if let Some(ref urls) = input.image_urls {
        replace_images(&mut tx, id, urls).await?;
    }
    if let Some(ref sport_ids) = input.sport_ids {
        replace_sports(&mut tx, id, sport_ids).await?;
    }

    tx.commit().await?;

    tracing::info!(stadium_id = %id, "Stadium updated");
    find_by_id(pool, id).await
}

/// Hide the stadium from the catalogue. Existing reservations are kept.
pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let affected = sqlx::query(
        "UPDATE stadiums SET deleted_at = NOW(), is_active = false, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    if affected == 0 {
        return Err(AppError::NotFound("Stadium not found".to_string()));
    }
    tracing::info!(stadium_id = %id, "Stadium deleted");
    Ok(())
}
