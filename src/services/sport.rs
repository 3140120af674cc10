use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::sport::{CreateSport, Sport};

pub async fn list(pool: &PgPool) -> Result<Vec<Sport>, AppError> {
    let sports = sqlx::query_as::<_, Sport>("SELECT * FROM sports ORDER BY name_fr")
        .fetch_all(pool)
        .await?;
    Ok(sports)
}

pub async fn create(pool: &PgPool, input: &CreateSport) -> Result<Sport, AppError> {
    let sport = sqlx::query_as::<_, Sport>(
        "INSERT INTO sports (name_fr, name_ar, name_en) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(input.name_fr.trim())
    .bind(input.name_ar.trim())
    .bind(input.name_en.trim())
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict("Sport already exists".to_string())
        }
        other => AppError::Database(other),
    })?;

    tracing::info!(sport_id = %sport.id, "Sport created");
    Ok(sport)
}
