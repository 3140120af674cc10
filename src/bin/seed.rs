//! Seed script for development: populates a fresh database with sample data.
//!
//! Usage: `cargo run --bin seed`
//!
//! Requires `DATABASE_URL` (reads .env).

use anyhow::Context;
use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stadium_booking::services::auth::hash_password;
use stadium_booking::services::payment::{due_date_for, month_start};

const ADMIN_EMAIL: &str = "admin@stadium.local";
const ADMIN_PASSWORD: &str = "Admin123!";
const CLUB_PASSWORD: &str = "Club1234!";

const SPORTS: [(&str, &str, &str); 4] = [
    ("Football", "كرة القدم", "Football"),
    ("Basket-ball", "كرة السلة", "Basketball"),
    ("Handball", "كرة اليد", "Handball"),
    ("Volley-ball", "الكرة الطائرة", "Volleyball"),
];

const STADIUMS: [(&str, &str, f64, f64); 3] = [
    ("Complexe Sportif Al Amal", "Boulevard Zerktouni, Casablanca", 4000.0, 300.0),
    ("Stade Municipal Hay Riad", "Avenue Annakhil, Rabat", 3000.0, 250.0),
    ("Salle Omnisports Agdal", "Rue Oued Fes, Rabat", 2500.0, 200.0),
];

const CLUBS: [(&str, &str, &str, Option<f64>); 3] = [
    ("Youssef Amrani", "youssef@fath-juniors.ma", "Fath Juniors", Some(2800.0)),
    ("Salma Idrissi", "salma@basket-agdal.ma", "Basket Agdal", None),
    ("Hamza Tazi", "hamza@atlas-hand.ma", "Atlas Handball", None),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    println!("=== Stadium Booking Seed Script ===");

    seed_admin(&pool).await?;
    let sports = seed_sports(&pool).await?;
    let stadiums = seed_stadiums(&pool, &sports).await?;
    let clubs = seed_clubs(&pool, &sports).await?;
    seed_reservations(&pool, &stadiums, &clubs).await?;
    seed_subscription(&pool, &stadiums, &clubs).await?;

    println!("\n=== Seed complete! ===");
    println!("Admin login: {ADMIN_EMAIL} / {ADMIN_PASSWORD}");
    println!("Club logins: <club email> / {CLUB_PASSWORD}");

    Ok(())
}

async fn seed_admin(pool: &PgPool) -> anyhow::Result<()> {
    let hash = hash_password(ADMIN_PASSWORD)?;
    sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, role, is_approved, email_verified)
        VALUES ('Administrateur', $1, $2, 'ADMIN', true, true)
        ON CONFLICT (email) DO UPDATE SET password_hash = EXCLUDED.password_hash
        "#,
    )
    .bind(ADMIN_EMAIL)
    .bind(&hash)
    .execute(pool)
    .await?;

    println!("[done] Admin user");
    Ok(())
}

async fn seed_sports(pool: &PgPool) -> anyhow::Result<Vec<Uuid>> {
    let mut ids = Vec::with_capacity(SPORTS.len());
    for (fr, ar, en) in SPORTS {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO sports (name_fr, name_ar, name_en) VALUES ($1, $2, $3)
            ON CONFLICT (name_en) DO UPDATE SET name_fr = EXCLUDED.name_fr
            RETURNING id
            "#,
        )
        .bind(fr)
        .bind(ar)
        .bind(en)
        .fetch_one(pool)
        .await?;
        ids.push(id);
    }
    println!("[done] {} sports", ids.len());
    Ok(ids)
}

async fn seed_stadiums(pool: &PgPool, sports: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
    let existing: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM stadiums ORDER BY created_at")
        .fetch_all(pool)
        .await?;
    if !existing.is_empty() {
        println!("[skip] Stadiums already present ({})", existing.len());
        return Ok(existing);
    }

    let mut ids = Vec::with_capacity(STADIUMS.len());
    for (i, (name, address, monthly, session)) in STADIUMS.into_iter().enumerate() {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO stadiums (name, address, monthly_price, price_per_session)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(address)
        .bind(monthly)
        .bind(session)
        .fetch_one(pool)
        .await?;

        // Every stadium hosts football plus one other sport.
        let hosted = [sports[0], sports[(i + 1) % sports.len()]];
        sqlx::query(
            "INSERT INTO stadium_sports (stadium_id, sport_id) SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(&hosted[..])
        .execute(pool)
        .await?;

        sqlx::query("INSERT INTO stadium_images (stadium_id, url, position) VALUES ($1, $2, 0)")
            .bind(id)
            .bind(format!("https://images.example.ma/stadiums/{}.jpg", i + 1))
            .execute(pool)
            .await?;

        ids.push(id);
    }
    println!("[done] {} stadiums", ids.len());
    Ok(ids)
}

async fn seed_clubs(pool: &PgPool, sports: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
    let hash = hash_password(CLUB_PASSWORD)?;
    let mut user_ids = Vec::with_capacity(CLUBS.len());

    for (i, (owner, email, club_name, fee)) in CLUBS.into_iter().enumerate() {
        let user_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (name, email, password_hash, role, is_approved, email_verified, preferred_locale)
            VALUES ($1, $2, $3, 'CLUB', true, true, $4)
            ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(owner)
        .bind(email)
        .bind(&hash)
        .bind(if i % 2 == 0 { "fr" } else { "ar" })
        .fetch_one(pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO clubs (user_id, name, sport_id, monthly_fee)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(club_name)
        .bind(sports[i % sports.len()])
        .bind(fee)
        .execute(pool)
        .await?;

        user_ids.push(user_id);
    }
    println!("[done] {} clubs", user_ids.len());
    Ok(user_ids)
}

/// Past reservations spread over the last months so the dashboard has data.
async fn seed_reservations(pool: &PgPool, stadiums: &[Uuid], clubs: &[Uuid]) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reservations")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        println!("[skip] Reservations already present ({count})");
        return Ok(());
    }

    let today = Utc::now().date_naive();
    let statuses = ["PAID", "APPROVED", "PAID", "DECLINED", "PENDING", "UNPAID", "CANCELLED"];
    let mut inserted = 0;

    for day in (1..=150).step_by(5) {
        let date = today - Duration::days(day);
        let slot = (day as usize) % statuses.len();
        let status = statuses[slot];
        let stadium = stadiums[slot % stadiums.len()];
        let club = clubs[slot % clubs.len()];
        let start = date.and_hms_opt(18, 0, 0).map(|t| t.and_utc());
        let Some(start) = start else { continue };

        sqlx::query(
            r#"
            INSERT INTO reservations (user_id, stadium_id, start_time, end_time, status, is_paid, amount, paid_at, created_at)
            SELECT $1, $2, $3, $3 + INTERVAL '90 minutes', $4::reservation_status, $4 = 'PAID',
                   s.price_per_session, CASE WHEN $4 = 'PAID' THEN $3 ELSE NULL END, $3 - INTERVAL '3 days'
            FROM stadiums s WHERE s.id = $2
            "#,
        )
        .bind(club)
        .bind(stadium)
        .bind(start)
        .bind(status)
        .execute(pool)
        .await?;
        inserted += 1;
    }

    println!("[done] {inserted} reservations");
    Ok(())
}

/// One monthly subscription with a settled previous month and a pending current month.
async fn seed_subscription(pool: &PgPool, stadiums: &[Uuid], clubs: &[Uuid]) -> anyhow::Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM monthly_subscriptions)")
        .fetch_one(pool)
        .await?;
    if exists {
        println!("[skip] Subscription already present");
        return Ok(());
    }

    let club = clubs[0];
    let this_month = month_start(Utc::now().date_naive());
    let last_month = month_start(this_month - Duration::days(1));
    let start_date: NaiveDate = last_month;

    let series_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO reservation_series (user_id, stadium_id, day_of_week, start_time, end_time, billing_type, start_date)
        VALUES ($1, $2, 3, '19:00', '20:30', 'MONTHLY', $3)
        RETURNING id
        "#,
    )
    .bind(club)
    .bind(stadiums[0])
    .bind(start_date)
    .fetch_one(pool)
    .await?;

    let subscription_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO monthly_subscriptions (series_id, user_id, monthly_amount, start_date)
        VALUES ($1, $2, 2800, $3)
        RETURNING id
        "#,
    )
    .bind(series_id)
    .bind(club)
    .bind(start_date)
    .fetch_one(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO monthly_payments (subscription_id, user_id, month, amount, amount_paid, due_date, status, paid_at)
        VALUES ($1, $2, $3, 2800, 2800, $4, 'PAID', $4::timestamptz),
               ($1, $2, $5, 2800, 0, $6, 'PENDING', NULL)
        "#,
    )
    .bind(subscription_id)
    .bind(club)
    .bind(last_month)
    .bind(due_date_for(last_month, 5))
    .bind(this_month)
    .bind(due_date_for(this_month, 5))
    .execute(pool)
    .await?;

    println!("[done] Monthly subscription with 2 payments");
    Ok(())
}
