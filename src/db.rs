use anyhow::{Context, Result};
use log::info;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connects to Postgres and brings the `comments` table up to date.
pub async fn init_pool(db_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await
        .context("Could not connect to db, check DATABASE_URL")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Could not run migrations")?;
    info!("database migrations applied");

    Ok(pool)
}
