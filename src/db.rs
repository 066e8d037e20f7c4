//! Database connection pool and migration management.
//!
//! This module provides utilities for:
//! - Creating and managing a PostgreSQL connection pool
//! - Running database migrations automatically
//! - Ensuring the bootstrap platform administrator exists

use sqlx::{Pool, Postgres};

use crate::services::token_service;

/// Type alias for PostgreSQL connection pool.
pub type DbPool = Pool<Postgres>;

/// Create a new PostgreSQL connection pool.
///
/// # Errors
///
/// Returns an error if the connection string is invalid or the server
/// cannot be reached.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Run database migrations from the `migrations/` directory.
///
/// Migrations are tracked in the `_sqlx_migrations` table, so each one runs
/// only once. Reference data (subscription plans) ships with them.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Ensure a platform administrator with the given access token exists.
///
/// Idempotent: the user is upserted by email and promoted to platform admin,
/// and the token is only inserted if its hash is not already stored.
pub async fn ensure_bootstrap_admin(
    pool: &DbPool,
    email: &str,
    token: &str,
) -> Result<(), sqlx::Error> {
    let email = email.trim().to_lowercase();
    let mut tx = pool.begin().await?;

    let user_id: uuid::Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (email, display_name, is_platform_admin)
        VALUES ($1, 'Platform Admin', true)
        ON CONFLICT (email) DO UPDATE SET is_platform_admin = true
        RETURNING id
        "#,
    )
    .bind(&email)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO access_tokens (user_id, label, token_hash)
        VALUES ($1, 'bootstrap', $2)
        ON CONFLICT (token_hash) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(token_service::hash_token(token))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(user_id = %user_id, "Bootstrap platform admin ensured");
    Ok(())
}
