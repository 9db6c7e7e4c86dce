use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};
use crate::auth::password::{hash_password, validate_password};
use crate::error::AppError;
use crate::models::user::Role;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Creates the first admin account when none exists yet.
pub async fn ensure_admin(pool: &PgPool, email: &str, password: &str) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE role = $1)")
        .bind(Role::Admin.as_str())
        .fetch_one(pool)
        .await?;

    if exists {
        return Ok(());
    }

    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        warn!(%email, "ADMIN_EMAIL is not an email address, skipping admin bootstrap");
        return Ok(());
    }
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    sqlx::query(
        "INSERT INTO users (email, password_hash, full_name, role)
         VALUES ($1, $2, 'Administrator', $3)
         ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role, is_active = TRUE"
    )
    .bind(&email)
    .bind(&password_hash)
    .bind(Role::Admin.as_str())
    .execute(pool)
    .await?;

    info!(%email, "Bootstrap admin account created");
    Ok(())
}
