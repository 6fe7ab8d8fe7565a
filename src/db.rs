use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::auth::password;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::user::{self, NewUser, Role};

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Create the configured admin account when no users exist yet.
/// Returns whether an account was created.
pub async fn seed_admin(pool: &PgPool, config: &AppConfig) -> Result<bool, AppError> {
    if user::count(pool).await? > 0 {
        return Ok(false);
    }

    let password_hash = password::hash_password(&config.admin_password)?;
    let id = user::create(
        pool,
        &NewUser {
            username: config.admin_username.clone(),
            email: config.admin_email.clone(),
            display_name: "Administrator".to_string(),
            password_hash,
            role: Role::SuperAdmin,
        },
    )
    .await?;

    log::info!("Seeded admin account '{}' (id {id})", config.admin_username);
    if config.admin_password == crate::config::DEFAULT_ADMIN_PASSWORD {
        log::warn!("Admin account uses the default password; set ADMIN_PASSWORD");
    }
    Ok(true)
}
