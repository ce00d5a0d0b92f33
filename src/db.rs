use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use crate::models::{permission, user};

pub type DbPool = PgPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn init_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(8)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Create the `admin` account with global event management rights, unless
/// any user already exists.
pub async fn seed_admin(pool: &DbPool, password_hash: &str) -> Result<(), sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        log::info!("Database already has {count} user(s), skipping admin seed");
        return Ok(());
    }

    let admin_id = user::create(pool, "admin", password_hash, "Administrator").await?;
    permission::grant(pool, admin_id, permission::MANAGE_ALL_EVENTS).await?;
    log::info!("Seeded admin user (id={admin_id})");
    Ok(())
}
