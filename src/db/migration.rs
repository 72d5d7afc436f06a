use sqlx::SqlitePool;
use tracing::info;

use crate::db::INIT_SCHEMA;

/// Create all tables and indexes. Every statement is idempotent, so this is
/// safe to run on every startup.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    info!("Running database migrations");

    for statement in INIT_SCHEMA.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database migrations completed");
    Ok(())
}
