use sqlx::{migrate::MigrateDatabase, Pool, Sqlite, SqlitePool};

/// Open (creating if necessary) the SQLite database. WAL mode keeps
/// concurrent readers off the writers' backs. Schema setup lives in
/// `migration::run_migrations`.
pub async fn establish_connection(database_url: &str) -> Result<Pool<Sqlite>, sqlx::Error> {
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        Sqlite::create_database(database_url).await?;
    }

    let pool = SqlitePool::connect(database_url).await?;

    sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
    sqlx::query("PRAGMA foreign_keys=ON").execute(&pool).await?;

    Ok(pool)
}

/// In-memory pool for tests. A single connection keeps every query on the
/// same private :memory: database.
#[cfg(test)]
pub async fn connect_in_memory() -> Pool<Sqlite> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory sqlite");
    crate::db::migration::run_migrations(&pool)
        .await
        .expect("failed to initialize schema");
    pool
}
