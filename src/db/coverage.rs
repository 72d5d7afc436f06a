use sqlx::{Pool, Sqlite};

use crate::db;
use crate::models::Coverage;

/// Coverage rows for `address` that overlap `[from_block, to_block]`.
/// The caller feeds these to the coverage engine; no merging happens here.
pub async fn get_overlapping(
    pool: &Pool<Sqlite>,
    address: &str,
    from_block: u64,
    to_block: u64,
) -> Result<Vec<Coverage>, sqlx::Error> {
    sqlx::query_as::<_, Coverage>(
        r#"
        SELECT address, from_block, to_block, created_at
        FROM coverage
        WHERE address = ? AND to_block >= ? AND from_block <= ?
        ORDER BY from_block ASC
        "#,
    )
    .bind(address)
    .bind(from_block as i64)
    .bind(to_block as i64)
    .fetch_all(pool)
    .await
}

/// All coverage rows for an address, ordered by from_block.
pub async fn get_all(pool: &Pool<Sqlite>, address: &str) -> Result<Vec<Coverage>, sqlx::Error> {
    sqlx::query_as::<_, Coverage>(
        "SELECT address, from_block, to_block, created_at FROM coverage \
         WHERE address = ? ORDER BY from_block ASC",
    )
    .bind(address)
    .fetch_all(pool)
    .await
}

/// Record a materialized range. Set-semantic: re-inserting an identical
/// triple is a no-op, and rows are never deleted or shrunk.
pub async fn upsert(
    pool: &Pool<Sqlite>,
    address: &str,
    from_block: u64,
    to_block: u64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO coverage (address, from_block, to_block, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(address, from_block, to_block) DO NOTHING
        "#,
    )
    .bind(address)
    .bind(from_block as i64)
    .bind(to_block as i64)
    .bind(db::now_secs())
    .execute(pool)
    .await?;
    Ok(())
}
