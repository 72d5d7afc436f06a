use sqlx::{Pool, Sqlite};

use crate::db;
use crate::models::Balance;

pub async fn get(pool: &Pool<Sqlite>, address: &str) -> Result<Option<Balance>, sqlx::Error> {
    sqlx::query_as::<_, Balance>(
        "SELECT address, balance, block_number, updated_at FROM balances WHERE address = ?",
    )
    .bind(address)
    .fetch_optional(pool)
    .await
}

/// Snapshot upsert; each refresh overwrites the previous observation.
pub async fn upsert(
    pool: &Pool<Sqlite>,
    address: &str,
    balance: &str,
    block_number: u64,
) -> Result<Balance, sqlx::Error> {
    let updated_at = db::now_secs();

    sqlx::query(
        r#"
        INSERT INTO balances (address, balance, block_number, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(address) DO UPDATE SET
            balance = excluded.balance,
            block_number = excluded.block_number,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(address)
    .bind(balance)
    .bind(block_number as i64)
    .bind(updated_at)
    .execute(pool)
    .await?;

    Ok(Balance {
        address: address.to_string(),
        balance: balance.to_string(),
        block_number: block_number as i64,
        updated_at,
    })
}
