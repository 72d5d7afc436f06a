use sqlx::{Pool, Sqlite};

use crate::db;
use crate::models::AddressInfo;

pub async fn get(
    pool: &Pool<Sqlite>,
    address: &str,
) -> Result<Option<AddressInfo>, sqlx::Error> {
    sqlx::query_as::<_, AddressInfo>(
        "SELECT address, is_contract, creation_block, updated_at \
         FROM address_info WHERE address = ?",
    )
    .bind(address)
    .fetch_optional(pool)
    .await
}

/// Written once by the resolver, read thereafter. A concurrent second
/// discovery simply overwrites with the same result.
pub async fn upsert(
    pool: &Pool<Sqlite>,
    address: &str,
    is_contract: bool,
    creation_block: Option<i64>,
) -> Result<AddressInfo, sqlx::Error> {
    let updated_at = db::now_secs();

    sqlx::query(
        r#"
        INSERT INTO address_info (address, is_contract, creation_block, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(address) DO UPDATE SET
            is_contract = excluded.is_contract,
            creation_block = excluded.creation_block,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(address)
    .bind(is_contract)
    .bind(creation_block)
    .bind(updated_at)
    .execute(pool)
    .await?;

    Ok(AddressInfo {
        address: address.to_string(),
        is_contract,
        creation_block,
        updated_at,
    })
}
