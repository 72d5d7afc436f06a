use sqlx::{Pool, QueryBuilder, Sqlite};

use crate::db;
use crate::models::{SortOrder, Transaction};

const INSERT_SQL: &str = r#"
INSERT INTO transactions
    (hash, address, block_number, from_address, to_address, value,
     gas_price, gas_used, gas, function_name, receipt_status,
     contract_address, timestamp)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(address, hash) DO NOTHING
"#;

/// Batch-insert transactions. Duplicate `(address, hash)` pairs are silently
/// skipped, which makes re-runs of the same gap job idempotent.
pub async fn insert_transactions(
    pool: &Pool<Sqlite>,
    transactions: &[Transaction],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for t in transactions {
        bind_insert(sqlx::query(INSERT_SQL), t).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Persist a gap job's output atomically: all fetched rows plus the coverage
/// row for the processed range commit or fail together.
pub async fn insert_with_coverage(
    pool: &Pool<Sqlite>,
    transactions: &[Transaction],
    address: &str,
    from_block: u64,
    to_block: u64,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for t in transactions {
        bind_insert(sqlx::query(INSERT_SQL), t).execute(&mut *tx).await?;
    }

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
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

fn bind_insert<'q>(
    query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    t: &'q Transaction,
) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(&t.hash)
        .bind(&t.address)
        .bind(t.block_number)
        .bind(&t.from_address)
        .bind(&t.to_address)
        .bind(&t.value)
        .bind(&t.gas_price)
        .bind(t.gas_used)
        .bind(t.gas)
        .bind(&t.function_name)
        .bind(&t.receipt_status)
        .bind(&t.contract_address)
        .bind(t.timestamp)
}

/// Paginated read over the owner index, ordered by block number.
pub async fn get_transactions(
    pool: &Pool<Sqlite>,
    address: &str,
    from_block: u64,
    to_block: u64,
    page: u32,
    limit: u32,
    order: SortOrder,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let offset = (page as i64 - 1) * limit as i64;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT hash, address, block_number, from_address, to_address, value, \
         gas_price, gas_used, gas, function_name, receipt_status, \
         contract_address, timestamp \
         FROM transactions WHERE address = ",
    );
    builder.push_bind(address);
    builder.push(" AND block_number >= ");
    builder.push_bind(from_block as i64);
    builder.push(" AND block_number <= ");
    builder.push_bind(to_block as i64);
    builder.push(format!(" ORDER BY block_number {} LIMIT ", order.sql_keyword()));
    builder.push_bind(limit as i64);
    builder.push(" OFFSET ");
    builder.push_bind(offset);

    builder.build_query_as::<Transaction>().fetch_all(pool).await
}

/// Total number of stored transactions for an address.
pub async fn count_transactions(pool: &Pool<Sqlite>, address: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE address = ?")
        .bind(address)
        .fetch_one(pool)
        .await
}
