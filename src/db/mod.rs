pub mod address_info;
pub mod balance;
pub mod connection;
pub mod coverage;
pub mod migration;
pub mod transaction;

use std::time::{SystemTime, UNIX_EPOCH};

pub const INIT_SCHEMA: &str = r#"
-- External transactions, keyed per owning address
CREATE TABLE IF NOT EXISTS transactions (
    hash TEXT NOT NULL,
    address TEXT NOT NULL,
    block_number INTEGER NOT NULL,
    from_address TEXT NOT NULL,
    to_address TEXT,
    value TEXT NOT NULL,
    gas_price TEXT NOT NULL,
    gas_used INTEGER,
    gas INTEGER,
    function_name TEXT,
    receipt_status TEXT NOT NULL,
    contract_address TEXT,
    timestamp INTEGER NOT NULL,
    PRIMARY KEY (address, hash)
);

CREATE INDEX IF NOT EXISTS idx_transactions_address_block
    ON transactions(address, block_number);

-- Append-only record of materialized block ranges per address
CREATE TABLE IF NOT EXISTS coverage (
    address TEXT NOT NULL,
    from_block INTEGER NOT NULL,
    to_block INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (address, from_block, to_block)
);

CREATE INDEX IF NOT EXISTS idx_coverage_address_from ON coverage(address, from_block);
CREATE INDEX IF NOT EXISTS idx_coverage_address_to ON coverage(address, to_block);

CREATE TABLE IF NOT EXISTS address_info (
    address TEXT PRIMARY KEY,
    is_contract INTEGER NOT NULL,
    creation_block INTEGER,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS balances (
    address TEXT PRIMARY KEY,
    balance TEXT NOT NULL,
    block_number INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Durable gap-fill job queue. job_key collapses duplicate submissions
CREATE TABLE IF NOT EXISTS gap_jobs (
    job_key TEXT PRIMARY KEY,
    address TEXT NOT NULL,
    from_block INTEGER NOT NULL,
    to_block INTEGER NOT NULL,
    total_jobs INTEGER NOT NULL,
    current_job INTEGER NOT NULL,
    priority INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    attempts INTEGER NOT NULL DEFAULT 0,
    run_at INTEGER NOT NULL,
    last_error TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_gap_jobs_claim ON gap_jobs(status, run_at, priority);
"#;

/// Current UTC time as epoch seconds; used for created_at/updated_at columns.
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Current UTC time as epoch milliseconds; used for job run_at scheduling.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
