//! Caching for balance snapshots. Short TTL; balances move every block.

use std::time::Duration;

use moka::future::Cache;

use crate::db;

/// What the balance endpoint needs to answer from cache, including when the
/// snapshot was taken so responses can report its age.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBalance {
    /// Wei as a decimal string.
    pub balance: String,
    pub block_number: u64,
    pub cached_at: i64,
}

#[derive(Clone)]
pub struct BalanceCacheManager {
    cache: Cache<String, CachedBalance>,
}

impl BalanceCacheManager {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, address: &str) -> Option<CachedBalance> {
        self.cache.get(address).await
    }

    pub async fn insert(&self, address: &str, balance: &str, block_number: u64) {
        self.cache
            .insert(
                address.to_string(),
                CachedBalance {
                    balance: balance.to_string(),
                    block_number,
                    cached_at: db::now_secs(),
                },
            )
            .await;
    }
}
