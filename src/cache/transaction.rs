//! Caching for paginated transaction query results and stored counts.

use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use super::keys::CacheKey;
use crate::models::{DataSource, TransactionsResponse};

#[derive(Clone)]
pub struct TransactionCacheManager {
    queries: Cache<CacheKey, TransactionsResponse>,
    counts: Cache<CacheKey, i64>,
}

impl TransactionCacheManager {
    pub fn new(capacity: u64, query_ttl: Duration, count_ttl: Duration) -> Self {
        Self {
            queries: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(query_ttl)
                .support_invalidation_closures()
                .build(),
            counts: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(count_ttl)
                .support_invalidation_closures()
                .build(),
        }
    }

    /// Cached response for a query key; already stamped as a cache hit.
    pub async fn get_query(&self, key: &CacheKey) -> Option<TransactionsResponse> {
        let hit = self.queries.get(key).await;
        debug!(key = %key, hit = hit.is_some(), "tx query cache lookup");
        hit
    }

    /// Write back a freshly computed response. The stored copy is stamped
    /// `from_cache = true` / `source = cache` so later hits return verbatim.
    pub async fn insert_query(&self, key: CacheKey, mut response: TransactionsResponse) {
        response.from_cache = true;
        response.metadata.source = DataSource::Cache;
        self.queries.insert(key, response).await;
    }

    pub async fn get_count(&self, key: &CacheKey) -> Option<i64> {
        self.counts.get(key).await
    }

    pub async fn insert_count(&self, key: CacheKey, count: i64) {
        self.counts.insert(key, count).await;
    }

    /// Drop every cached entry belonging to an address.
    pub async fn invalidate_for_address(&self, address: &str) {
        let owned = address.to_string();
        let _ = self
            .queries
            .invalidate_entries_if(move |k, _| k.address() == owned);
        let owned = address.to_string();
        let _ = self
            .counts
            .invalidate_entries_if(move |k, _| k.address() == owned);
        debug!(address, "invalidated transaction cache entries");
    }
}
