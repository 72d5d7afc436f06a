pub mod address;
pub mod balance;
pub mod keys;
pub mod transaction;

pub use address::AddressCacheManager;
pub use balance::{BalanceCacheManager, CachedBalance};
pub use keys::CacheKey;
pub use transaction::TransactionCacheManager;

use crate::config::Config;

/// The in-process KV tier. Every lookup is best-effort: the only failure a
/// caller can observe is a miss.
#[derive(Clone)]
pub struct AppCache {
    pub transactions: TransactionCacheManager,
    pub addresses: AddressCacheManager,
    pub balances: BalanceCacheManager,
}

pub fn init_cache(config: &Config) -> AppCache {
    AppCache {
        transactions: TransactionCacheManager::new(
            config.cache_max_capacity,
            config.tx_query_cache_ttl,
            config.txcount_cache_ttl,
        ),
        addresses: AddressCacheManager::new(
            config.cache_max_capacity,
            config.address_info_cache_ttl,
        ),
        balances: BalanceCacheManager::new(config.cache_max_capacity, config.balance_cache_ttl),
    }
}
