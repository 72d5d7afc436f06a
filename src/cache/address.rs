//! Caching for resolved address info. Long TTL: whether an address is a
//! contract, and its creation block, never changes once discovered.

use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::models::AddressInfo;

#[derive(Clone)]
pub struct AddressCacheManager {
    cache: Cache<String, AddressInfo>,
}

impl AddressCacheManager {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, address: &str) -> Option<AddressInfo> {
        self.cache.get(address).await
    }

    pub async fn insert(&self, info: AddressInfo) {
        debug!(address = %info.address, is_contract = info.is_contract, "caching address info");
        self.cache.insert(info.address.clone(), info).await;
    }

    pub async fn invalidate(&self, address: &str) {
        self.cache.invalidate(address).await;
    }
}
