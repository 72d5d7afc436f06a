//! Address-info resolution: EOA vs contract, and for contracts the creation
//! block, discovered by binary search over `getCode` snapshots. Three tiers:
//! KV cache, durable store, then discovery against the node.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{debug, warn};

use super::rpc::{has_code, NodeRpcClient};
use crate::cache::AddressCacheManager;
use crate::db;
use crate::error::ServiceError;
use crate::models::AddressInfo;

#[derive(Clone)]
pub struct AddressResolver {
    pool: SqlitePool,
    cache: AddressCacheManager,
    rpc: Arc<NodeRpcClient>,
}

impl AddressResolver {
    pub fn new(pool: SqlitePool, cache: AddressCacheManager, rpc: Arc<NodeRpcClient>) -> Self {
        Self { pool, cache, rpc }
    }

    /// Resolve address info, consulting KV, then the durable store (warming
    /// KV on a hit), then discovery. `address` must be normalized.
    pub async fn resolve(&self, address: &str) -> Result<AddressInfo, ServiceError> {
        if let Some(info) = self.cache.get(address).await {
            return Ok(info);
        }

        if let Some(info) = db::address_info::get(&self.pool, address).await? {
            self.cache.insert(info.clone()).await;
            return Ok(info);
        }

        self.discover(address).await
    }

    /// The lowest block worth scanning for an address: a contract's creation
    /// block when known, otherwise 0. Resolution failures degrade to 0 so the
    /// read path stays available.
    pub async fn starting_block_for(&self, address: &str) -> u64 {
        match self.resolve(address).await {
            Ok(info) => info.creation_block.map(|b| b as u64).unwrap_or(0),
            Err(e) => {
                warn!(address, error = %e, "address resolution failed, scanning from genesis");
                0
            }
        }
    }

    async fn discover(&self, address: &str) -> Result<AddressInfo, ServiceError> {
        let code = self.rpc.get_code(address, None).await?;

        let (is_contract, creation_block) = if has_code(&code) {
            let latest = self.rpc.get_block_number().await?;
            let creation = self.find_creation_block(address, latest).await?;
            debug!(address, creation, "contract creation block discovered");
            (true, Some(creation as i64))
        } else {
            (false, None)
        };

        // Persist to the durable store and KV concurrently; neither side's
        // failure may mask the other's success, so storage errors only log.
        let info = AddressInfo {
            address: address.to_string(),
            is_contract,
            creation_block,
            updated_at: db::now_secs(),
        };
        let (stored, ()) = tokio::join!(
            db::address_info::upsert(&self.pool, address, is_contract, creation_block),
            self.cache.insert(info.clone()),
        );
        match stored {
            Ok(stored) => Ok(stored),
            Err(e) => {
                warn!(address, error = %e, "failed to persist address info");
                Ok(info)
            }
        }
    }

    /// Lower-bound binary search for the first block at which the address has
    /// code. Transient failures at the probe point bias the search upward
    /// instead of aborting; the result may then overshoot, which only costs
    /// a wider scan later, never a missed transaction.
    async fn find_creation_block(&self, address: &str, latest: u64) -> Result<u64, ServiceError> {
        let mut lo = 0u64;
        let mut hi = latest;

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.rpc.get_code(address, Some(mid)).await {
                Ok(code) if has_code(&code) => hi = mid,
                Ok(_) => lo = mid + 1,
                Err(e) if e.is_transient() => {
                    warn!(address, mid, error = %e, "getCode probe failed, biasing upward");
                    lo = mid + 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(lo)
    }
}
