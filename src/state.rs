use std::sync::Arc;

use sqlx::SqlitePool;

use crate::blockchain::{AddressResolver, ExplorerClient, NodeRpcClient, UpstreamRateLimiter};
use crate::cache::AppCache;
use crate::config::Config;
use crate::error::ServiceError;
use crate::jobs::GapScheduler;

/// Process-lifetime singletons, constructed once at startup and shared by
/// immutable handle. The rate limiter is the only shared-mutable member and
/// hides that behind acquire/release.
pub struct AppState {
    pub config: Config,
    pub db_pool: SqlitePool,
    pub cache: AppCache,
    pub rpc: Arc<NodeRpcClient>,
    pub explorer: ExplorerClient,
    pub resolver: AddressResolver,
    pub limiter: Arc<UpstreamRateLimiter>,
    pub scheduler: GapScheduler,
}

impl AppState {
    pub fn new(config: Config, db_pool: SqlitePool) -> Result<Self, ServiceError> {
        let cache = crate::cache::init_cache(&config);
        let limiter = Arc::new(UpstreamRateLimiter::new(
            config.rate_limit_tokens_per_sec,
            config.rate_limit_max_concurrent,
        ));
        let rpc = Arc::new(NodeRpcClient::new(&config)?);
        let explorer = ExplorerClient::new(&config, limiter.clone())?;
        let resolver = AddressResolver::new(db_pool.clone(), cache.addresses.clone(), rpc.clone());
        let scheduler = GapScheduler::new(db_pool.clone(), config.max_blocks_per_job);

        Ok(Self {
            config,
            db_pool,
            cache,
            rpc,
            explorer,
            resolver,
            limiter,
            scheduler,
        })
    }
}
