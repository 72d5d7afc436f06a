use dotenv::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,

    pub rpc_url: String,
    pub explorer_api_url: String,
    pub explorer_api_key: String,

    /// Deadline for node RPC calls.
    pub rpc_timeout: Duration,
    /// Deadline for explorer calls; shorter, the explorer enforces its own
    /// query timeout on large ranges.
    pub explorer_timeout: Duration,

    pub balance_cache_ttl: Duration,
    pub tx_query_cache_ttl: Duration,
    pub txcount_cache_ttl: Duration,
    pub address_info_cache_ttl: Duration,
    pub cache_max_capacity: u64,

    pub worker_concurrency: usize,
    pub worker_poll_interval: Duration,
    pub max_blocks_per_job: u64,
    pub max_tx_per_batch: usize,

    pub rate_limit_tokens_per_sec: u32,
    pub rate_limit_max_concurrent: usize,

    pub job_retry_attempts: u32,
    pub job_retry_backoff_base_ms: u64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:txindex.db".to_string()),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env_parse("SERVER_PORT", 8080),

            rpc_url: env::var("ETH_RPC_URL")
                .unwrap_or_else(|_| "https://eth.llamarpc.com".to_string()),
            explorer_api_url: env::var("EXPLORER_API_URL")
                .unwrap_or_else(|_| "https://api.etherscan.io/api".to_string()),
            explorer_api_key: env::var("EXPLORER_API_KEY").unwrap_or_default(),

            rpc_timeout: Duration::from_millis(env_parse("RPC_TIMEOUT_MS", 10_000)),
            explorer_timeout: Duration::from_millis(env_parse("EXPLORER_TIMEOUT_MS", 5_000)),

            balance_cache_ttl: Duration::from_secs(env_parse("BALANCE_CACHE_TTL_SECS", 30)),
            tx_query_cache_ttl: Duration::from_secs(env_parse("TX_QUERY_CACHE_TTL_SECS", 300)),
            txcount_cache_ttl: Duration::from_secs(env_parse("TXCOUNT_CACHE_TTL_SECS", 300)),
            address_info_cache_ttl: Duration::from_secs(env_parse(
                "ADDRESS_INFO_CACHE_TTL_SECS",
                604_800,
            )),
            cache_max_capacity: env_parse("CACHE_MAX_CAPACITY", 10_000),

            worker_concurrency: env_parse("WORKER_CONCURRENCY", 2),
            worker_poll_interval: Duration::from_millis(env_parse(
                "WORKER_POLL_INTERVAL_MS",
                500,
            )),
            max_blocks_per_job: env_parse("MAX_BLOCKS_PER_JOB", 5_000),
            max_tx_per_batch: env_parse("MAX_TX_PER_BATCH", 5_000),

            rate_limit_tokens_per_sec: env_parse("RATE_LIMIT_TOKENS_PER_SEC", 5),
            rate_limit_max_concurrent: env_parse("RATE_LIMIT_MAX_CONCURRENT", 1),

            job_retry_attempts: env_parse("JOB_RETRY_ATTEMPTS", 3),
            job_retry_backoff_base_ms: env_parse("JOB_RETRY_BACKOFF_BASE_MS", 2_000),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
