pub mod explorer;
pub mod rate_limiter;
pub mod resolver;
pub mod rpc;

// Re-exports for convenience
pub use explorer::{ExplorerClient, TxlistEntry};
pub use rate_limiter::UpstreamRateLimiter;
pub use resolver::AddressResolver;
pub use rpc::NodeRpcClient;
