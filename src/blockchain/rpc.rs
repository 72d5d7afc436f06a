//! JSON-RPC reads against the chain node: block height, account balance,
//! account code. Transient failures are retried with exponential backoff;
//! deadlines come from `rpc_timeout`.

use std::time::Duration;

use alloy_primitives::U256;
use backon::{ExponentialBuilder, Retryable};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::config::Config;
use crate::error::ServiceError;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Clone)]
pub struct NodeRpcClient {
    http: reqwest::Client,
    url: String,
}

impl NodeRpcClient {
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(config.rpc_timeout)
            .build()
            .map_err(|e| ServiceError::Internal(format!("failed to build rpc client: {e}")))?;
        Ok(Self {
            http,
            url: config.rpc_url.clone(),
        })
    }

    fn retry_policy() -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(5))
            .with_max_times(3)
            .with_jitter()
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ServiceError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self.http.post(&self.url).json(&body).send().await?;

        if response.status().is_server_error() {
            return Err(ServiceError::UpstreamTransient(format!(
                "{method}: HTTP {}",
                response.status()
            )));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::UpstreamInvalid(format!("{method}: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(ServiceError::UpstreamTransient(format!(
                "{method}: rpc error {}: {}",
                err.code, err.message
            )));
        }

        parsed
            .result
            .ok_or_else(|| ServiceError::UpstreamInvalid(format!("{method}: missing result")))
    }

    async fn call_with_retry(&self, method: &str, params: Value) -> Result<Value, ServiceError> {
        (|| {
            let params = params.clone();
            async move { self.call(method, params).await }
        })
        .retry(&Self::retry_policy())
        .when(|e: &ServiceError| matches!(e, ServiceError::UpstreamTransient(_)))
        .await
        .map_err(|e| {
            error!(method, error = %e, "rpc call failed after retries");
            e
        })
    }

    /// Current chain head.
    pub async fn get_block_number(&self) -> Result<u64, ServiceError> {
        let result = self.call_with_retry("eth_blockNumber", json!([])).await?;
        parse_hex_u64(&result)
    }

    /// Balance at the latest block, in wei, as a decimal string.
    pub async fn get_balance(&self, address: &str) -> Result<String, ServiceError> {
        let result = self
            .call_with_retry("eth_getBalance", json!([address, "latest"]))
            .await?;
        let hex = as_hex_str(&result)?;
        let wei = U256::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|e| ServiceError::UpstreamInvalid(format!("eth_getBalance: {e}")))?;
        Ok(wei.to_string())
    }

    /// Account code at a block height, or at the latest block when `block`
    /// is `None`. Returns the raw hex payload; "0x" means no code.
    pub async fn get_code(&self, address: &str, block: Option<u64>) -> Result<String, ServiceError> {
        let tag = match block {
            Some(b) => format!("0x{b:x}"),
            None => "latest".to_string(),
        };
        let result = self.call("eth_getCode", json!([address, tag])).await?;
        Ok(as_hex_str(&result)?.to_string())
    }
}

/// Whether a `getCode` payload represents deployed code.
pub fn has_code(code: &str) -> bool {
    !code.is_empty() && code != "0x" && code != "0X"
}

fn as_hex_str(value: &Value) -> Result<&str, ServiceError> {
    value
        .as_str()
        .ok_or_else(|| ServiceError::UpstreamInvalid(format!("expected hex string, got {value}")))
}

fn parse_hex_u64(value: &Value) -> Result<u64, ServiceError> {
    let hex = as_hex_str(value)?;
    u64::from_str_radix(hex.trim_start_matches("0x"), 16)
        .map_err(|e| ServiceError::UpstreamInvalid(format!("bad hex quantity {hex}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_quantity_parsing() {
        assert_eq!(parse_hex_u64(&json!("0x10")).unwrap(), 16);
        assert_eq!(parse_hex_u64(&json!("0x0")).unwrap(), 0);
        assert!(parse_hex_u64(&json!("not-hex")).is_err());
        assert!(parse_hex_u64(&json!(42)).is_err());
    }

    #[test]
    fn code_detection() {
        assert!(!has_code("0x"));
        assert!(!has_code(""));
        assert!(has_code("0x6080604052"));
    }
}
