//! Etherscan-family explorer adapter. The wire shape is parsed strictly into
//! `TxlistEntry` here at the boundary; nothing downstream ever sees an
//! unparsed record. Every call funnels through the process-wide rate limiter.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::rate_limiter::UpstreamRateLimiter;
use crate::config::Config;
use crate::error::ServiceError;
use crate::models::{SortOrder, Transaction};

#[derive(Debug, Deserialize)]
struct ExplorerEnvelope {
    status: String,
    message: String,
    result: Value,
}

/// One row of the explorer's `account/txlist` response. All fields arrive as
/// strings; numeric fields are decimal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxlistEntry {
    pub block_number: String,
    pub time_stamp: String,
    pub hash: String,
    pub from: String,
    #[serde(default)]
    pub to: String,
    pub value: String,
    #[serde(default)]
    pub gas: String,
    pub gas_price: String,
    #[serde(default)]
    pub gas_used: String,
    #[serde(default)]
    pub is_error: Option<String>,
    #[serde(rename = "txreceipt_status", default)]
    pub txreceipt_status: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub function_name: Option<String>,
}

impl TxlistEntry {
    /// Convert a wire row into the stored model, owned by `address`.
    /// `address` must already be normalized.
    pub fn into_transaction(self, address: &str) -> Result<Transaction, ServiceError> {
        let block_number: i64 = self.block_number.parse().map_err(|_| {
            ServiceError::UpstreamInvalid(format!("bad blockNumber {:?}", self.block_number))
        })?;
        let timestamp: i64 = self.time_stamp.parse().map_err(|_| {
            ServiceError::UpstreamInvalid(format!("bad timeStamp {:?}", self.time_stamp))
        })?;

        // txreceipt_status is authoritative when the explorer sends it; for
        // pre-Byzantium rows only isError exists.
        let receipt_status = match self.txreceipt_status.as_deref() {
            Some(rs) if !rs.is_empty() => rs.to_string(),
            _ => match self.is_error.as_deref() {
                None | Some("0") | Some("") => "1".to_string(),
                Some(_) => "0".to_string(),
            },
        };

        // Prefer the explorer's decoded signature; otherwise the 4-byte
        // selector from calldata identifies the function.
        let function_name = match self.function_name.as_deref() {
            Some(name) if !name.is_empty() => Some(name.to_string()),
            _ => match self.input.as_deref() {
                Some(input) if input != "0x" && input.len() >= 10 => {
                    Some(input[..10].to_lowercase())
                }
                _ => None,
            },
        };

        Ok(Transaction {
            hash: self.hash.to_lowercase(),
            address: address.to_string(),
            block_number,
            from_address: self.from.to_lowercase(),
            to_address: non_empty(self.to.to_lowercase()),
            value: self.value,
            gas_price: self.gas_price,
            gas_used: parse_opt_i64(&self.gas_used),
            gas: parse_opt_i64(&self.gas),
            function_name,
            receipt_status,
            contract_address: self
                .contract_address
                .map(|c| c.to_lowercase())
                .and_then(non_empty),
            timestamp,
        })
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn parse_opt_i64(s: &str) -> Option<i64> {
    if s.is_empty() {
        None
    } else {
        s.parse().ok()
    }
}

/// Classify an explorer "NOTOK" result payload into the error taxonomy. The
/// explorer refuses too-large ranges with a query-timeout message, which is a
/// distinct, recoverable condition for callers.
fn classify_failure(message: &str, detail: &str) -> ServiceError {
    let combined = format!("{message}: {detail}").to_lowercase();
    if combined.contains("timeout") || combined.contains("window is too large") {
        ServiceError::UpstreamTimeout(format!("explorer: {message}: {detail}"))
    } else if combined.contains("rate limit") {
        ServiceError::UpstreamTransient(format!("explorer: {message}: {detail}"))
    } else {
        ServiceError::UpstreamInvalid(format!("explorer: {message}: {detail}"))
    }
}

#[derive(Clone)]
pub struct ExplorerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    limiter: Arc<UpstreamRateLimiter>,
}

impl ExplorerClient {
    pub fn new(config: &Config, limiter: Arc<UpstreamRateLimiter>) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(config.explorer_timeout)
            .build()
            .map_err(|e| ServiceError::Internal(format!("failed to build explorer client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.explorer_api_url.clone(),
            api_key: config.explorer_api_key.clone(),
            limiter,
        })
    }

    /// Paginated transaction listing for an address over an inclusive block
    /// range, ordered by block then position. Returns at most `offset` rows.
    pub async fn txlist(
        &self,
        address: &str,
        start_block: u64,
        end_block: u64,
        page: u32,
        offset: u32,
        sort: SortOrder,
    ) -> Result<Vec<TxlistEntry>, ServiceError> {
        let _permit = self.limiter.acquire().await?;

        debug!(address, start_block, end_block, page, offset, "explorer txlist");

        let start = start_block.to_string();
        let end = end_block.to_string();
        let page_s = page.to_string();
        let offset_s = offset.to_string();
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address),
                ("startblock", start.as_str()),
                ("endblock", end.as_str()),
                ("page", page_s.as_str()),
                ("offset", offset_s.as_str()),
                ("sort", sort.as_str()),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if response.status().is_server_error() {
            return Err(ServiceError::UpstreamTransient(format!(
                "explorer: HTTP {}",
                response.status()
            )));
        }

        let envelope: ExplorerEnvelope = response
            .json()
            .await
            .map_err(|e| ServiceError::UpstreamInvalid(format!("explorer: {e}")))?;

        if envelope.status == "1" {
            return serde_json::from_value(envelope.result)
                .map_err(|e| ServiceError::UpstreamInvalid(format!("explorer txlist: {e}")));
        }

        // status == "0": either a benign empty result or a refusal.
        if envelope.message.eq_ignore_ascii_case("no transactions found") {
            return Ok(Vec::new());
        }
        let detail = match &envelope.result {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Err(classify_failure(&envelope.message, &detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

    fn sample_entry() -> TxlistEntry {
        serde_json::from_value(serde_json::json!({
            "blockNumber": "4730207",
            "timeStamp": "1513240363",
            "hash": "0xE2B8C145F1C9D1B3D2B9E1F55BD27CD9E7B0C3EF8CFF89F1DE4BF6234A2A7E31",
            "from": "0x642AE78FAfBB8032Da552D619aD43F1D81E4DD7C",
            "to": "0x4E83362442B8d1beC281594CEA3050c8EB01311C",
            "value": "14458225000000000",
            "gas": "60000",
            "gasPrice": "21000000000",
            "gasUsed": "21000",
            "isError": "0",
            "txreceipt_status": "1",
            "input": "0xa9059cbb000000000000000000000000",
            "contractAddress": "",
            "functionName": "transfer(address _to, uint256 _value)"
        }))
        .unwrap()
    }

    #[test]
    fn maps_wire_row_to_transaction() {
        let tx = sample_entry().into_transaction(OWNER).unwrap();
        assert_eq!(tx.block_number, 4_730_207);
        assert_eq!(tx.timestamp, 1_513_240_363);
        assert_eq!(tx.address, OWNER);
        assert_eq!(tx.receipt_status, "1");
        assert_eq!(tx.from_address, "0x642ae78fafbb8032da552d619ad43f1d81e4dd7c");
        assert_eq!(
            tx.to_address.as_deref(),
            Some("0x4e83362442b8d1bec281594cea3050c8eb01311c")
        );
        assert_eq!(tx.contract_address, None);
        assert_eq!(tx.gas_used, Some(21_000));
        assert_eq!(
            tx.function_name.as_deref(),
            Some("transfer(address _to, uint256 _value)")
        );
        // Hashes normalize to lowercase like addresses do.
        assert!(tx.hash.chars().all(|c| !c.is_ascii_uppercase()));
    }

    #[test]
    fn receipt_status_falls_back_to_is_error() {
        let mut entry = sample_entry();
        entry.txreceipt_status = None;
        entry.is_error = Some("0".to_string());
        assert_eq!(entry.clone().into_transaction(OWNER).unwrap().receipt_status, "1");

        entry.is_error = Some("1".to_string());
        assert_eq!(entry.clone().into_transaction(OWNER).unwrap().receipt_status, "0");

        // Pre-receipt rows with neither signal count as successful.
        entry.is_error = None;
        assert_eq!(entry.into_transaction(OWNER).unwrap().receipt_status, "1");
    }

    #[test]
    fn function_selector_from_input() {
        let mut entry = sample_entry();
        entry.function_name = None;
        let tx = entry.clone().into_transaction(OWNER).unwrap();
        assert_eq!(tx.function_name.as_deref(), Some("0xa9059cbb"));

        entry.input = Some("0x".to_string());
        let tx = entry.clone().into_transaction(OWNER).unwrap();
        assert_eq!(tx.function_name, None);

        entry.input = None;
        let tx = entry.into_transaction(OWNER).unwrap();
        assert_eq!(tx.function_name, None);
    }

    #[test]
    fn rejects_malformed_numbers() {
        let mut entry = sample_entry();
        entry.block_number = "not-a-number".to_string();
        assert!(matches!(
            entry.into_transaction(OWNER),
            Err(ServiceError::UpstreamInvalid(_))
        ));
    }

    #[test]
    fn failure_classification() {
        assert!(matches!(
            classify_failure("NOTOK", "Query Timeout occured"),
            ServiceError::UpstreamTimeout(_)
        ));
        assert!(matches!(
            classify_failure("NOTOK", "Result window is too large"),
            ServiceError::UpstreamTimeout(_)
        ));
        assert!(matches!(
            classify_failure("NOTOK", "Max rate limit reached"),
            ServiceError::UpstreamTransient(_)
        ));
        assert!(matches!(
            classify_failure("NOTOK", "Invalid API Key"),
            ServiceError::UpstreamInvalid(_)
        ));
    }
}
