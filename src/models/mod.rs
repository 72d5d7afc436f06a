use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Inclusive block interval. `from_block <= to_block` always holds for
/// instances produced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub from_block: u64,
    pub to_block: u64,
}

impl BlockRange {
    pub fn new(from_block: u64, to_block: u64) -> Self {
        Self {
            from_block,
            to_block,
        }
    }

    /// Number of blocks in the interval, inclusive of both ends.
    pub fn len(&self) -> u64 {
        self.to_block - self.from_block + 1
    }

    pub fn contains(&self, block: u64) -> bool {
        self.from_block <= block && block <= self.to_block
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    /// SQL ORDER BY keyword for this order.
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// An external transaction owned by an indexed address. Rows are immutable
/// once written; uniqueness is `(address, hash)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    /// Owner index: the queried address this row belongs to, normalized.
    pub address: String,
    pub block_number: i64,
    #[serde(rename = "from")]
    pub from_address: String,
    #[serde(rename = "to")]
    pub to_address: Option<String>,
    /// u256 wei amount as a decimal string; never used for arithmetic.
    pub value: String,
    pub gas_price: String,
    pub gas_used: Option<i64>,
    pub gas: Option<i64>,
    /// 4-byte selector (0x-prefixed) or the explorer-provided signature.
    pub function_name: Option<String>,
    /// "1" for success, "0" for failure.
    pub receipt_status: String,
    pub contract_address: Option<String>,
    /// UTC epoch seconds as reported by the explorer.
    pub timestamp: i64,
}

/// Records that every transaction for `address` within
/// `[from_block, to_block]` has been durably persisted. Append-only; the
/// effective covered set is the union of all rows for an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub address: String,
    pub from_block: i64,
    pub to_block: i64,
    pub created_at: i64,
}

impl Coverage {
    pub fn range(&self) -> BlockRange {
        BlockRange::new(self.from_block as u64, self.to_block as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AddressInfo {
    pub address: String,
    pub is_contract: bool,
    /// Set iff `is_contract`.
    pub creation_block: Option<i64>,
    pub updated_at: i64,
}

/// Last observed balance snapshot for an address. Overwritten on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub address: String,
    /// Wei as a decimal string.
    pub balance: String,
    pub block_number: i64,
    pub updated_at: i64,
}

/// Where a response's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Database,
    Explorer,
    Provider,
    Cache,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    /// Count-based: true when the page came back full.
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetadata {
    /// Checksummed display form of the queried address.
    pub address: String,
    pub from_block: u64,
    pub to_block: u64,
    pub source: DataSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_processing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incomplete: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub transactions: Vec<Transaction>,
    pub from_cache: bool,
    pub pagination: Pagination,
    pub metadata: QueryMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub address: String,
    /// Decimal ETH string derived from `balance_wei` by pure string shifting.
    pub balance: String,
    pub balance_wei: String,
    pub block_number: u64,
    /// ISO-8601 UTC.
    pub last_updated: String,
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_age: Option<u64>,
    pub source: DataSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub address: String,
    pub count: i64,
    pub from_cache: bool,
    pub source: DataSource,
}
