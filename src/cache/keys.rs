//! Cache key generation. Keys are structured values; the Display form is the
//! canonical string layout shared with operational tooling.

use std::fmt;

use crate::models::SortOrder;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A paginated transaction query result.
    TxQuery {
        address: String,
        from_block: u64,
        to_block: u64,
        page: u32,
        limit: u32,
        order: SortOrder,
    },
    /// Stored transaction count for an address.
    TxCount(String),
    /// Balance snapshot for an address.
    Balance(String),
    /// Resolved address info for an address.
    AddressInfo(String),
}

impl CacheKey {
    pub fn tx_query(
        address: &str,
        from_block: u64,
        to_block: u64,
        page: u32,
        limit: u32,
        order: SortOrder,
    ) -> Self {
        Self::TxQuery {
            address: address.to_string(),
            from_block,
            to_block,
            page,
            limit,
            order,
        }
    }

    pub fn tx_count(address: &str) -> Self {
        Self::TxCount(address.to_string())
    }

    pub fn balance(address: &str) -> Self {
        Self::Balance(address.to_string())
    }

    pub fn address_info(address: &str) -> Self {
        Self::AddressInfo(address.to_string())
    }

    /// The owning address, for per-address invalidation.
    pub fn address(&self) -> &str {
        match self {
            Self::TxQuery { address, .. } => address,
            Self::TxCount(address) => address,
            Self::Balance(address) => address,
            Self::AddressInfo(address) => address,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TxQuery {
                address,
                from_block,
                to_block,
                page,
                limit,
                order,
            } => write!(
                f,
                "blockchain:tx:paginated:{address}:{from_block}:{to_block}:{page}:{limit}:{}",
                order.as_str()
            ),
            Self::TxCount(address) => write!(f, "blockchain:txcount:{address}"),
            Self::Balance(address) => write!(f, "blockchain:balance:{address}"),
            Self::AddressInfo(address) => write!(f, "blockchain:address_info:{address}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

    #[test]
    fn display_layouts() {
        let key = CacheKey::tx_query(ADDR, 100, 200, 1, 50, SortOrder::Asc);
        assert_eq!(
            key.to_string(),
            format!("blockchain:tx:paginated:{ADDR}:100:200:1:50:asc")
        );
        assert_eq!(
            CacheKey::balance(ADDR).to_string(),
            format!("blockchain:balance:{ADDR}")
        );
        assert_eq!(
            CacheKey::tx_count(ADDR).to_string(),
            format!("blockchain:txcount:{ADDR}")
        );
        assert_eq!(
            CacheKey::address_info(ADDR).to_string(),
            format!("blockchain:address_info:{ADDR}")
        );
    }

    #[test]
    fn distinct_params_are_distinct_keys() {
        let a = CacheKey::tx_query(ADDR, 100, 200, 1, 50, SortOrder::Asc);
        let b = CacheKey::tx_query(ADDR, 100, 200, 2, 50, SortOrder::Asc);
        let c = CacheKey::tx_query(ADDR, 100, 200, 1, 50, SortOrder::Desc);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.address(), ADDR);
    }
}
