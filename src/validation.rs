use std::str::FromStr;

use alloy_primitives::Address;
use thiserror::Error;

use crate::models::SortOrder;

pub const MAX_PAGE_LIMIT: u32 = 1000;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    #[error("Invalid block range: {0}")]
    InvalidBlockRange(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// A validated account address carrying both storage and display forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAddress {
    /// Lowercase hex with 0x prefix; every storage key and index uses this.
    pub normalized: String,
    /// EIP-55 checksummed form, kept for response metadata.
    pub checksummed: String,
}

/// Validate an address string: 0x prefix followed by exactly 40 hex digits.
/// Case is ignored on input; the normalized form is always lowercase.
pub fn validate_address(address: &str) -> Result<ValidatedAddress, ValidationError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingParameter("address".to_string()));
    }

    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| ValidationError::InvalidAddress(address.to_string()))?;

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidAddress(address.to_string()));
    }

    let parsed = Address::from_str(trimmed)
        .map_err(|_| ValidationError::InvalidAddress(address.to_string()))?;

    Ok(ValidatedAddress {
        normalized: format!("{parsed:#x}"),
        checksummed: parsed.to_checksum(None),
    })
}

/// Validate an inclusive block range. Both bounds are optional; when both are
/// present `from <= to` must hold.
pub fn validate_block_range(
    from_block: Option<u64>,
    to_block: Option<u64>,
) -> Result<(), ValidationError> {
    if let (Some(from), Some(to)) = (from_block, to_block) {
        if from > to {
            return Err(ValidationError::InvalidBlockRange(format!(
                "from_block {from} is greater than to_block {to}"
            )));
        }
    }
    Ok(())
}

/// Validate pagination parameters: `1 <= page`, `1 <= limit <= 1000`.
pub fn validate_pagination(page: u32, limit: u32) -> Result<(), ValidationError> {
    if page < 1 {
        return Err(ValidationError::InvalidParameter(
            "page must be at least 1".to_string(),
        ));
    }
    if limit < 1 {
        return Err(ValidationError::InvalidParameter(
            "limit must be at least 1".to_string(),
        ));
    }
    if limit > MAX_PAGE_LIMIT {
        return Err(ValidationError::InvalidParameter(format!(
            "limit cannot exceed {MAX_PAGE_LIMIT}"
        )));
    }
    Ok(())
}

/// Parse a sort order string; `asc` and `desc` are the only accepted values.
pub fn validate_order(order: &str) -> Result<SortOrder, ValidationError> {
    match order.to_ascii_lowercase().as_str() {
        "asc" => Ok(SortOrder::Asc),
        "desc" => Ok(SortOrder::Desc),
        other => Err(ValidationError::InvalidParameter(format!(
            "order must be 'asc' or 'desc', got '{other}'"
        ))),
    }
}
