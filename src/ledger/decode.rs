use alloy_primitives::{Address, B256, U256};
use thiserror::Error;

use crate::events::topic_to_address;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("address word has non-zero padding: {0}")]
    AddressPadding(B256),
    #[error("bytes32 string is missing a null terminator")]
    MissingNullTerminator,
    #[error("invalid utf-8 string: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Decodes a `name()`/`symbol()` style payload.
///
/// Empty input and all-zero `bytes32` values decode to `None`. Exactly 32 bytes
/// are read as a null-padded `bytes32` short string, anything else as UTF-8.
pub fn decode_string(data: &[u8]) -> Result<Option<String>, DecodeError> {
    if data.is_empty() {
        return Ok(None);
    }

    let text = if data.len() == 32 {
        if data[31] != 0 {
            return Err(DecodeError::MissingNullTerminator);
        }
        let end = data.iter().position(|byte| *byte == 0).unwrap_or(data.len());
        std::str::from_utf8(&data[..end])?
    } else {
        std::str::from_utf8(data)?
    };

    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(text.to_string()))
}

/// Interprets a `uint256` owner word as an address, `None` if it does not fit in 20 bytes.
pub fn decode_owner(owner: U256) -> Option<Address> {
    topic_to_address(&B256::from(owner.to_be_bytes::<32>())).ok()
}
