use alloy::sol;
use alloy::sol_types::SolEvent;
use alloy_primitives::{Address, B256};

use crate::ledger::decode::DecodeError;

sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);
}

/// `keccak256("Transfer(address,address,uint256)")`, shared by ERC-20 and ERC-721.
pub const TRANSFER_TOPIC: B256 = Transfer::SIGNATURE_HASH;

pub fn address_to_topic(address: Address) -> B256 {
    address.into_word()
}

/// Decodes an indexed address topic. The upper 12 bytes must be zero.
pub fn topic_to_address(topic: &B256) -> Result<Address, DecodeError> {
    if topic[..12].iter().any(|byte| *byte != 0) {
        return Err(DecodeError::AddressPadding(*topic));
    }
    Ok(Address::from_word(*topic))
}
