use alloy_primitives::U256;
use thiserror::Error;

use super::decode::DecodeError;
use super::models::{SnapshotError, TransferAmount, TransferLogEntry, TransferRecord};
use crate::events::{TRANSFER_TOPIC, topic_to_address};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedLog {
    #[error("not a Transfer event")]
    NotTransfer,
    #[error("unexpected shape: {topics} topics with {data_len} data bytes")]
    UnexpectedShape { topics: usize, data_len: usize },
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl MalformedLog {
    pub fn diagnostic(&self, entry: &TransferLogEntry) -> SnapshotError {
        SnapshotError::new(
            SnapshotError::CLASSIFY_LOG,
            format!(
                "skipping log {}:{} from {}: {} (topics: {:?}, data: {:?})",
                entry.transaction_hash,
                entry.log_index,
                entry.contract_address,
                self,
                entry.topics,
                entry.data
            ),
        )
    }
}

/// Classifies a `Transfer` log as ERC-20 (3 topics, 32 data bytes) or
/// ERC-721 (4 topics, no data).
pub fn classify(entry: &TransferLogEntry) -> Result<TransferRecord, MalformedLog> {
    if entry.topics.first() != Some(&TRANSFER_TOPIC) {
        return Err(MalformedLog::NotTransfer);
    }

    let amount = match (entry.topics.len(), entry.data.len()) {
        (3, 32) => TransferAmount::Value(U256::from_be_slice(&entry.data)),
        (4, 0) => TransferAmount::TokenId(U256::from_be_bytes(entry.topics[3].0)),
        (topics, data_len) => return Err(MalformedLog::UnexpectedShape { topics, data_len }),
    };

    Ok(TransferRecord {
        from: topic_to_address(&entry.topics[1])?,
        to: topic_to_address(&entry.topics[2])?,
        amount,
        block_number: entry.block_number,
        block_hash: entry.block_hash,
        transaction_hash: entry.transaction_hash,
        log_index: entry.log_index,
    })
}
