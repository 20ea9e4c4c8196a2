//! Contracts of the collaborators the snapshot pipeline reads from.
//!
//! [`crate::rpc::RpcClient`] implements the chain-facing traits over JSON-RPC and
//! [`crate::metadata::HttpMetadataSource`] implements [`MetadataSource`]; tests
//! substitute in-memory fakes.

use alloy_primitives::Address;
use anyhow::Result;
use std::future::Future;

use crate::contract::AccountState;
use crate::ledger::{BatchQueryParams, TokenMetadata, TransferLogEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferDirection {
    /// Logs whose `to` topic is the account.
    Incoming,
    /// Logs whose `from` topic is the account.
    Outgoing,
}

/// `Transfer` logs touching `account` in one direction, from `from_block` to the chain head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferFilter {
    pub account: Address,
    pub direction: TransferDirection,
    pub from_block: u64,
}

impl TransferFilter {
    pub fn incoming(account: Address, from_block: u64) -> Self {
        Self {
            account,
            direction: TransferDirection::Incoming,
            from_block,
        }
    }

    pub fn outgoing(account: Address, from_block: u64) -> Self {
        Self {
            account,
            direction: TransferDirection::Outgoing,
            from_block,
        }
    }
}

/// Block order of the returned entries is not guaranteed.
pub trait LogSource {
    fn transfer_logs(
        &self,
        filter: TransferFilter,
    ) -> impl Future<Output = Result<Vec<TransferLogEntry>>> + Send;
}

/// The batched, single-block `getInfo` read.
pub trait AccountStateSource {
    fn account_state(
        &self,
        account: Address,
        params: &BatchQueryParams,
    ) -> impl Future<Output = Result<AccountState>> + Send;
}

pub trait TransactionCountSource {
    fn transaction_count(&self, account: Address) -> impl Future<Output = Result<u64>> + Send;
}

pub trait MetadataSource {
    fn token_metadata(&self, token_uri: &str)
    -> impl Future<Output = Result<TokenMetadata>> + Send;
}
