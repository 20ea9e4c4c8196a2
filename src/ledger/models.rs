use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Raw `Transfer` log as returned by the log source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLogEntry {
    pub contract_address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub block_hash: B256,
    pub transaction_hash: B256,
    pub log_index: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenStandard {
    Erc20,
    Erc721,
}

impl fmt::Display for TokenStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenStandard::Erc20 => write!(f, "ERC-20"),
            TokenStandard::Erc721 => write!(f, "ERC-721"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransferAmount {
    Value(#[serde(serialize_with = "serialize_decimal")] U256),
    TokenId(U256),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub from: Address,
    pub to: Address,
    #[serde(flatten)]
    pub amount: TransferAmount,
    pub block_number: u64,
    pub block_hash: B256,
    pub transaction_hash: B256,
    pub log_index: u64,
}

impl TransferRecord {
    pub fn standard(&self) -> TokenStandard {
        match self.amount {
            TransferAmount::Value(_) => TokenStandard::Erc20,
            TransferAmount::TokenId(_) => TokenStandard::Erc721,
        }
    }

    pub fn token_id(&self) -> Option<U256> {
        match self.amount {
            TransferAmount::TokenId(id) => Some(id),
            TransferAmount::Value(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20Ledger {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u64>,
    #[serde(serialize_with = "serialize_decimal_opt")]
    pub balance: Option<U256>,
    pub block_number: Option<u64>,
    pub history: Vec<TransferRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc721Ledger {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub tokens: Vec<OwnedToken>,
    pub block_number: Option<u64>,
    pub history: Vec<TransferRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedToken {
    pub token_id: U256,
    pub token_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TokenMetadata>,
}

/// JSON document behind an NFT's token URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

/// Non-fatal failure recorded while building a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotError {
    pub operation: String,
    pub message: String,
}

impl SnapshotError {
    pub const CLASSIFY_LOG: &'static str = "classifyLog";
    pub const DECODE_STRING: &'static str = "decodeString";
    pub const GET_TRANSACTION_COUNT: &'static str = "getTransactionCount";
    pub const FETCH_TOKEN_METADATA: &'static str = "fetchTokenMetadata";

    pub fn new(operation: &str, message: impl Into<String>) -> Self {
        Self {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub address: Address,
    pub block_number: Option<u64>,
    #[serde(serialize_with = "serialize_decimal_opt")]
    pub balance: Option<U256>,
    pub transaction_count: Option<u64>,
    pub erc20_tokens: BTreeMap<Address, Erc20Ledger>,
    pub erc721_tokens: BTreeMap<Address, Erc721Ledger>,
    pub errors: Vec<SnapshotError>,
}

impl AccountSnapshot {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            block_number: None,
            balance: None,
            transaction_count: None,
            erc20_tokens: BTreeMap::new(),
            erc721_tokens: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn without_history(mut self) -> Self {
        for ledger in self.erc20_tokens.values_mut() {
            ledger.history.clear();
        }
        for ledger in self.erc721_tokens.values_mut() {
            ledger.history.clear();
        }
        self
    }
}

fn serialize_decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn serialize_decimal_opt<S: Serializer>(
    value: &Option<U256>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.collect_str(value),
        None => serializer.serialize_none(),
    }
}
