//! End-to-end tests of the snapshot pipeline against an in-memory chain.

use alloy_primitives::{Address, B256, Bytes, U256};
use anyhow::{Result, bail};
use std::collections::HashMap;
use std::sync::Mutex;
use token_snapshot::contract::{AccountState, Erc20Info, Erc721Info, Erc721TokenInfo};
use token_snapshot::events::{TRANSFER_TOPIC, address_to_topic};
use token_snapshot::ledger::{BatchQueryParams, SnapshotError, TransferLogEntry};
use token_snapshot::snapshot::SnapshotBuilder;
use token_snapshot::sources::{
    AccountStateSource, LogSource, TransactionCountSource, TransferDirection, TransferFilter,
};

const ACCOUNT: Address = Address::new([0xac; 20]);
const OTHER: Address = Address::new([0x0f; 20]);
const COIN: Address = Address::new([0xaa; 20]);
const NFT: Address = Address::new([0xbb; 20]);
const ART: Address = Address::new([0xcd; 20]);

#[derive(Default)]
struct FakeChain {
    incoming: Vec<TransferLogEntry>,
    outgoing: Vec<TransferLogEntry>,
    fail_logs: bool,
    fail_transaction_count: bool,
    erc20_balances: HashMap<Address, U256>,
    nft_owners: HashMap<(Address, U256), Address>,
    queried: Mutex<Option<BatchQueryParams>>,
}

impl LogSource for FakeChain {
    async fn transfer_logs(&self, filter: TransferFilter) -> Result<Vec<TransferLogEntry>> {
        if self.fail_logs && filter.direction == TransferDirection::Outgoing {
            bail!("upstream unavailable");
        }
        Ok(match filter.direction {
            TransferDirection::Incoming => self.incoming.clone(),
            TransferDirection::Outgoing => self.outgoing.clone(),
        })
    }
}

impl AccountStateSource for FakeChain {
    async fn account_state(
        &self,
        account: Address,
        params: &BatchQueryParams,
    ) -> Result<AccountState> {
        *self.queried.lock().unwrap() = Some(params.clone());

        let erc20_infos = params
            .erc20_addresses
            .iter()
            .map(|contract| Erc20Info {
                name: Bytes::from_static(b"Coin"),
                symbol: Bytes::from_static(b"COIN"),
                decimals: U256::from(18u64),
                balance: self.erc20_balances.get(contract).copied().unwrap_or_default(),
            })
            .collect();

        let erc721_infos = params
            .erc721_addresses
            .iter()
            .map(|_| Erc721Info {
                name: Bytes::from_static(b"Kitties"),
                symbol: Bytes::from_static(b"KIT"),
            })
            .collect();

        let mut erc721_token_infos = Vec::new();
        for (index, contract) in params.erc721_addresses.iter().enumerate() {
            for token_id in params.token_ids_for(index) {
                let owner = self
                    .nft_owners
                    .get(&(*contract, *token_id))
                    .copied()
                    .unwrap_or(account);
                erc721_token_infos.push(Erc721TokenInfo {
                    owner: U256::from_be_bytes(owner.into_word().0),
                    tokenUri: Bytes::from(format!("ipfs://kitty/{token_id}").into_bytes()),
                });
            }
        }

        Ok(AccountState {
            balance: U256::from(5u64),
            block_number: 500,
            erc20_infos,
            erc721_infos,
            erc721_token_infos,
        })
    }
}

impl TransactionCountSource for FakeChain {
    async fn transaction_count(&self, _account: Address) -> Result<u64> {
        if self.fail_transaction_count {
            bail!("nonce lookup failed");
        }
        Ok(17)
    }
}

fn coin_log(
    from: Address,
    to: Address,
    value: u64,
    block: u64,
    log_index: u64,
) -> TransferLogEntry {
    TransferLogEntry {
        contract_address: COIN,
        topics: vec![TRANSFER_TOPIC, address_to_topic(from), address_to_topic(to)],
        data: Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec()),
        block_number: block,
        block_hash: B256::repeat_byte(block as u8),
        transaction_hash: B256::from(U256::from(block * 1000 + log_index).to_be_bytes::<32>()),
        log_index,
    }
}

fn nft_log(from: Address, to: Address, id: u64, block: u64, log_index: u64) -> TransferLogEntry {
    TransferLogEntry {
        contract_address: NFT,
        topics: vec![
            TRANSFER_TOPIC,
            address_to_topic(from),
            address_to_topic(to),
            B256::from(U256::from(id).to_be_bytes::<32>()),
        ],
        data: Bytes::new(),
        block_number: block,
        block_hash: B256::repeat_byte(block as u8),
        transaction_hash: B256::from(U256::from(block * 1000 + log_index).to_be_bytes::<32>()),
        log_index,
    }
}

fn at(contract: Address, mut log: TransferLogEntry) -> TransferLogEntry {
    log.contract_address = contract;
    log
}

#[tokio::test]
async fn erc20_balance_comes_from_query_not_logs() {
    let chain = FakeChain {
        incoming: vec![coin_log(OTHER, ACCOUNT, 100, 10, 0)],
        erc20_balances: HashMap::from([(COIN, U256::from(250u64))]),
        ..Default::default()
    };
    let builder = SnapshotBuilder::new(chain, 0);

    let snapshot = builder.build(ACCOUNT).await.unwrap();

    let coin = &snapshot.erc20_tokens[&COIN];
    assert_eq!(coin.balance, Some(U256::from(250u64)));
    assert_eq!(coin.name.as_deref(), Some("Coin"));
    assert_eq!(coin.decimals, Some(18));
    assert_eq!(coin.block_number, Some(500));
    assert_eq!(coin.history.len(), 1);
    assert_eq!(snapshot.balance, Some(U256::from(5u64)));
    assert_eq!(snapshot.block_number, Some(500));
    assert_eq!(snapshot.transaction_count, Some(17));
    assert!(snapshot.errors.is_empty());
}

#[tokio::test]
async fn nft_moved_before_query_is_discarded() {
    let chain = FakeChain {
        incoming: vec![nft_log(OTHER, ACCOUNT, 5, 10, 0), nft_log(OTHER, ACCOUNT, 6, 11, 0)],
        nft_owners: HashMap::from([((NFT, U256::from(5u64)), OTHER)]),
        ..Default::default()
    };
    let builder = SnapshotBuilder::new(chain, 0);

    let snapshot = builder.build(ACCOUNT).await.unwrap();

    let queried = builder.client().queried.lock().unwrap().clone().unwrap();
    assert_eq!(queried.token_ids, vec![U256::from(5u64), U256::from(6u64)]);
    assert_eq!(queried.counts.iter().sum::<usize>(), queried.token_ids.len());

    let nft = &snapshot.erc721_tokens[&NFT];
    assert_eq!(nft.tokens.len(), 1);
    assert_eq!(nft.tokens[0].token_id, U256::from(6u64));
    assert_eq!(nft.tokens[0].token_uri.as_deref(), Some("ipfs://kitty/6"));
    assert!(snapshot.errors.is_empty());
}

#[tokio::test]
async fn tokens_are_matched_across_several_collections() {
    let chain = FakeChain {
        incoming: vec![
            at(ART, nft_log(OTHER, ACCOUNT, 4, 3, 0)),
            nft_log(OTHER, ACCOUNT, 1, 4, 0),
            nft_log(OTHER, ACCOUNT, 2, 5, 0),
            nft_log(OTHER, ACCOUNT, 3, 6, 0),
            at(ART, nft_log(OTHER, ACCOUNT, 9, 7, 0)),
        ],
        nft_owners: HashMap::from([((NFT, U256::from(2u64)), OTHER)]),
        ..Default::default()
    };
    let builder = SnapshotBuilder::new(chain, 0);

    let snapshot = builder.build(ACCOUNT).await.unwrap();

    let queried = builder.client().queried.lock().unwrap().clone().unwrap();
    assert_eq!(queried.erc721_addresses, vec![NFT, ART]);
    assert_eq!(queried.counts, vec![3, 2]);
    assert_eq!(queried.counts.iter().sum::<usize>(), queried.token_ids.len());

    let held = |contract: Address| -> Vec<(U256, Option<String>)> {
        snapshot.erc721_tokens[&contract]
            .tokens
            .iter()
            .map(|token| (token.token_id, token.token_uri.clone()))
            .collect()
    };
    assert_eq!(
        held(NFT),
        vec![
            (U256::from(1u64), Some("ipfs://kitty/1".to_string())),
            (U256::from(3u64), Some("ipfs://kitty/3".to_string())),
        ]
    );
    assert_eq!(
        held(ART),
        vec![
            (U256::from(4u64), Some("ipfs://kitty/4".to_string())),
            (U256::from(9u64), Some("ipfs://kitty/9".to_string())),
        ]
    );
    assert!(snapshot.errors.is_empty());
}

#[tokio::test]
async fn sent_nft_is_not_queried() {
    let chain = FakeChain {
        incoming: vec![nft_log(OTHER, ACCOUNT, 5, 10, 0), nft_log(OTHER, ACCOUNT, 9, 12, 0)],
        outgoing: vec![nft_log(ACCOUNT, OTHER, 5, 20, 1)],
        ..Default::default()
    };
    let builder = SnapshotBuilder::new(chain, 0);

    let snapshot = builder.build(ACCOUNT).await.unwrap();

    let queried = builder.client().queried.lock().unwrap().clone().unwrap();
    assert_eq!(queried.erc721_addresses, vec![NFT]);
    assert_eq!(queried.counts, vec![1]);
    assert_eq!(queried.token_ids, vec![U256::from(9u64)]);
    assert_eq!(snapshot.erc721_tokens[&NFT].history.len(), 3);
}

#[tokio::test]
async fn self_transfer_seen_by_both_queries_counts_once() {
    let log = nft_log(ACCOUNT, ACCOUNT, 3, 8, 2);
    let chain = FakeChain {
        incoming: vec![log.clone()],
        outgoing: vec![log],
        ..Default::default()
    };
    let builder = SnapshotBuilder::new(chain, 0);

    let snapshot = builder.build(ACCOUNT).await.unwrap();

    assert_eq!(snapshot.erc721_tokens[&NFT].history.len(), 1);
    assert_eq!(snapshot.erc721_tokens[&NFT].tokens.len(), 1);
}

#[tokio::test]
async fn malformed_log_is_diagnosed_once() {
    let mut bad = coin_log(OTHER, ACCOUNT, 1, 3, 0);
    bad.data = Bytes::from(vec![0u8; 64]);
    let chain = FakeChain {
        incoming: vec![bad],
        ..Default::default()
    };
    let builder = SnapshotBuilder::new(chain, 0);

    let snapshot = builder.build(ACCOUNT).await.unwrap();

    assert!(snapshot.erc20_tokens.is_empty());
    assert!(snapshot.erc721_tokens.is_empty());
    assert_eq!(snapshot.errors.len(), 1);
    assert_eq!(snapshot.errors[0].operation, SnapshotError::CLASSIFY_LOG);
}

#[tokio::test]
async fn transaction_count_failure_is_not_fatal() {
    let chain = FakeChain {
        incoming: vec![coin_log(OTHER, ACCOUNT, 1, 3, 0)],
        fail_transaction_count: true,
        ..Default::default()
    };
    let builder = SnapshotBuilder::new(chain, 0);

    let snapshot = builder.build(ACCOUNT).await.unwrap();

    assert_eq!(snapshot.transaction_count, None);
    assert_eq!(snapshot.errors.len(), 1);
    assert_eq!(snapshot.errors[0].operation, SnapshotError::GET_TRANSACTION_COUNT);
    assert!(snapshot.errors[0].message.contains("nonce lookup failed"));
    assert!(snapshot.erc20_tokens.contains_key(&COIN));
}

#[tokio::test]
async fn log_query_failure_is_fatal() {
    let chain = FakeChain {
        incoming: vec![coin_log(OTHER, ACCOUNT, 1, 3, 0)],
        fail_logs: true,
        ..Default::default()
    };
    let builder = SnapshotBuilder::new(chain, 0);

    let err = builder.build(ACCOUNT).await.unwrap_err();

    assert!(format!("{err:#}").contains("upstream unavailable"));
    assert!(builder.client().queried.lock().unwrap().is_none());
}

#[tokio::test]
async fn empty_account_produces_empty_snapshot() {
    let builder = SnapshotBuilder::new(FakeChain::default(), 0);

    let snapshot = builder.build(ACCOUNT).await.unwrap();

    assert!(snapshot.erc20_tokens.is_empty());
    assert!(snapshot.erc721_tokens.is_empty());
    assert_eq!(snapshot.block_number, Some(500));
    let queried = builder.client().queried.lock().unwrap().clone().unwrap();
    assert_eq!(queried, BatchQueryParams::default());
}
