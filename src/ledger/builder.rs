use alloy_primitives::{Address, B256, U256};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

use super::classifier::classify;
use super::models::{
    Erc20Ledger, Erc721Ledger, SnapshotError, TokenStandard, TransferLogEntry, TransferRecord,
};

/// Per-contract ledgers discovered from the account's transfer logs.
///
/// Both maps iterate in address order; that order is the positional contract of
/// the batched query. `owned` holds the replayed owned-token set of every
/// ERC-721 contract.
#[derive(Debug, Default)]
pub struct LedgerBook {
    pub erc20: BTreeMap<Address, Erc20Ledger>,
    pub erc721: BTreeMap<Address, Erc721Ledger>,
    pub owned: BTreeMap<Address, BTreeSet<U256>>,
    pub diagnostics: Vec<SnapshotError>,
}

/// Builds ledgers from the "to" and "from" log streams.
///
/// A log delivered more than once (self-transfers match both queries) is
/// recorded once, keyed by `(transaction_hash, log_index)`.
pub fn build_ledgers(
    account: Address,
    incoming: &[TransferLogEntry],
    outgoing: &[TransferLogEntry],
) -> LedgerBook {
    let mut book = LedgerBook::default();
    let mut seen: HashSet<(B256, u64)> = HashSet::new();
    let mut duplicates = 0usize;

    for entry in incoming.iter().chain(outgoing) {
        if !seen.insert((entry.transaction_hash, entry.log_index)) {
            duplicates += 1;
            continue;
        }

        let record = match classify(entry) {
            Ok(record) => record,
            Err(e) => {
                book.diagnostics.push(e.diagnostic(entry));
                continue;
            }
        };

        match record.standard() {
            TokenStandard::Erc20 => book
                .erc20
                .entry(entry.contract_address)
                .or_default()
                .history
                .push(record),
            TokenStandard::Erc721 => book
                .erc721
                .entry(entry.contract_address)
                .or_default()
                .history
                .push(record),
        }
    }

    for ledger in book.erc20.values_mut() {
        sort_history(&mut ledger.history);
    }
    for (contract, ledger) in book.erc721.iter_mut() {
        sort_history(&mut ledger.history);
        book.owned
            .insert(*contract, replay_ownership(account, &ledger.history));
    }

    debug!(
        "Built {} ERC-20 and {} ERC-721 ledgers ({} duplicate logs, {} malformed)",
        book.erc20.len(),
        book.erc721.len(),
        duplicates,
        book.diagnostics.len()
    );

    book
}

/// Orders a history by block, then by position in the block. The sort is stable.
pub fn sort_history(history: &mut [TransferRecord]) {
    history.sort_by_key(|record| (record.block_number, record.log_index));
}

/// Replays an ordered ERC-721 history into the set of token ids `account` holds.
pub fn replay_ownership(account: Address, history: &[TransferRecord]) -> BTreeSet<U256> {
    let mut owned = BTreeSet::new();
    for record in history {
        let Some(token_id) = record.token_id() else {
            continue;
        };
        if record.to == account {
            owned.insert(token_id);
        } else if record.from == account {
            owned.remove(&token_id);
        }
    }
    owned
}
