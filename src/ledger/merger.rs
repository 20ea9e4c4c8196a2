use alloy_primitives::{Address, Bytes};
use anyhow::{Result, bail};
use tracing::debug;

use super::builder::LedgerBook;
use super::decode::{decode_owner, decode_string};
use super::models::{AccountSnapshot, OwnedToken, SnapshotError};
use super::params::BatchQueryParams;
use crate::contract::AccountState;

/// Folds a batched query response back onto the ledgers that produced `params`.
///
/// Response arrays must be positionally aligned with `params`; a length
/// mismatch is fatal. NFT records whose on-chain owner is not `account` are
/// dropped. Undecodable strings become `None` plus a diagnostic.
pub fn merge_account_state(
    account: Address,
    book: LedgerBook,
    params: &BatchQueryParams,
    state: AccountState,
) -> Result<AccountSnapshot> {
    check_alignment(params, &state)?;

    let LedgerBook {
        mut erc20,
        mut erc721,
        diagnostics,
        ..
    } = book;

    let mut snapshot = AccountSnapshot::new(account);
    snapshot.balance = Some(state.balance);
    snapshot.block_number = Some(state.block_number);
    snapshot.errors = diagnostics;

    for (contract, info) in params.erc20_addresses.iter().zip(state.erc20_infos) {
        let Some(ledger) = erc20.get_mut(contract) else {
            bail!("no ERC-20 ledger for queried contract {contract}");
        };
        ledger.name = decode_field(*contract, "name", &info.name, &mut snapshot.errors);
        ledger.symbol = decode_field(*contract, "symbol", &info.symbol, &mut snapshot.errors);
        ledger.decimals = u64::try_from(info.decimals).ok();
        ledger.balance = Some(info.balance);
        ledger.block_number = Some(state.block_number);
    }

    let mut token_infos = state.erc721_token_infos.into_iter();
    let mut dropped = 0usize;
    for (index, (contract, info)) in params
        .erc721_addresses
        .iter()
        .zip(state.erc721_infos)
        .enumerate()
    {
        let Some(ledger) = erc721.get_mut(contract) else {
            bail!("no ERC-721 ledger for queried contract {contract}");
        };
        ledger.name = decode_field(*contract, "name", &info.name, &mut snapshot.errors);
        ledger.symbol = decode_field(*contract, "symbol", &info.symbol, &mut snapshot.errors);
        ledger.block_number = Some(state.block_number);

        let token_ids = params.token_ids_for(index);
        let consumed = token_infos.by_ref().take(token_ids.len());
        for (token_id, token_info) in token_ids.iter().zip(consumed) {
            if decode_owner(token_info.owner) != Some(account) {
                dropped += 1;
                continue;
            }
            let token_uri =
                decode_field(*contract, "tokenUri", &token_info.tokenUri, &mut snapshot.errors);
            ledger.tokens.push(OwnedToken {
                token_id: *token_id,
                token_uri,
                metadata: None,
            });
        }
    }

    if dropped > 0 {
        debug!("Dropped {} NFTs no longer owned by {}", dropped, account);
    }

    snapshot.erc20_tokens = erc20;
    snapshot.erc721_tokens = erc721;
    Ok(snapshot)
}

fn check_alignment(params: &BatchQueryParams, state: &AccountState) -> Result<()> {
    if state.erc20_infos.len() != params.erc20_addresses.len() {
        bail!(
            "getInfo returned {} ERC-20 infos for {} contracts",
            state.erc20_infos.len(),
            params.erc20_addresses.len()
        );
    }
    if state.erc721_infos.len() != params.erc721_addresses.len() {
        bail!(
            "getInfo returned {} ERC-721 infos for {} contracts",
            state.erc721_infos.len(),
            params.erc721_addresses.len()
        );
    }
    if state.erc721_token_infos.len() != params.total_tokens() {
        bail!(
            "getInfo returned {} token infos for {} token ids",
            state.erc721_token_infos.len(),
            params.total_tokens()
        );
    }
    Ok(())
}

fn decode_field(
    contract: Address,
    field: &str,
    data: &Bytes,
    errors: &mut Vec<SnapshotError>,
) -> Option<String> {
    match decode_string(data) {
        Ok(value) => value,
        Err(e) => {
            errors.push(SnapshotError::new(
                SnapshotError::DECODE_STRING,
                format!("{contract} {field}: {e} (data: {data:?})"),
            ));
            None
        }
    }
}
