use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{info, warn};

use crate::ledger::{
    AccountSnapshot, BatchQueryParams, SnapshotError, build_ledgers, merge_account_state,
};
use crate::sources::{AccountStateSource, LogSource, TransactionCountSource, TransferFilter};

/// Builds point-in-time token snapshots of accounts from transfer logs and one
/// batched `getInfo` read.
pub struct SnapshotBuilder<C> {
    client: C,
    from_block: u64,
}

impl<C> SnapshotBuilder<C>
where
    C: LogSource + AccountStateSource + TransactionCountSource,
{
    pub fn new(client: C, from_block: u64) -> Self {
        SnapshotBuilder { client, from_block }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn build(&self, account: Address) -> Result<AccountSnapshot> {
        let start = Instant::now();
        info!("Building token snapshot for {}", account);

        // Both streams are required: a partial history would corrupt ownership replay.
        let (incoming, outgoing) = tokio::try_join!(
            self.client
                .transfer_logs(TransferFilter::incoming(account, self.from_block)),
            self.client
                .transfer_logs(TransferFilter::outgoing(account, self.from_block)),
        )
        .context("Failed to fetch transfer logs")?;
        info!(
            "Received {} incoming and {} outgoing transfer logs",
            incoming.len(),
            outgoing.len()
        );

        let book = build_ledgers(account, &incoming, &outgoing);
        let params = BatchQueryParams::from_ledgers(&book);
        info!(
            "Querying {} ERC-20 contracts, {} ERC-721 contracts and {} token ids",
            params.erc20_addresses.len(),
            params.erc721_addresses.len(),
            params.token_ids.len()
        );

        let state = self
            .client
            .account_state(account, &params)
            .await
            .context("Failed to query account state")?;

        let (transaction_count, merged) = tokio::join!(
            self.client.transaction_count(account),
            async { merge_account_state(account, book, &params, state) },
        );

        let mut snapshot = merged?;
        match transaction_count {
            Ok(count) => snapshot.transaction_count = Some(count),
            Err(e) => {
                warn!("Failed to fetch transaction count for {}: {:#}", account, e);
                snapshot.errors.push(SnapshotError::new(
                    SnapshotError::GET_TRANSACTION_COUNT,
                    format!("{e:#}"),
                ));
            }
        }

        info!(
            "Snapshot of {} at block {:?} built in {:?} ({} errors)",
            account,
            snapshot.block_number,
            start.elapsed(),
            snapshot.errors.len()
        );

        Ok(snapshot)
    }
}
