use alloy_primitives::{Address, U256};

use super::builder::LedgerBook;

/// Flat, order-correlated arguments of the batched `getInfo` query.
///
/// `counts[i]` ids in `token_ids` belong to `erc721_addresses[i]`, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchQueryParams {
    pub erc20_addresses: Vec<Address>,
    pub erc721_addresses: Vec<Address>,
    pub counts: Vec<usize>,
    pub token_ids: Vec<U256>,
}

impl BatchQueryParams {
    pub fn from_ledgers(book: &LedgerBook) -> Self {
        let erc20_addresses: Vec<Address> = book.erc20.keys().copied().collect();
        let erc721_addresses: Vec<Address> = book.erc721.keys().copied().collect();

        let mut counts = Vec::with_capacity(erc721_addresses.len());
        let mut token_ids = Vec::new();
        for contract in &erc721_addresses {
            let owned = book.owned.get(contract);
            counts.push(owned.map_or(0, |ids| ids.len()));
            token_ids.extend(owned.into_iter().flatten().copied());
        }

        Self {
            erc20_addresses,
            erc721_addresses,
            counts,
            token_ids,
        }
    }

    pub fn total_tokens(&self) -> usize {
        self.counts.iter().sum()
    }

    /// The token ids queried for the ERC-721 contract at `index`.
    pub fn token_ids_for(&self, index: usize) -> &[U256] {
        let start: usize = self.counts[..index].iter().sum();
        &self.token_ids[start..start + self.counts[index]]
    }

    pub fn counts_as_u256(&self) -> Vec<U256> {
        self.counts.iter().map(|count| U256::from(*count)).collect()
    }
}
