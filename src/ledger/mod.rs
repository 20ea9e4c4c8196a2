pub mod builder;
pub mod classifier;
pub mod decode;
pub mod merger;
pub mod models;
pub mod params;

pub use builder::{LedgerBook, build_ledgers, replay_ownership, sort_history};
pub use classifier::{MalformedLog, classify};
pub use decode::{DecodeError, decode_owner, decode_string};
pub use merger::merge_account_state;
pub use models::{
    AccountSnapshot, Erc20Ledger, Erc721Ledger, OwnedToken, SnapshotError, TokenMetadata,
    TokenStandard, TransferAmount, TransferLogEntry, TransferRecord,
};
pub use params::BatchQueryParams;
