pub mod config;
pub mod contract;
pub mod events;
pub mod ledger;
pub mod metadata;
pub mod output;
pub mod rpc;
pub mod snapshot;
pub mod sources;
