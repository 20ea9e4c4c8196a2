use alloy_primitives::{Address, address};
use anyhow::{Context, Result};
use std::str::FromStr;

pub const DEFAULT_ACCOUNT_INFO_CONTRACT: Address =
    address!("EDaDe4c1191312abA34BB98951Ad21c290b282D3");
pub const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";
pub const DEFAULT_METADATA_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct Config {
    pub json_rpc_urls: Vec<String>,
    pub account_info_contract: Address,
    pub logs_from_block: u64,
    pub ipfs_gateway: String,
    pub metadata_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let urls = std::env::var("JSON_RPC_URLS")
            .or_else(|_| std::env::var("JSON_RPC_URL"))
            .context("JSON_RPC_URLS (or JSON_RPC_URL) must be set in .env")?;
        let json_rpc_urls = parse_url_list(&urls);
        if json_rpc_urls.is_empty() {
            anyhow::bail!("JSON_RPC_URLS does not contain any endpoint");
        }

        let account_info_contract = match std::env::var("ACCOUNT_INFO_CONTRACT") {
            Ok(value) => Address::from_str(value.trim())
                .context("Invalid ACCOUNT_INFO_CONTRACT format")?,
            Err(_) => DEFAULT_ACCOUNT_INFO_CONTRACT,
        };

        let logs_from_block = match std::env::var("LOGS_FROM_BLOCK") {
            Ok(value) => value
                .trim()
                .parse()
                .context("LOGS_FROM_BLOCK must be a block number")?,
            Err(_) => 0,
        };

        let ipfs_gateway =
            std::env::var("IPFS_GATEWAY").unwrap_or_else(|_| DEFAULT_IPFS_GATEWAY.to_string());

        let metadata_concurrency = match std::env::var("METADATA_CONCURRENCY") {
            Ok(value) => value
                .trim()
                .parse::<usize>()
                .context("METADATA_CONCURRENCY must be a positive integer")?
                .max(1),
            Err(_) => DEFAULT_METADATA_CONCURRENCY,
        };

        Ok(Config {
            json_rpc_urls,
            account_info_contract,
            logs_from_block,
            ipfs_gateway,
            metadata_concurrency,
        })
    }
}

fn parse_url_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}
