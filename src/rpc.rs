use alloy::providers::fillers::FillProvider;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use regex::Regex;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::timeout;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

use crate::contract::{AccountInfo, AccountState};
use crate::events::{TRANSFER_TOPIC, address_to_topic};
use crate::ledger::{BatchQueryParams, TransferLogEntry};
use crate::sources::{
    AccountStateSource, LogSource, TransactionCountSource, TransferDirection, TransferFilter,
};

type AlloyFullProvider = FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::Identity,
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::GasFiller,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::BlobGasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::NonceFiller,
                    alloy::providers::fillers::ChainIdFiller,
                >,
            >,
        >,
    >,
    alloy::providers::RootProvider,
>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120); // 2 minutes timeout per request
const MAX_RESULTS_ERROR: &str = "exceeds max results";

#[derive(Clone)]
pub struct RpcClient {
    providers: Vec<AlloyFullProvider>,
    urls: Vec<String>,
    current_provider: Arc<AtomicUsize>,
    max_retries: usize,
    account_info_contract: Address,
}

impl RpcClient {
    pub fn new(rpc_urls: &[String], account_info_contract: Address) -> Result<Self> {
        if rpc_urls.is_empty() {
            return Err(anyhow::anyhow!("At least one RPC URL must be provided"));
        }

        let mut providers = Vec::new();
        for url in rpc_urls {
            let parsed_url = url
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid RPC URL: {}", url))?;
            let provider: AlloyFullProvider = ProviderBuilder::new().connect_http(parsed_url);
            providers.push(provider);
        }

        Ok(RpcClient {
            providers,
            urls: rpc_urls.to_vec(),
            current_provider: Arc::new(AtomicUsize::new(0)),
            max_retries: 5,
            account_info_contract,
        })
    }

    fn get_provider(&self) -> &AlloyFullProvider {
        let index = self.current_provider.load(Ordering::Relaxed) % self.providers.len();
        &self.providers[index]
    }

    pub fn get_current_url(&self) -> &str {
        let index = self.current_provider.load(Ordering::Relaxed) % self.urls.len();
        &self.urls[index]
    }

    pub fn rotate_provider(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.providers.len();
        self.current_provider.store(next, Ordering::Relaxed);

        if self.providers.len() > 1 {
            debug!("Rotating to RPC provider #{}", next);
        }
    }

    fn get_retry_strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(100)
            .factor(2)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.max_retries)
    }

    fn handle_error(&self, error_str: &str) {
        let current_url = self.get_current_url();
        warn!(
            "RPC error on {}: {}, rotating provider",
            current_url, error_str
        );
        self.rotate_provider();
    }

    fn handle_timeout(&self) -> anyhow::Error {
        let current_url = self.get_current_url();
        warn!(
            "Request timeout after {} seconds on {}, rotating provider",
            REQUEST_TIMEOUT.as_secs(),
            current_url
        );
        self.rotate_provider();
        anyhow::anyhow!(
            "Request timeout after {} seconds",
            REQUEST_TIMEOUT.as_secs()
        )
    }

    /// Runs `action` against the current provider with timeout, retry and
    /// rotation. Range-limit rejections are returned without retrying so the
    /// caller can split the range.
    async fn request<T, E, F, Fut>(&self, action: F) -> Result<T>
    where
        F: Fn(AlloyFullProvider) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        RetryIf::start(
            self.get_retry_strategy(),
            || {
                let future = action(self.get_provider().clone());
                async move {
                    match timeout(REQUEST_TIMEOUT, future).await {
                        Ok(Ok(result)) => Ok(result),
                        Ok(Err(e)) => {
                            let error_str = e.to_string();
                            if !error_str.contains(MAX_RESULTS_ERROR) {
                                self.handle_error(&error_str);
                            }
                            Err(anyhow::anyhow!("{}", error_str))
                        }
                        Err(_) => Err(self.handle_timeout()),
                    }
                }
            },
            |e: &anyhow::Error| !e.to_string().contains(MAX_RESULTS_ERROR),
        )
        .await
    }

    pub async fn get_latest_block(&self) -> Result<u64> {
        self.request(|provider| async move { provider.get_block_number().await })
            .await
    }

    async fn get_logs_internal(
        &self,
        filter: &Filter,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>> {
        let filter = filter.clone().from_block(from_block).to_block(to_block);
        self.request(|provider| {
            let filter = filter.clone();
            async move { provider.get_logs(&filter).await }
        })
        .await
    }

    fn parse_max_results_error(error_str: &str) -> Option<(u64, u64)> {
        let re = Regex::new(r"retry with the range (\d+)-(\d+)").ok()?;
        let captures = re.captures(error_str)?;

        let from = captures.get(1)?.as_str().parse().ok()?;
        let to = captures.get(2)?.as_str().parse().ok()?;

        Some((from, to))
    }

    /// Fetches logs for `[from_block, to_block]`, splitting the range wherever
    /// the provider reports a result limit and suggests a smaller one.
    pub async fn get_logs(
        &self,
        filter: &Filter,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>> {
        let mut all_logs = Vec::new();
        let mut current_from = from_block;

        while current_from <= to_block {
            match self.get_logs_internal(filter, current_from, to_block).await {
                Ok(logs) => {
                    all_logs.extend(logs);
                    break;
                }
                Err(e) => {
                    let error_str = e.to_string();
                    if !error_str.contains(MAX_RESULTS_ERROR) {
                        return Err(e);
                    }
                    let Some((_, suggested_to)) = Self::parse_max_results_error(&error_str) else {
                        return Err(e);
                    };
                    if suggested_to < current_from || suggested_to >= to_block {
                        return Err(e);
                    }

                    info!(
                        "Hit max results limit for blocks {}-{}, splitting at block {}",
                        current_from, to_block, suggested_to
                    );

                    let logs = self
                        .get_logs_internal(filter, current_from, suggested_to)
                        .await?;
                    all_logs.extend(logs);
                    current_from = suggested_to + 1;
                }
            }
        }

        Ok(all_logs)
    }
}

fn transfer_filter(filter: &TransferFilter) -> Filter {
    let topic = address_to_topic(filter.account);
    let base = Filter::new().event_signature(TRANSFER_TOPIC);
    match filter.direction {
        TransferDirection::Incoming => base.topic2(topic),
        TransferDirection::Outgoing => base.topic1(topic),
    }
}

fn to_log_entry(log: Log) -> Result<TransferLogEntry> {
    Ok(TransferLogEntry {
        contract_address: log.address(),
        topics: log.topics().to_vec(),
        data: log.data().data.clone(),
        block_number: log.block_number.context("log is missing its block number")?,
        block_hash: log.block_hash.context("log is missing its block hash")?,
        transaction_hash: log
            .transaction_hash
            .context("log is missing its transaction hash")?,
        log_index: log.log_index.context("log is missing its log index")?,
    })
}

impl LogSource for RpcClient {
    async fn transfer_logs(&self, filter: TransferFilter) -> Result<Vec<TransferLogEntry>> {
        let latest_block = self.get_latest_block().await?;
        info!(
            "Fetching {:?} transfer logs for {} in blocks {}-{}",
            filter.direction, filter.account, filter.from_block, latest_block
        );

        let logs = self
            .get_logs(&transfer_filter(&filter), filter.from_block, latest_block)
            .await
            .with_context(|| format!("Failed to fetch {:?} transfer logs", filter.direction))?;

        logs.into_iter().map(to_log_entry).collect()
    }
}

impl AccountStateSource for RpcClient {
    async fn account_state(
        &self,
        account: Address,
        params: &BatchQueryParams,
    ) -> Result<AccountState> {
        let contract = self.account_info_contract;
        let counts = params.counts_as_u256();
        let state = self
            .request(|provider| {
                let erc20s = params.erc20_addresses.clone();
                let erc721s = params.erc721_addresses.clone();
                let counts = counts.clone();
                let token_ids = params.token_ids.clone();
                async move {
                    let instance = AccountInfo::new(contract, provider);
                    instance
                        .getInfo(erc20s, erc721s, counts, token_ids)
                        .from(account)
                        .call()
                        .await
                }
            })
            .await
            .context("getInfo query failed")?;

        Ok(AccountState::from(state))
    }
}

impl TransactionCountSource for RpcClient {
    async fn transaction_count(&self, account: Address) -> Result<u64> {
        self.request(|provider| async move { provider.get_transaction_count(account).await })
            .await
    }
}
