//! Optional post-processing stage that resolves owned NFTs' token URIs into
//! their JSON metadata. Runs after the core snapshot is built and never fails
//! it: every fetch error becomes a `fetchTokenMetadata` entry in `errors`.

use alloy_primitives::Address;
use anyhow::{Context, Result, bail};
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::ledger::{AccountSnapshot, SnapshotError, TokenMetadata};
use crate::sources::MetadataSource;

const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpMetadataSource {
    client: reqwest::Client,
    ipfs_gateway: String,
}

impl HttpMetadataSource {
    pub fn new(ipfs_gateway: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(METADATA_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            ipfs_gateway: ipfs_gateway.into(),
        })
    }
}

/// Maps a token URI onto a fetchable HTTP(S) URL, rewriting `ipfs://` through `gateway`.
pub fn resolve_token_uri(gateway: &str, token_uri: &str) -> Result<String> {
    let uri = token_uri.trim();
    if let Some(path) = uri.strip_prefix("ipfs://") {
        let path = path.strip_prefix("ipfs/").unwrap_or(path);
        return Ok(format!("{}/{}", gateway.trim_end_matches('/'), path));
    }
    if uri.starts_with("https://") || uri.starts_with("http://") {
        return Ok(uri.to_string());
    }
    bail!("unsupported token URI scheme: {}", uri)
}

impl MetadataSource for HttpMetadataSource {
    async fn token_metadata(&self, token_uri: &str) -> Result<TokenMetadata> {
        let url = resolve_token_uri(&self.ipfs_gateway, token_uri)?;
        debug!("Fetching token metadata from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{url} returned an error status"))?;

        response
            .json::<TokenMetadata>()
            .await
            .with_context(|| format!("{url} did not return token metadata JSON"))
    }
}

/// Attaches metadata to every owned NFT that has a token URI, running at most
/// `concurrency` fetches at once.
pub async fn enrich_metadata<M: MetadataSource>(
    snapshot: &mut AccountSnapshot,
    source: &M,
    concurrency: usize,
) {
    let jobs: Vec<(Address, usize, String)> = snapshot
        .erc721_tokens
        .iter()
        .flat_map(|(contract, ledger)| {
            ledger.tokens.iter().enumerate().filter_map(move |(index, token)| {
                token.token_uri.clone().map(|uri| (*contract, index, uri))
            })
        })
        .collect();

    if jobs.is_empty() {
        return;
    }
    info!("Fetching metadata for {} tokens", jobs.len());

    let results: Vec<_> = stream::iter(jobs)
        .map(|(contract, index, uri)| async move {
            let result = source.token_metadata(&uri).await;
            (contract, index, uri, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut failed = 0usize;
    for (contract, index, uri, result) in results {
        let Some(token) = snapshot
            .erc721_tokens
            .get_mut(&contract)
            .and_then(|ledger| ledger.tokens.get_mut(index))
        else {
            continue;
        };
        match result {
            Ok(metadata) => token.metadata = Some(metadata),
            Err(e) => {
                failed += 1;
                snapshot.errors.push(SnapshotError::new(
                    SnapshotError::FETCH_TOKEN_METADATA,
                    format!("{contract} token {:#x} ({uri}): {e:#}", token.token_id),
                ));
            }
        }
    }

    if failed > 0 {
        warn!("Failed to fetch metadata for {} tokens", failed);
    }
}
