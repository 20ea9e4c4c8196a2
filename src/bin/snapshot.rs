use alloy_primitives::Address;
use anyhow::Result;
use clap::Parser;
use std::str::FromStr;
use token_snapshot::config::Config;
use token_snapshot::metadata::{HttpMetadataSource, enrich_metadata};
use token_snapshot::output::{OutputFormat, format_snapshot};
use token_snapshot::rpc::RpcClient;
use token_snapshot::snapshot::SnapshotBuilder;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snapshot")]
#[command(about = "Snapshot the ERC-20 and ERC-721 holdings of an account", long_about = None)]
struct Cli {
    address: String,

    #[arg(short, long, default_value = "table")]
    format: String,

    /// Fetch JSON metadata behind each owned NFT's token URI
    #[arg(long, default_value = "false")]
    metadata: bool,

    /// Include per-token transfer history in JSON output
    #[arg(long, default_value = "false")]
    history: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());
    let account = Address::from_str(&cli.address)
        .map_err(|_| anyhow::anyhow!("Invalid address format: {}", cli.address))?;

    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("Account info contract: {:?}", config.account_info_contract);
    info!(
        "RPC URLs: {} endpoint(s) configured",
        config.json_rpc_urls.len()
    );

    let client = RpcClient::new(&config.json_rpc_urls, config.account_info_contract)?;
    let builder = SnapshotBuilder::new(client, config.logs_from_block);

    let mut snapshot = match builder.build(account).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Snapshot error: {:#}", e);
            return Err(e);
        }
    };

    if cli.metadata {
        let source = HttpMetadataSource::new(config.ipfs_gateway.clone())?;
        enrich_metadata(&mut snapshot, &source, config.metadata_concurrency).await;
    }

    if !cli.history {
        snapshot = snapshot.without_history();
    }

    println!("{}", format_snapshot(&snapshot, &format));

    Ok(())
}
