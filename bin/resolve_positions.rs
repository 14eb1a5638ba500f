//! # Position Resolution Runner
//!
//! Runs one full resolution pass for a network and prints the resolved vault
//! tokens and farm positions as JSON. Optionally resolves and drills a
//! user's balances against the pass output.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin resolve_positions -- --network ethereum
//! cargo run --bin resolve_positions -- --network ethereum --user 0xabc...
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use ethers::prelude::{Http, Provider};
use ethers::types::Address;
use log::info;
use std::sync::Arc;
use vault_position_sdk::{
    balance_fetcher::fetch_balances,
    listing::ListingClient,
    AppRegistry, FarmPositionResolver, FetcherKey, Multicall, Network, Settings,
    VaultTokenResolver,
};

#[derive(Parser, Debug)]
#[command(name = "resolve_positions", about = "Resolve vault protocol positions for a network")]
struct Args {
    /// Network to resolve ("ethereum" or "polygon")
    #[arg(long, default_value = "ethereum")]
    network: String,

    /// Optional user address to resolve drilled balances for
    #[arg(long)]
    user: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let network: Network = args.network.parse()?;
    let settings = Settings::new().context("failed to load settings")?;

    let provider = Arc::new(
        Provider::<Http>::try_from(settings.rpc.http_url.as_str())
            .context("invalid RPC http url")?,
    );
    let multicall = Multicall::new(
        provider,
        settings.multicall_address()?,
        settings.multicall.batch_size,
    );
    let listing = Arc::new(ListingClient::new(settings.listing.endpoint.clone()));

    let mut apps = AppRegistry::new();
    apps.register_token_fetcher(
        FetcherKey::new(settings.app.id.clone(), "jar", network),
        Arc::new(VaultTokenResolver::new(
            settings.app.id.clone(),
            "jar",
            network,
            listing.clone(),
        )),
    );
    if let Some(reward_token) = settings.reward_token(network) {
        apps.register_position_fetcher(
            FetcherKey::new(settings.app.id.clone(), "farm", network),
            Arc::new(FarmPositionResolver::new(
                settings.app.id.clone(),
                "farm",
                network,
                listing,
                reward_token,
            )),
        );
    } else {
        info!("no reward token configured for {}, skipping farm positions", network.as_str());
    }

    let base_tokens = settings.base_tokens_for(network);
    let output = vault_position_sdk::run_pass(&apps, &multicall, network, base_tokens).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);

    if let Some(raw_user) = args.user {
        let user: Address = raw_user.parse().context("invalid user address")?;
        let groups = fetch_balances(&multicall, user, &output.tokens, &output.positions).await?;
        println!("{}", serde_json::to_string_pretty(&groups)?);
    }

    Ok(())
}
