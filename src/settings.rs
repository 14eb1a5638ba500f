use crate::tokens::{Network, Token};
use anyhow::{Context, Result};
use config::{Config, ConfigError, File};
use ethers::types::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Rpc {
    #[serde(default = "default_rpc_http_url")]
    pub http_url: String,
}

fn default_rpc_http_url() -> String {
    "http://localhost:8545".to_string()
}

impl Default for Rpc {
    fn default() -> Self {
        Self { http_url: default_rpc_http_url() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MulticallSettings {
    #[serde(default = "default_multicall_address")]
    pub address: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_multicall_address() -> String {
    // Multicall3, same address on every supported network
    "0xcA11bde05977b3631167028862bE2a173976CA11".to_string()
}

fn default_batch_size() -> usize {
    100
}

impl Default for MulticallSettings {
    fn default() -> Self {
        Self {
            address: default_multicall_address(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Listing {
    #[serde(default = "default_listing_endpoint")]
    pub endpoint: String,
}

fn default_listing_endpoint() -> String {
    "https://api.pickle.finance/prod/protocol/pools".to_string()
}

impl Default for Listing {
    fn default() -> Self {
        Self { endpoint: default_listing_endpoint() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_app_id")]
    pub id: String,
    /// Per-network reward token addresses (network name -> address).
    #[serde(default)]
    pub reward_tokens: HashMap<String, String>,
}

fn default_app_id() -> String {
    "pickle".to_string()
}

impl Default for App {
    fn default() -> Self {
        Self {
            id: default_app_id(),
            reward_tokens: HashMap::new(),
        }
    }
}

/// Seed entry for the base-token price view.
#[derive(Debug, Deserialize, Clone)]
pub struct BaseToken {
    pub network: String,
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
    pub price: f64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub rpc: Rpc,
    #[serde(default)]
    pub multicall: MulticallSettings,
    #[serde(default)]
    pub listing: Listing,
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub base_tokens: Vec<BaseToken>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("Config.toml").required(false))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        // Environment variable overrides
        if let Ok(url) = env::var("SDK_RPC_HTTP_URL") {
            if !url.trim().is_empty() {
                settings.rpc.http_url = url;
            }
        }
        if let Ok(endpoint) = env::var("SDK_LISTING_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                settings.listing.endpoint = endpoint;
            }
        }

        Ok(settings)
    }

    pub fn multicall_address(&self) -> Result<Address> {
        self.multicall
            .address
            .parse()
            .with_context(|| format!("invalid multicall address: {}", self.multicall.address))
    }

    /// The configured reward token for `network`, if any.
    pub fn reward_token(&self, network: Network) -> Option<Address> {
        self.app
            .reward_tokens
            .get(network.as_str())
            .and_then(|raw| raw.parse().ok())
    }

    /// Base tokens configured for `network`, parsed into registry entries.
    /// Entries with malformed addresses are skipped.
    pub fn base_tokens_for(&self, network: Network) -> Vec<Token> {
        self.base_tokens
            .iter()
            .filter(|t| t.network == network.as_str())
            .filter_map(|t| {
                let address: Address = t.address.parse().ok()?;
                Some(Token::base(network, address, t.symbol.clone(), t.decimals, t.price))
            })
            .collect()
    }
}
