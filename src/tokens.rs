// src/tokens.rs
//
// Core token data model: networks, priced tokens, underlying-set nodes,
// contract positions, and the per-pass token registry view.

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Networks supported by the resolution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Ethereum,
    Polygon,
}

impl Network {
    /// Identifier used by the external pool listing source.
    pub fn listing_id(&self) -> &'static str {
        match self {
            Network::Ethereum => "eth",
            Network::Polygon => "polygon",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Polygon => "polygon",
        }
    }
}

impl std::str::FromStr for Network {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ethereum" | "eth" => Ok(Network::Ethereum),
            "polygon" | "matic" => Ok(Network::Polygon),
            other => Err(anyhow::anyhow!("unknown network: {}", other)),
        }
    }
}

/// Role of a token inside an underlying set: principal vs. reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaType {
    Supplied,
    Claimable,
}

/// One entry of a token's underlying set.
///
/// `weight` is the attribution share this entry receives when a balance is
/// drilled through the tree. `None` means "split evenly across the set".
#[derive(Debug, Clone, Serialize)]
pub struct TokenNode {
    pub meta_type: MetaType,
    pub weight: Option<f64>,
    pub token: Token,
}

impl TokenNode {
    pub fn supplied(token: Token) -> Self {
        Self { meta_type: MetaType::Supplied, weight: None, token }
    }

    pub fn claimable(token: Token) -> Self {
        Self { meta_type: MetaType::Claimable, weight: None, token }
    }

    pub fn weighted(meta_type: MetaType, weight: f64, token: Token) -> Self {
        Self { meta_type, weight: Some(weight), token }
    }

    pub fn is_supplied(&self) -> bool {
        self.meta_type == MetaType::Supplied
    }

    pub fn is_claimable(&self) -> bool {
        self.meta_type == MetaType::Claimable
    }
}

/// Presentation metadata attached to a resolved token.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DisplayProps {
    pub label: String,
    pub images: Vec<String>,
    pub secondary_label: Option<String>,
    pub tertiary_label: Option<String>,
}

/// Protocol-specific figures carried alongside a resolved token.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TokenDataProps {
    pub apy: f64,
    pub tvl: f64,
}

/// A priced token. Base assets carry only identity, decimals and price;
/// derived (vault) tokens additionally carry supply, share price, an
/// underlying set, and display/data props.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    pub network: Network,
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    /// Quote currency per whole token.
    pub price: f64,
    pub supply: Option<f64>,
    pub price_per_share: Option<f64>,
    pub app_id: Option<String>,
    pub group_id: Option<String>,
    pub tokens: Vec<TokenNode>,
    pub display: Option<DisplayProps>,
    pub data: TokenDataProps,
}

impl Token {
    /// A base token whose price is externally known.
    pub fn base(
        network: Network,
        address: Address,
        symbol: impl Into<String>,
        decimals: u8,
        price: f64,
    ) -> Self {
        Self {
            network,
            address,
            symbol: symbol.into(),
            decimals,
            price,
            supply: None,
            price_per_share: None,
            app_id: None,
            group_id: None,
            tokens: Vec::new(),
            display: None,
            data: TokenDataProps::default(),
        }
    }
}

/// Figures carried alongside a contract position.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PositionDataProps {
    /// Expressed in staked-token units, not quote currency. The consumer
    /// multiplies by the staked token's price when a currency figure is needed.
    pub total_value_locked: f64,
}

/// A farm/staking contract position: staked principal plus claimable reward.
#[derive(Debug, Clone, Serialize)]
pub struct ContractPosition {
    pub network: Network,
    pub app_id: String,
    pub group_id: String,
    pub address: Address,
    pub tokens: Vec<TokenNode>,
    pub data: PositionDataProps,
}

impl ContractPosition {
    pub fn supplied_token(&self) -> Option<&Token> {
        self.tokens.iter().find(|n| n.is_supplied()).map(|n| &n.token)
    }

    pub fn claimable_token(&self) -> Option<&Token> {
        self.tokens.iter().find(|n| n.is_claimable()).map(|n| &n.token)
    }
}

/// Read-only, per-pass snapshot of already-priced tokens.
///
/// Built by unioning base tokens with tokens resolved earlier in the same
/// pass. Resolvers only read from it; the pass orchestrator appends between
/// phases. Existing entries are never overwritten.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: HashMap<(Network, Address), Token>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tokens(tokens: impl IntoIterator<Item = Token>) -> Self {
        let mut registry = Self::new();
        registry.extend(tokens);
        registry
    }

    /// Append a token. First writer wins: re-inserting an existing key keeps
    /// the entry already in the view.
    pub fn insert(&mut self, token: Token) {
        self.tokens.entry((token.network, token.address)).or_insert(token);
    }

    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) {
        for token in tokens {
            self.insert(token);
        }
    }

    pub fn lookup(&self, network: Network, address: Address) -> Option<&Token> {
        self.tokens.get(&(network, address))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
