// src/app_registry.rs
//
// Explicit registration table mapping (app, group, network) to resolver
// implementations. Populated once at startup; the resolution pipeline walks
// it per network.

use crate::multicall::BatchReader;
use crate::tokens::{ContractPosition, Network, Token, TokenRegistry};
use anyhow::Result;
use async_trait::async_trait;
use log::warn;
use std::sync::Arc;

/// Identity under which a resolver is registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetcherKey {
    pub app_id: String,
    pub group_id: String,
    pub network: Network,
}

impl FetcherKey {
    pub fn new(app_id: impl Into<String>, group_id: impl Into<String>, network: Network) -> Self {
        Self {
            app_id: app_id.into(),
            group_id: group_id.into(),
            network,
        }
    }
}

/// Resolves an app's derived tokens against a registry of already-priced
/// dependencies. Runs in phase 1 of a resolution pass.
#[async_trait]
pub trait TokenFetcher: Send + Sync {
    async fn get_tokens(
        &self,
        reader: &dyn BatchReader,
        registry: &TokenRegistry,
    ) -> Result<Vec<Token>>;
}

/// Resolves an app's contract positions. Runs in phase 2, after every
/// registered token fetcher's output has been merged into the registry.
#[async_trait]
pub trait PositionFetcher: Send + Sync {
    async fn get_positions(
        &self,
        reader: &dyn BatchReader,
        registry: &TokenRegistry,
    ) -> Result<Vec<ContractPosition>>;
}

/// Registration table for protocol integrations.
#[derive(Default)]
pub struct AppRegistry {
    token_fetchers: Vec<(FetcherKey, Arc<dyn TokenFetcher>)>,
    position_fetchers: Vec<(FetcherKey, Arc<dyn PositionFetcher>)>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_token_fetcher(&mut self, key: FetcherKey, fetcher: Arc<dyn TokenFetcher>) {
        if self.token_fetchers.iter().any(|(k, _)| *k == key) {
            warn!("token fetcher already registered for {:?}, ignoring", key);
            return;
        }
        self.token_fetchers.push((key, fetcher));
    }

    pub fn register_position_fetcher(
        &mut self,
        key: FetcherKey,
        fetcher: Arc<dyn PositionFetcher>,
    ) {
        if self.position_fetchers.iter().any(|(k, _)| *k == key) {
            warn!("position fetcher already registered for {:?}, ignoring", key);
            return;
        }
        self.position_fetchers.push((key, fetcher));
    }

    /// Token fetchers registered for `network`, in registration order.
    pub fn token_fetchers(
        &self,
        network: Network,
    ) -> impl Iterator<Item = (&FetcherKey, &Arc<dyn TokenFetcher>)> {
        self.token_fetchers
            .iter()
            .filter(move |(k, _)| k.network == network)
            .map(|(k, f)| (k, f))
    }

    /// Position fetchers registered for `network`, in registration order.
    pub fn position_fetchers(
        &self,
        network: Network,
    ) -> impl Iterator<Item = (&FetcherKey, &Arc<dyn PositionFetcher>)> {
        self.position_fetchers
            .iter()
            .filter(move |(k, _)| k.network == network)
            .map(|(k, f)| (k, f))
    }
}
