// src/listing.rs
//
// External pool listing source: fetches the protocol's published jar/gauge
// listing over HTTP and turns it into per-pass resolution candidates.

use crate::tokens::Network;
use anyhow::Result;
use async_trait::async_trait;
use ethers::types::Address;
use log::debug;
use serde::Deserialize;
use std::collections::HashSet;

/// One record of the external pool listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolListing {
    #[serde(default)]
    pub jar_address: String,
    #[serde(default)]
    pub gauge_address: String,
    #[serde(default)]
    pub network: String,
    /// String-encoded percentage, passed through from the listing source.
    #[serde(default)]
    pub apy: String,
}

/// Listing fetch failures are fatal for the whole resolution pass; there is
/// no partial listing processing.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("listing fetch failed: {0}")]
    Fetch(#[source] reqwest::Error),
    #[error("listing decode failed: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Source of pool listings, behind a trait so resolvers can be driven by
/// canned records in tests.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch all records for `network` (exact string match on the listing's
    /// network field).
    async fn fetch(&self, network: Network) -> Result<Vec<PoolListing>>;
}

/// HTTP client for the external listing endpoint.
pub struct ListingClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ListingClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ListingSource for ListingClient {
    async fn fetch(&self, network: Network) -> Result<Vec<PoolListing>> {
        let records: Vec<PoolListing> = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(ListingError::Fetch)?
            .json()
            .await
            .map_err(ListingError::Decode)?;
        Ok(filter_network(records, network))
    }
}

pub fn filter_network(records: Vec<PoolListing>, network: Network) -> Vec<PoolListing> {
    records
        .into_iter()
        .filter(|r| r.network == network.listing_id())
        .collect()
}

/// A vault (jar) token awaiting resolution. Ephemeral; lives for one pass.
#[derive(Debug, Clone)]
pub struct VaultCandidate {
    pub vault_address: Address,
    pub farm_address: Option<Address>,
    /// Fractional APY passed through from the listing (`"12.5"` -> 0.125).
    pub apy: f64,
}

/// A farm/staking contract awaiting resolution.
#[derive(Debug, Clone)]
pub struct FarmCandidate {
    pub farm_address: Address,
    pub staked_token_address: Address,
    pub reward_token_address: Address,
}

fn parse_address(raw: &str) -> Option<Address> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<Address>().ok()
}

/// Build vault candidates from listing records. Records with a malformed jar
/// address are dropped here, before any chain read; duplicates keep the
/// first occurrence.
pub fn vault_candidates(records: &[PoolListing]) -> Vec<VaultCandidate> {
    let mut seen: HashSet<Address> = HashSet::new();
    let mut candidates = Vec::with_capacity(records.len());
    for record in records {
        let vault_address = match parse_address(&record.jar_address) {
            Some(a) => a,
            None => {
                debug!("listing record with malformed jar address dropped: {:?}", record.jar_address);
                continue;
            }
        };
        if !seen.insert(vault_address) {
            continue;
        }
        candidates.push(VaultCandidate {
            vault_address,
            farm_address: parse_address(&record.gauge_address),
            apy: record.apy.trim().parse::<f64>().unwrap_or(0.0) / 100.0,
        });
    }
    candidates
}

/// Build farm candidates from listing records. Records with an empty or
/// malformed gauge address yield no candidate; the reward token is fixed per
/// deployment and supplied by configuration.
pub fn farm_candidates(records: &[PoolListing], reward_token: Address) -> Vec<FarmCandidate> {
    let mut seen: HashSet<Address> = HashSet::new();
    let mut candidates = Vec::with_capacity(records.len());
    for record in records {
        let farm_address = match parse_address(&record.gauge_address) {
            Some(a) => a,
            None => continue,
        };
        let staked_token_address = match parse_address(&record.jar_address) {
            Some(a) => a,
            None => continue,
        };
        if !seen.insert(farm_address) {
            continue;
        }
        candidates.push(FarmCandidate {
            farm_address,
            staked_token_address,
            reward_token_address: reward_token,
        });
    }
    candidates
}
