// src/position_resolver.rs
//
// Resolves farm/staking candidates into contract positions. Runs after the
// vault token phase: its registry view must already contain this pass's
// resolved jar tokens, otherwise every candidate staking one is deferred.

use crate::app_registry::PositionFetcher;
use crate::contracts::ERC20_ABI;
use crate::listing::{farm_candidates, FarmCandidate, ListingSource};
use crate::multicall::{decode_uint, BatchReader, Call};
use crate::normalization::normalize_units;
use crate::tokens::{
    ContractPosition, Network, PositionDataProps, Token, TokenNode, TokenRegistry,
};
use anyhow::Result;
use async_trait::async_trait;
use ethers::abi::Token as AbiToken;
use ethers::types::Address;
use log::{debug, info};
use std::collections::HashSet;
use std::sync::Arc;

/// Phase-2 resolver for a vault protocol's farm positions.
pub struct FarmPositionResolver {
    app_id: String,
    group_id: String,
    network: Network,
    listing: Arc<dyn ListingSource>,
    reward_token: Address,
}

struct MatchedCandidate<'a> {
    candidate: &'a FarmCandidate,
    staked: Token,
    reward: Token,
}

impl FarmPositionResolver {
    pub fn new(
        app_id: impl Into<String>,
        group_id: impl Into<String>,
        network: Network,
        listing: Arc<dyn ListingSource>,
        reward_token: Address,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            group_id: group_id.into(),
            network,
            listing,
            reward_token,
        }
    }

    /// Resolve a candidate set against the extended registry view.
    ///
    /// Both the staked and the reward token must be present in the registry;
    /// a candidate missing either is deferred, same as an unresolvable vault
    /// underlying. TVL is reported in staked-token units; the consumer
    /// multiplies by the staked token's price when a currency figure is
    /// needed.
    pub async fn resolve_candidates(
        &self,
        reader: &dyn BatchReader,
        registry: &TokenRegistry,
        candidates: &[FarmCandidate],
    ) -> Result<Vec<ContractPosition>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen: HashSet<Address> = HashSet::new();
        let mut matched: Vec<MatchedCandidate<'_>> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !seen.insert(candidate.farm_address) {
                continue;
            }
            let staked = registry.lookup(self.network, candidate.staked_token_address);
            let reward = registry.lookup(self.network, candidate.reward_token_address);
            match staked.zip(reward) {
                Some((staked, reward)) => matched.push(MatchedCandidate {
                    candidate,
                    staked: staked.clone(),
                    reward: reward.clone(),
                }),
                None => {
                    debug!(
                        "farm {:?}: staked or reward token not in registry, deferring",
                        candidate.farm_address
                    );
                }
            }
        }

        // Staked supply: stakedToken.balanceOf(farm)
        let balance_of_fn = ERC20_ABI.function("balanceOf")?;
        let calls = matched
            .iter()
            .map(|m| {
                Ok(Call {
                    target: m.staked.address,
                    call_data: balance_of_fn
                        .encode_input(&[AbiToken::Address(m.candidate.farm_address)])?
                        .into(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let results = reader.read(calls).await?;

        let mut positions = Vec::with_capacity(matched.len());
        for (m, result) in matched.into_iter().zip(results) {
            let balance_raw = match decode_uint(balance_of_fn, &result) {
                Some(value) => value,
                None => {
                    debug!(
                        "farm {:?}: staked balance read failed, excluding from pass",
                        m.candidate.farm_address
                    );
                    continue;
                }
            };
            let total_value_locked = normalize_units(balance_raw, m.staked.decimals);
            positions.push(ContractPosition {
                network: self.network,
                app_id: self.app_id.clone(),
                group_id: self.group_id.clone(),
                address: m.candidate.farm_address,
                tokens: vec![TokenNode::supplied(m.staked), TokenNode::claimable(m.reward)],
                data: PositionDataProps { total_value_locked },
            });
        }

        info!(
            "{}/{}: resolved {}/{} farm positions on {}",
            self.app_id,
            self.group_id,
            positions.len(),
            candidates.len(),
            self.network.as_str()
        );
        Ok(positions)
    }
}

#[async_trait]
impl PositionFetcher for FarmPositionResolver {
    async fn get_positions(
        &self,
        reader: &dyn BatchReader,
        registry: &TokenRegistry,
    ) -> Result<Vec<ContractPosition>> {
        let records = self.listing.fetch(self.network).await?;
        let candidates = farm_candidates(&records, self.reward_token);
        self.resolve_candidates(reader, registry, &candidates).await
    }
}
