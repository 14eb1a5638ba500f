// src/vault_token_resolver.rs
//
// Resolves vault ("jar") candidates into priced app tokens. All on-chain
// metadata is read through the batched reader; a candidate whose underlying
// token is not yet priced is dropped from the pass, not treated as an error.

use crate::app_registry::TokenFetcher;
use crate::contracts::{ERC20_ABI, VAULTTOKEN_ABI};
use crate::listing::{vault_candidates, ListingSource, VaultCandidate};
use crate::multicall::{decode_address, decode_string, decode_u8, decode_uint, BatchReader, Call};
use crate::normalization::{normalize_ratio, normalize_units};
use crate::presentation::{apy_display, dollar_display, images_from_token, label_from_token};
use crate::tokens::{DisplayProps, Network, Token, TokenDataProps, TokenNode, TokenRegistry};
use anyhow::Result;
use async_trait::async_trait;
use ethers::abi::Token as AbiToken;
use log::{debug, info};
use std::sync::Arc;

// Reads issued per candidate in the metadata batch
const READS_PER_CANDIDATE: usize = 5;

/// Phase-1 resolver for a vault protocol's derived tokens.
pub struct VaultTokenResolver {
    app_id: String,
    group_id: String,
    network: Network,
    listing: Arc<dyn ListingSource>,
}

struct PricedCandidate<'a> {
    candidate: &'a VaultCandidate,
    symbol: String,
    decimals: u8,
    supply: f64,
    price_per_share: f64,
    price: f64,
    underlying: Token,
}

impl VaultTokenResolver {
    pub fn new(
        app_id: impl Into<String>,
        group_id: impl Into<String>,
        network: Network,
        listing: Arc<dyn ListingSource>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            group_id: group_id.into(),
            network,
            listing,
        }
    }

    /// Resolve a candidate set against an already-assembled registry view.
    ///
    /// Issues one metadata batch (symbol, decimals, totalSupply, token,
    /// getRatio per candidate) and one reserve batch, then prices each
    /// candidate off its underlying. Exclusions are per candidate: a decode
    /// failure or a missing underlying never affects siblings.
    pub async fn resolve_candidates(
        &self,
        reader: &dyn BatchReader,
        registry: &TokenRegistry,
        candidates: &[VaultCandidate],
    ) -> Result<Vec<Token>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let symbol_fn = VAULTTOKEN_ABI.function("symbol")?;
        let decimals_fn = VAULTTOKEN_ABI.function("decimals")?;
        let total_supply_fn = VAULTTOKEN_ABI.function("totalSupply")?;
        let token_fn = VAULTTOKEN_ABI.function("token")?;
        let get_ratio_fn = VAULTTOKEN_ABI.function("getRatio")?;

        let mut calls = Vec::with_capacity(candidates.len() * READS_PER_CANDIDATE);
        for candidate in candidates {
            for function in [symbol_fn, decimals_fn, total_supply_fn, token_fn, get_ratio_fn] {
                calls.push(Call {
                    target: candidate.vault_address,
                    call_data: function.encode_input(&[])?.into(),
                });
            }
        }
        let results = reader.read(calls).await?;

        let mut priced: Vec<PricedCandidate<'_>> = Vec::with_capacity(candidates.len());
        for (i, candidate) in candidates.iter().enumerate() {
            let chunk = &results[i * READS_PER_CANDIDATE..(i + 1) * READS_PER_CANDIDATE];
            let decoded = decode_string(symbol_fn, &chunk[0])
                .zip(decode_u8(decimals_fn, &chunk[1]))
                .zip(decode_uint(total_supply_fn, &chunk[2]))
                .zip(decode_address(token_fn, &chunk[3]))
                .zip(decode_uint(get_ratio_fn, &chunk[4]));
            let ((((symbol, decimals), supply_raw), underlying_address), ratio_raw) = match decoded
            {
                Some(values) => values,
                None => {
                    debug!(
                        "vault {:?}: metadata read failed, excluding from pass",
                        candidate.vault_address
                    );
                    continue;
                }
            };

            // Deferred eligibility: the underlying may resolve in a later pass
            let underlying = match registry.lookup(self.network, underlying_address) {
                Some(token) => token.clone(),
                None => {
                    debug!(
                        "vault {:?}: underlying {:?} not in registry, deferring",
                        candidate.vault_address, underlying_address
                    );
                    continue;
                }
            };

            let price_per_share = normalize_ratio(ratio_raw);
            priced.push(PricedCandidate {
                candidate,
                symbol,
                decimals,
                supply: normalize_units(supply_raw, decimals),
                price_per_share,
                price: price_per_share * underlying.price,
                underlying,
            });
        }

        // TVL inputs: the underlying reserve held at each vault
        let balance_of_fn = ERC20_ABI.function("balanceOf")?;
        let reserve_calls = priced
            .iter()
            .map(|p| {
                Ok(Call {
                    target: p.underlying.address,
                    call_data: balance_of_fn
                        .encode_input(&[AbiToken::Address(p.candidate.vault_address)])?
                        .into(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let reserve_results = reader.read(reserve_calls).await?;

        let mut tokens = Vec::with_capacity(priced.len());
        for (p, reserve_result) in priced.into_iter().zip(reserve_results) {
            let reserve_raw = match decode_uint(balance_of_fn, &reserve_result) {
                Some(value) => value,
                None => {
                    debug!(
                        "vault {:?}: reserve read failed, excluding from pass",
                        p.candidate.vault_address
                    );
                    continue;
                }
            };
            let reserve = normalize_units(reserve_raw, p.underlying.decimals);
            let tvl = reserve * p.underlying.price;
            let apy = p.candidate.apy;

            let display = DisplayProps {
                label: format!("{} Jar", label_from_token(&p.underlying)),
                images: images_from_token(&p.underlying),
                secondary_label: Some(dollar_display(p.price)),
                tertiary_label: Some(apy_display(apy)),
            };
            tokens.push(Token {
                network: self.network,
                address: p.candidate.vault_address,
                symbol: p.symbol,
                decimals: p.decimals,
                price: p.price,
                supply: Some(p.supply),
                price_per_share: Some(p.price_per_share),
                app_id: Some(self.app_id.clone()),
                group_id: Some(self.group_id.clone()),
                tokens: vec![TokenNode::supplied(p.underlying)],
                display: Some(display),
                data: TokenDataProps { apy, tvl },
            });
        }

        info!(
            "{}/{}: resolved {}/{} vault tokens on {}",
            self.app_id,
            self.group_id,
            tokens.len(),
            candidates.len(),
            self.network.as_str()
        );
        Ok(tokens)
    }
}

#[async_trait]
impl TokenFetcher for VaultTokenResolver {
    async fn get_tokens(
        &self,
        reader: &dyn BatchReader,
        registry: &TokenRegistry,
    ) -> Result<Vec<Token>> {
        let records = self.listing.fetch(self.network).await?;
        let candidates = vault_candidates(&records);
        self.resolve_candidates(reader, registry, &candidates).await
    }
}
