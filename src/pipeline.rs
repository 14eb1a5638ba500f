// src/pipeline.rs
//
// Two-phase resolution pass. Phase 1 resolves every registered app's derived
// tokens against the base-token view; their output is merged into the
// registry behind a hard barrier; phase 2 resolves positions against the
// extended view. Fetchers within a phase fan out concurrently.

use crate::app_registry::AppRegistry;
use crate::multicall::BatchReader;
use crate::tokens::{ContractPosition, Network, Token, TokenRegistry};
use anyhow::{Context, Result};
use futures::future::join_all;
use log::info;
use serde::Serialize;

/// Output of one resolution pass. Fresh every pass; a re-run supersedes
/// rather than merges.
#[derive(Debug, Default, Serialize)]
pub struct PassOutput {
    pub tokens: Vec<Token>,
    pub positions: Vec<ContractPosition>,
}

/// Run one full resolution pass for `network`.
///
/// The registry view is append-only and never mutated while fetchers hold
/// it: phase 1 runs to completion before its output is merged, and phase 2
/// only starts against the merged view. Output order across fetchers and
/// candidates is not guaranteed.
pub async fn run_pass(
    apps: &AppRegistry,
    reader: &dyn BatchReader,
    network: Network,
    base_tokens: Vec<Token>,
) -> Result<PassOutput> {
    let mut registry = TokenRegistry::from_tokens(base_tokens);
    info!(
        "resolution pass on {}: {} base tokens",
        network.as_str(),
        registry.len()
    );

    // Phase 1: derived tokens
    let token_futures: Vec<_> = apps
        .token_fetchers(network)
        .map(|(key, fetcher)| {
            let registry = &registry;
            async move { (key.clone(), fetcher.get_tokens(reader, registry).await) }
        })
        .collect();
    let mut tokens: Vec<Token> = Vec::new();
    for (key, result) in join_all(token_futures).await {
        let mut resolved = result
            .with_context(|| format!("token fetcher {}/{} failed", key.app_id, key.group_id))?;
        tokens.append(&mut resolved);
    }

    // Barrier: positions must see the completed phase-1 output
    registry.extend(tokens.iter().cloned());

    // Phase 2: contract positions
    let position_futures: Vec<_> = apps
        .position_fetchers(network)
        .map(|(key, fetcher)| {
            let registry = &registry;
            async move { (key.clone(), fetcher.get_positions(reader, registry).await) }
        })
        .collect();
    let mut positions: Vec<ContractPosition> = Vec::new();
    for (key, result) in join_all(position_futures).await {
        let mut resolved = result
            .with_context(|| format!("position fetcher {}/{} failed", key.app_id, key.group_id))?;
        positions.append(&mut resolved);
    }

    info!(
        "resolution pass on {} complete: {} tokens, {} positions",
        network.as_str(),
        tokens.len(),
        positions.len()
    );
    Ok(PassOutput { tokens, positions })
}
