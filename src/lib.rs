//! # Vault Position SDK
//!
//! A Rust library for resolving a user's holdings in yield-bearing vault
//! protocols into priced, displayable positions. Given a protocol
//! deployment, the SDK discovers vault ("jar") and farm contract addresses
//! from an external listing source, prices each vault share token by walking
//! its underlying-token dependencies, computes staked and reward balances in
//! farm contracts, and drills those balances down to base-asset exposure.
//!
//! ## Architecture
//!
//! Resolution runs as a two-phase pass per network:
//!
//! ### Phase 1 — Derived Tokens
//! Each registered [`app_registry::TokenFetcher`] reads vault metadata
//! (symbol, decimals, supply, underlying, share ratio) through the batched
//! reader and prices the vault token off its underlying. Candidates whose
//! underlying is not yet priced are deferred, not failed.
//!
//! ### Barrier
//! Phase-1 output is merged into the per-pass token registry view before any
//! position fetcher starts; the view is never mutated while being read.
//!
//! ### Phase 2 — Contract Positions
//! Each registered [`app_registry::PositionFetcher`] matches staked and
//! reward tokens against the extended view and reads staked supply on-chain.
//!
//! ### Balance Drilling
//! [`balance_drill::drill`] decomposes a flat token balance into equivalent
//! balances of the token's declared underlying set, so a report shows
//! exposure to base assets rather than wrapper tokens.

// Core Types
/// Token data model, networks, and the per-pass registry view
pub mod tokens;
/// Raw integer to decimal-quantity denormalization
pub mod normalization;

// Resolution Pipeline
/// External pool listing source and candidate construction
pub mod listing;
/// Derived (vault/jar) token resolution
pub mod vault_token_resolver;
/// Farm/staking position resolution
pub mod position_resolver;
/// Per-user balance resolution and grouping
pub mod balance_fetcher;
/// Balance decomposition across underlying sets
pub mod balance_drill;
/// App/group/network registration table
pub mod app_registry;
/// Two-phase resolution pass orchestration
pub mod pipeline;

// Infrastructure
/// Multicall batch RPC utilities
pub mod multicall;
/// Display formatting helpers
pub mod presentation;

// Contracts (Read-only ABIs)
/// Smart contract ABIs used by the resolvers
pub mod contracts;

// Settings & Configuration
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use app_registry::{AppRegistry, FetcherKey, PositionFetcher, TokenFetcher};
pub use balance_drill::{drill, TokenBalance};
pub use multicall::{BatchReader, Call, CallResult, Multicall};
pub use pipeline::{run_pass, PassOutput};
pub use position_resolver::FarmPositionResolver;
pub use settings::Settings;
pub use tokens::{ContractPosition, Network, Token, TokenRegistry};
pub use vault_token_resolver::VaultTokenResolver;
