// src/presentation.rs
//
// Pure display formatting for resolved tokens and positions.

use crate::tokens::{Network, Token};
use ethers::types::Address;

/// Human label for a token: explicit display label when present, symbol otherwise.
pub fn label_from_token(token: &Token) -> String {
    match &token.display {
        Some(display) if !display.label.is_empty() => display.label.clone(),
        _ => token.symbol.clone(),
    }
}

/// Image URLs for a token, falling back to the canonical asset-by-address URL.
pub fn images_from_token(token: &Token) -> Vec<String> {
    match &token.display {
        Some(display) if !display.images.is_empty() => display.images.clone(),
        _ => vec![token_image(token.network, token.address)],
    }
}

pub fn token_image(network: Network, address: Address) -> String {
    format!(
        "https://storage.googleapis.com/zapper-fi-assets/tokens/{}/{:?}.png",
        network.as_str(),
        address
    )
}

/// Dollar-formatted secondary label, e.g. `$2.20`.
pub fn dollar_display(value: f64) -> String {
    format!("${:.2}", value)
}

/// APY tertiary label from a fractional rate, e.g. `12.500% APY`.
pub fn apy_display(apy: f64) -> String {
    format!("{:.3}% APY", apy * 100.0)
}
