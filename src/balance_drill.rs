// src/balance_drill.rs
//
// Decomposes a flat token balance into equivalent balances of the token's
// declared underlying set. Pure computation; no I/O, the input token is
// never mutated.

use crate::normalization::{normalize_units, SHARE_RATIO_SCALE};
use crate::tokens::Token;
use ethers::types::U256;
use serde::Serialize;

/// A balance annotated with its owning token, mirroring the token's
/// underlying tree.
#[derive(Debug, Clone, Serialize)]
pub struct TokenBalance {
    pub token: Token,
    pub balance_raw: U256,
    /// Denormalized by the owning token's decimals.
    pub balance: f64,
    pub balance_usd: f64,
    pub underlying: Vec<TokenBalance>,
}

fn scale_raw(raw: U256, weight: f64) -> U256 {
    if weight >= 1.0 {
        return raw;
    }
    if weight <= 0.0 {
        return U256::zero();
    }
    let scaled = (weight * SHARE_RATIO_SCALE as f64).round() as u128;
    raw.saturating_mul(U256::from(scaled)) / U256::from(SHARE_RATIO_SCALE)
}

/// Allocate `raw_balance` of `token` across its underlying set, recursively.
///
/// Each node receives `raw_balance * weight`; explicit node weights are used
/// as given, nodes without one default to an even `1/n` split. A token
/// with a single underlying therefore passes its balance through unscaled,
/// which is the case every call site in this crate exercises.
pub fn drill(token: &Token, raw_balance: U256) -> TokenBalance {
    let balance = normalize_units(raw_balance, token.decimals);
    let n = token.tokens.len();
    let underlying = token
        .tokens
        .iter()
        .map(|node| {
            let weight = node.weight.unwrap_or(1.0 / n as f64);
            drill(&node.token, scale_raw(raw_balance, weight))
        })
        .collect();
    TokenBalance {
        balance_raw: raw_balance,
        balance,
        balance_usd: balance * token.price,
        underlying,
        token: token.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{MetaType, Network, TokenNode};
    use ethers::types::Address;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn base(n: u64, symbol: &str, decimals: u8, price: f64) -> Token {
        Token::base(Network::Ethereum, addr(n), symbol, decimals, price)
    }

    fn jar_token() -> Token {
        let mut jar = base(1, "pDAI", 18, 2.2);
        jar.price_per_share = Some(1.1);
        jar.tokens = vec![TokenNode::supplied(base(2, "DAI", 18, 2.0))];
        jar
    }

    #[test]
    fn test_single_underlying_passes_balance_through() {
        let raw = U256::from(5u64) * U256::exp10(18);
        let drilled = drill(&jar_token(), raw);
        assert_eq!(drilled.balance, 5.0);
        assert!((drilled.balance_usd - 11.0).abs() < 1e-9);
        assert_eq!(drilled.underlying.len(), 1);
        // weight 1 over a single-entry set: raw attributed unscaled
        assert_eq!(drilled.underlying[0].balance_raw, raw);
        assert_eq!(drilled.underlying[0].balance, 5.0);
    }

    #[test]
    fn test_nary_defaults_to_even_split() {
        let mut lp = base(1, "LP", 18, 4.0);
        lp.tokens = vec![
            TokenNode::supplied(base(2, "A", 18, 1.0)),
            TokenNode::supplied(base(3, "B", 18, 1.0)),
        ];
        let raw = U256::from(10u64) * U256::exp10(18);
        let drilled = drill(&lp, raw);
        assert_eq!(drilled.underlying.len(), 2);
        assert_eq!(drilled.underlying[0].balance, 5.0);
        assert_eq!(drilled.underlying[1].balance, 5.0);
    }

    #[test]
    fn test_explicit_weights_respected_and_sum_to_one() {
        let mut lp = base(1, "LP", 18, 1.0);
        lp.tokens = vec![
            TokenNode::weighted(MetaType::Supplied, 0.75, base(2, "A", 18, 1.0)),
            TokenNode::weighted(MetaType::Supplied, 0.25, base(3, "B", 18, 1.0)),
        ];
        let weight_sum: f64 = lp.tokens.iter().filter_map(|n| n.weight).sum();
        assert_eq!(weight_sum, 1.0);

        let raw = U256::from(8u64) * U256::exp10(18);
        let drilled = drill(&lp, raw);
        assert_eq!(drilled.underlying[0].balance, 6.0);
        assert_eq!(drilled.underlying[1].balance, 2.0);
    }

    #[test]
    fn test_drill_is_linear() {
        let jar = jar_token();
        let a = U256::from(3u64) * U256::exp10(18);
        let b = U256::from(7u64) * U256::exp10(18);

        let da = drill(&jar, a);
        let db = drill(&jar, b);
        let dsum = drill(&jar, a + b);

        assert_eq!(da.balance + db.balance, dsum.balance);
        assert_eq!(
            da.underlying[0].balance + db.underlying[0].balance,
            dsum.underlying[0].balance
        );
    }

    #[test]
    fn test_recursive_fanout() {
        // farm reward drilled through a jar that itself wraps a base token
        let mut outer = base(1, "OUTER", 18, 1.0);
        outer.tokens = vec![TokenNode::supplied(jar_token())];
        let raw = U256::from(2u64) * U256::exp10(18);
        let drilled = drill(&outer, raw);
        assert_eq!(drilled.underlying[0].underlying[0].token.symbol, "DAI");
        assert_eq!(drilled.underlying[0].underlying[0].balance, 2.0);
    }

    #[test]
    fn test_zero_balance() {
        let drilled = drill(&jar_token(), U256::zero());
        assert_eq!(drilled.balance, 0.0);
        assert_eq!(drilled.balance_usd, 0.0);
    }
}
