// src/normalization.rs
//
// Denormalization of raw on-chain integer amounts into decimal quantities,
// with correct per-token decimal handling.

use ethers::types::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Fixed-point scale (1e18) used by vault share ratios.
pub const SHARE_RATIO_SCALE: u128 = 1_000_000_000_000_000_000u128;

/// Helper: 10^n as u128, returns None on overflow (n > 38)
#[inline]
pub fn pow10_u128(n: u8) -> Option<u128> {
    10u128.checked_pow(n as u32)
}

fn pow10_decimal(n: u8) -> Option<Decimal> {
    pow10_u128(n).map(Decimal::from)
}

/// Denormalize a base-unit amount into a whole-token quantity: `amount / 10^decimals`.
///
/// Goes through `Decimal` while the amount fits its 96-bit mantissa; amounts
/// beyond that degrade to float division, matching the precision the rest of
/// the pricing layer operates at.
pub fn normalize_units(amount: U256, decimals: u8) -> f64 {
    if amount.is_zero() {
        return 0.0;
    }
    let exact = Decimal::from_str(&amount.to_string())
        .ok()
        .zip(pow10_decimal(decimals))
        .and_then(|(amt, scale)| (amt / scale).to_f64());
    match exact {
        Some(v) => v,
        None => {
            let raw = amount.to_string().parse::<f64>().unwrap_or(0.0);
            raw / 10f64.powi(decimals as i32)
        }
    }
}

/// Denormalize a 1e18 fixed-point ratio (e.g. a vault's share ratio).
pub fn normalize_ratio(ratio: U256) -> f64 {
    normalize_units(ratio, 18)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow10_basic() {
        assert_eq!(pow10_u128(0), Some(1));
        assert_eq!(pow10_u128(6), Some(1_000_000));
        assert_eq!(pow10_u128(18), Some(SHARE_RATIO_SCALE));
        assert_eq!(pow10_u128(39), None);
    }

    #[test]
    fn test_normalize_units_18_decimals() {
        // 1000 tokens with 18 decimals
        let raw = U256::from(1000u64) * U256::from(SHARE_RATIO_SCALE);
        assert_eq!(normalize_units(raw, 18), 1000.0);
    }

    #[test]
    fn test_normalize_units_6_decimals() {
        // 1.5 USDC
        assert_eq!(normalize_units(U256::from(1_500_000u64), 6), 1.5);
    }

    #[test]
    fn test_normalize_units_zero() {
        assert_eq!(normalize_units(U256::zero(), 18), 0.0);
    }

    #[test]
    fn test_normalize_units_huge_amount_degrades() {
        // Larger than Decimal's mantissa, must still produce a finite value
        let raw = U256::from(2u8).pow(U256::from(200u8));
        let v = normalize_units(raw, 18);
        assert!(v.is_finite() && v > 0.0);
    }

    #[test]
    fn test_normalize_ratio() {
        // 1.1e18 fixed-point
        let ratio = U256::from(1_100_000_000_000_000_000u128);
        let v = normalize_ratio(ratio);
        assert!((v - 1.1).abs() < 1e-12);
    }
}
