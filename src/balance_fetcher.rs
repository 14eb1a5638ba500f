// src/balance_fetcher.rs
//
// Per-user balance resolution: reads wallet-held jar token balances and
// farm staked/earned balances in one batch, then drills each raw balance
// through its token's underlying tree.

use crate::balance_drill::{drill, TokenBalance};
use crate::contracts::{ERC20_ABI, GAUGE_ABI};
use crate::multicall::{decode_uint, BatchReader, Call};
use crate::tokens::{ContractPosition, Token};
use anyhow::Result;
use ethers::abi::Token as AbiToken;
use ethers::types::Address;
use log::debug;
use serde::Serialize;

/// One labeled group of a user's drilled balances.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceGroup {
    pub label: String,
    pub assets: Vec<TokenBalance>,
}

/// Resolve a user's balances across this pass's jar tokens and farm
/// positions. Jar holdings come from the token contract itself; farm
/// holdings pair the staked balance with the earned reward. Zero balances
/// and failed reads are skipped per asset.
pub async fn fetch_balances(
    reader: &dyn BatchReader,
    user: Address,
    jar_tokens: &[Token],
    positions: &[ContractPosition],
) -> Result<Vec<BalanceGroup>> {
    let balance_of_fn = ERC20_ABI.function("balanceOf")?;
    let gauge_balance_fn = GAUGE_ABI.function("balanceOf")?;
    let earned_fn = GAUGE_ABI.function("earned")?;
    let user_arg = [AbiToken::Address(user)];

    let mut calls = Vec::with_capacity(jar_tokens.len() + positions.len() * 2);
    for token in jar_tokens {
        calls.push(Call {
            target: token.address,
            call_data: balance_of_fn.encode_input(&user_arg)?.into(),
        });
    }
    for position in positions {
        calls.push(Call {
            target: position.address,
            call_data: gauge_balance_fn.encode_input(&user_arg)?.into(),
        });
        calls.push(Call {
            target: position.address,
            call_data: earned_fn.encode_input(&user_arg)?.into(),
        });
    }
    let results = reader.read(calls).await?;

    let mut jar_assets = Vec::new();
    for (token, result) in jar_tokens.iter().zip(&results) {
        match decode_uint(balance_of_fn, result) {
            Some(raw) if !raw.is_zero() => jar_assets.push(drill(token, raw)),
            Some(_) => {}
            None => debug!("jar {:?}: balance read failed for {:?}", token.address, user),
        }
    }

    let mut farm_assets = Vec::new();
    for (i, position) in positions.iter().enumerate() {
        let staked_result = &results[jar_tokens.len() + i * 2];
        let earned_result = &results[jar_tokens.len() + i * 2 + 1];
        let (staked_token, reward_token) =
            match position.supplied_token().zip(position.claimable_token()) {
                Some(pair) => pair,
                None => continue,
            };
        match decode_uint(gauge_balance_fn, staked_result) {
            Some(raw) if !raw.is_zero() => farm_assets.push(drill(staked_token, raw)),
            Some(_) => {}
            None => debug!("farm {:?}: staked read failed for {:?}", position.address, user),
        }
        match decode_uint(earned_fn, earned_result) {
            Some(raw) if !raw.is_zero() => farm_assets.push(drill(reward_token, raw)),
            Some(_) => {}
            None => debug!("farm {:?}: earned read failed for {:?}", position.address, user),
        }
    }

    Ok(vec![
        BalanceGroup { label: "Jars".into(), assets: jar_assets },
        BalanceGroup { label: "Farms".into(), assets: farm_assets },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multicall::CallResult;
    use crate::tokens::{Network, PositionDataProps, TokenNode};
    use async_trait::async_trait;
    use ethers::types::{Bytes, U256};
    use std::collections::HashMap;

    struct FakeReader {
        responses: HashMap<(Address, Bytes), Bytes>,
    }

    #[async_trait]
    impl BatchReader for FakeReader {
        async fn read(&self, calls: Vec<Call>) -> Result<Vec<CallResult>> {
            Ok(calls
                .into_iter()
                .map(|c| match self.responses.get(&(c.target, c.call_data)) {
                    Some(data) => CallResult { success: true, return_data: data.clone() },
                    None => CallResult { success: false, return_data: Bytes::new() },
                })
                .collect())
        }
    }

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn encode_uint(value: U256) -> Bytes {
        ethers::abi::encode(&[AbiToken::Uint(value)]).into()
    }

    fn jar_token(address: Address, underlying: Address) -> Token {
        let mut jar = Token::base(Network::Ethereum, address, "pDAI", 18, 2.2);
        jar.price_per_share = Some(1.1);
        jar.tokens = vec![TokenNode::supplied(Token::base(
            Network::Ethereum,
            underlying,
            "DAI",
            18,
            2.0,
        ))];
        jar
    }

    #[tokio::test]
    async fn test_user_balances_grouped_and_drilled() {
        let user = addr(9);
        let jar_address = addr(1);
        let underlying = addr(2);
        let farm = addr(3);
        let reward_address = addr(4);

        let jar = jar_token(jar_address, underlying);
        let reward = Token::base(Network::Ethereum, reward_address, "PICKLE", 18, 3.0);
        let position = ContractPosition {
            network: Network::Ethereum,
            app_id: "pickle".into(),
            group_id: "farm".into(),
            address: farm,
            tokens: vec![TokenNode::supplied(jar.clone()), TokenNode::claimable(reward)],
            data: PositionDataProps::default(),
        };

        let user_arg = [AbiToken::Address(user)];
        let balance_of = ERC20_ABI.function("balanceOf").unwrap();
        let gauge_balance = GAUGE_ABI.function("balanceOf").unwrap();
        let earned = GAUGE_ABI.function("earned").unwrap();

        let mut responses = HashMap::new();
        // wallet-held jar balance: 2.0
        responses.insert(
            (jar_address, balance_of.encode_input(&user_arg).unwrap().into()),
            encode_uint(U256::from(2u64) * U256::exp10(18)),
        );
        // staked in farm: 3.0, earned: 0.5
        responses.insert(
            (farm, gauge_balance.encode_input(&user_arg).unwrap().into()),
            encode_uint(U256::from(3u64) * U256::exp10(18)),
        );
        responses.insert(
            (farm, earned.encode_input(&user_arg).unwrap().into()),
            encode_uint(U256::exp10(18) / 2),
        );

        let groups = fetch_balances(
            &FakeReader { responses },
            user,
            &[jar.clone()],
            std::slice::from_ref(&position),
        )
        .await
        .unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "Jars");
        assert_eq!(groups[0].assets.len(), 1);
        assert_eq!(groups[0].assets[0].balance, 2.0);
        // drilled into the underlying
        assert_eq!(groups[0].assets[0].underlying[0].token.symbol, "DAI");

        assert_eq!(groups[1].label, "Farms");
        assert_eq!(groups[1].assets.len(), 2);
        assert_eq!(groups[1].assets[0].balance, 3.0);
        assert!((groups[1].assets[0].balance_usd - 6.6).abs() < 1e-9);
        assert_eq!(groups[1].assets[1].token.symbol, "PICKLE");
        assert_eq!(groups[1].assets[1].balance, 0.5);
    }

    #[tokio::test]
    async fn test_zero_and_failed_balances_skipped() {
        let user = addr(9);
        let jar_address = addr(1);
        let jar = jar_token(jar_address, addr(2));

        let balance_of = ERC20_ABI.function("balanceOf").unwrap();
        let mut responses = HashMap::new();
        responses.insert(
            (jar_address, balance_of.encode_input(&[AbiToken::Address(user)]).unwrap().into()),
            encode_uint(U256::zero()),
        );

        let groups = fetch_balances(&FakeReader { responses }, user, &[jar], &[])
            .await
            .unwrap();
        assert!(groups[0].assets.is_empty());
        assert!(groups[1].assets.is_empty());
    }
}
