use anyhow::Result;
use async_trait::async_trait;
use ethers::abi::{Function, Param, ParamType, StateMutability, Token};
use ethers::prelude::*;
use log::{debug, warn};
use std::sync::Arc;

/// A single contract read to be batched in a multicall.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Call {
    /// Target contract address
    pub target: Address,
    /// Encoded function call data (selector + arguments)
    pub call_data: Bytes,
}

/// Outcome of one batched call. `success == false` covers reverts inside the
/// aggregate call; the sibling results in the same batch are unaffected.
#[derive(Debug, Clone)]
pub struct CallResult {
    pub success: bool,
    pub return_data: Bytes,
}

/// Executes a sequence of independent contract reads, returning one result
/// per call in issue order. Implemented by [`Multicall`] for live chains and
/// by deterministic fakes in tests.
#[async_trait]
pub trait BatchReader: Send + Sync {
    async fn read(&self, calls: Vec<Call>) -> Result<Vec<CallResult>>;
}

/// Multicall batch executor.
///
/// Groups many independent reads into as few physical RPC round-trips as the
/// transport supports, via Multicall3 `aggregate3` with `allowFailure = true`
/// so a single revert never invalidates its siblings. Identical calls are
/// coalesced before dispatch and fanned back out to their original slots.
///
/// No retries are performed here; resilience belongs to the caller.
#[derive(Clone)]
pub struct Multicall<M: Middleware> {
    provider: Arc<M>,
    multicall_address: Address,
    batch_size: usize,
}

/// Coalesce identical calls, preserving first-seen order. Returns the unique
/// calls plus, for each original call, the index of its unique counterpart.
pub(crate) fn coalesce(calls: &[Call]) -> (Vec<Call>, Vec<usize>) {
    let mut unique = indexmap::IndexMap::new();
    let mut original_indices = vec![0; calls.len()];
    for (i, call) in calls.iter().enumerate() {
        let (index, _) = unique.insert_full((call.target, call.call_data.clone()), ());
        original_indices[i] = index;
    }
    let unique_calls = unique
        .into_keys()
        .map(|(target, call_data)| Call { target, call_data })
        .collect();
    (unique_calls, original_indices)
}

fn aggregate3_function() -> Function {
    // function aggregate3(Call3[] calldata calls) payable returns (Result[] memory returnData)
    // Call3: { address target, bool allowFailure, bytes callData }
    // Result: { bool success, bytes returnData }
    #[allow(deprecated)]
    Function {
        name: "aggregate3".to_string(),
        inputs: vec![Param {
            name: "calls".to_string(),
            kind: ParamType::Array(Box::new(ParamType::Tuple(vec![
                ParamType::Address,
                ParamType::Bool,
                ParamType::Bytes,
            ]))),
            internal_type: None,
        }],
        outputs: vec![Param {
            name: "returnData".to_string(),
            kind: ParamType::Array(Box::new(ParamType::Tuple(vec![
                ParamType::Bool,
                ParamType::Bytes,
            ]))),
            internal_type: None,
        }],
        constant: None,
        state_mutability: StateMutability::Payable,
    }
}

pub(crate) fn encode_aggregate3(calls: &[Call]) -> Result<Vec<u8>> {
    let call_tokens = calls
        .iter()
        .map(|call| {
            Token::Tuple(vec![
                Token::Address(call.target),
                Token::Bool(true), // allowFailure
                Token::Bytes(call.call_data.to_vec()),
            ])
        })
        .collect();
    Ok(aggregate3_function().encode_input(&[Token::Array(call_tokens)])?)
}

pub(crate) fn decode_aggregate3(response: &[u8]) -> Result<Vec<CallResult>> {
    let decoded = ethers::abi::decode(
        &[ParamType::Array(Box::new(ParamType::Tuple(vec![
            ParamType::Bool,
            ParamType::Bytes,
        ])))],
        response,
    )?;
    let results_array = decoded
        .into_iter()
        .next()
        .and_then(|t| t.into_array())
        .ok_or_else(|| anyhow::anyhow!("invalid multicall response format"))?;

    let mut results = Vec::with_capacity(results_array.len());
    for result_token in results_array {
        match result_token {
            Token::Tuple(mut tuple) if tuple.len() == 2 => {
                let data = match tuple.remove(1) {
                    Token::Bytes(data) => Bytes::from(data),
                    _ => return Err(anyhow::anyhow!("invalid multicall result tuple")),
                };
                let success = matches!(tuple.remove(0), Token::Bool(true));
                results.push(CallResult { success, return_data: data });
            }
            _ => return Err(anyhow::anyhow!("invalid multicall result tuple")),
        }
    }
    Ok(results)
}

impl<M: Middleware + 'static> Multicall<M> {
    pub fn new(provider: Arc<M>, multicall_address: Address, batch_size: usize) -> Self {
        // RPC providers start rejecting aggregate calls past ~200 entries
        let validated_batch_size = batch_size.clamp(50, 200);
        if batch_size > 200 {
            warn!(
                "Batch size {} exceeds recommended maximum (200), capping to 200",
                batch_size
            );
        }
        Self {
            provider,
            multicall_address,
            batch_size: validated_batch_size,
        }
    }

    /// Runs a batch of calls, optionally at a specific block.
    pub async fn run(&self, calls: Vec<Call>, block: Option<BlockId>) -> Result<Vec<CallResult>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let (unique_calls, original_indices) = coalesce(&calls);
        debug!(
            "Multicall coalesced {} calls into {}",
            calls.len(),
            unique_calls.len()
        );

        let mut unique_results: Vec<CallResult> = Vec::with_capacity(unique_calls.len());
        for chunk in unique_calls.chunks(self.batch_size) {
            let calldata = encode_aggregate3(chunk)?;
            let tx_request = TransactionRequest::new()
                .to(self.multicall_address)
                .data(calldata);
            let typed_tx: ethers::types::transaction::eip2718::TypedTransaction = tx_request.into();
            let response = self
                .provider
                .call(&typed_tx, block)
                .await
                .map_err(|e| anyhow::anyhow!("multicall transport failure: {}", e))?;
            unique_results.extend(decode_aggregate3(&response)?);
        }

        // Fan the coalesced results back out in issue order
        let results = original_indices
            .into_iter()
            .map(|index| unique_results[index].clone())
            .collect();
        Ok(results)
    }
}

#[async_trait]
impl<M: Middleware + 'static> BatchReader for Multicall<M> {
    async fn read(&self, calls: Vec<Call>) -> Result<Vec<CallResult>> {
        self.run(calls, None).await
    }
}

fn decode_first(function: &Function, result: &CallResult) -> Option<Token> {
    if !result.success {
        return None;
    }
    function
        .decode_output(&result.return_data)
        .ok()?
        .into_iter()
        .next()
}

/// Decode a single string output; `None` on revert or decode failure.
pub fn decode_string(function: &Function, result: &CallResult) -> Option<String> {
    decode_first(function, result)?.into_string()
}

/// Decode a single address output; `None` on revert or decode failure.
pub fn decode_address(function: &Function, result: &CallResult) -> Option<Address> {
    decode_first(function, result)?.into_address()
}

/// Decode a single uint output; `None` on revert or decode failure.
pub fn decode_uint(function: &Function, result: &CallResult) -> Option<U256> {
    decode_first(function, result)?.into_uint()
}

/// Decode a uint output that must fit a u8 (token decimals).
pub fn decode_u8(function: &Function, result: &CallResult) -> Option<u8> {
    let value = decode_uint(function, result)?;
    if value > U256::from(u8::MAX) {
        return None;
    }
    Some(value.low_u32() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(target: &str, data: &[u8]) -> Call {
        Call {
            target: target.parse().unwrap(),
            call_data: Bytes::from(data.to_vec()),
        }
    }

    #[test]
    fn test_coalesce_preserves_issue_order() {
        let a = call("0x1111111111111111111111111111111111111111", &[1]);
        let b = call("0x2222222222222222222222222222222222222222", &[2]);
        let calls = vec![a.clone(), b.clone(), a.clone(), b.clone(), a.clone()];

        let (unique, indices) = coalesce(&calls);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0], a);
        assert_eq!(unique[1], b);
        assert_eq!(indices, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_coalesce_distinguishes_same_target_different_data() {
        let a = call("0x1111111111111111111111111111111111111111", &[1]);
        let b = call("0x1111111111111111111111111111111111111111", &[2]);
        let (unique, indices) = coalesce(&[a, b]);
        assert_eq!(unique.len(), 2);
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_aggregate3_response_roundtrip() {
        // Encode a synthetic aggregate3 response and decode it back,
        // checking per-call success isolation survives.
        let encoded = ethers::abi::encode(&[Token::Array(vec![
            Token::Tuple(vec![Token::Bool(true), Token::Bytes(vec![0xaa, 0xbb])]),
            Token::Tuple(vec![Token::Bool(false), Token::Bytes(vec![])]),
        ])]);

        let results = decode_aggregate3(&encoded).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert_eq!(results[0].return_data.to_vec(), vec![0xaa, 0xbb]);
        assert!(!results[1].success);
        assert!(results[1].return_data.is_empty());
    }

    #[test]
    fn test_decode_helpers_reject_failed_calls() {
        let abi: ethers::abi::Abi = serde_json::from_str(
            r#"[{"name":"decimals","type":"function","inputs":[],"outputs":[{"name":"","type":"uint8"}],"stateMutability":"view"}]"#,
        )
        .unwrap();
        let decimals = abi.function("decimals").unwrap();

        let failed = CallResult { success: false, return_data: Bytes::new() };
        assert_eq!(decode_u8(decimals, &failed), None);

        let ok = CallResult {
            success: true,
            return_data: ethers::abi::encode(&[Token::Uint(U256::from(18u8))]).into(),
        };
        assert_eq!(decode_u8(decimals, &ok), Some(18));

        let too_big = CallResult {
            success: true,
            return_data: ethers::abi::encode(&[Token::Uint(U256::from(300u32))]).into(),
        };
        assert_eq!(decode_u8(decimals, &too_big), None);
    }

    #[test]
    fn test_encode_aggregate3_selector() {
        let c = call("0x1111111111111111111111111111111111111111", &[0x01]);
        let data = encode_aggregate3(&[c]).unwrap();
        // aggregate3((address,bool,bytes)[]) selector
        assert_eq!(&data[..4], &[0x82, 0xad, 0x56, 0xcb]);
    }
}
