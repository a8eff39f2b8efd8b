//! In-memory chain used by tests across the workspace.
//!
//! [`MockChain`] serves canned ABI-encoded return data keyed by
//! `(contract, calldata)` or `(contract, selector)` and records every read and send so tests can
//! assert on the exact calldata the client produced.

use crate::client::{ChainClient, SendOptions, TxReceipt};
use crate::error::{ChainError, ChainResult};
use alloy::primitives::{keccak256, Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// A read issued against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRead {
    pub to: Address,
    pub input: Bytes,
}

impl RecordedRead {
    pub fn selector(&self) -> [u8; 4] {
        selector_of(&self.input)
    }
}

/// A transaction submitted to the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSend {
    pub to: Address,
    pub input: Bytes,
    pub options: SendOptions,
}

impl RecordedSend {
    pub fn selector(&self) -> [u8; 4] {
        selector_of(&self.input)
    }

    /// Whether this send encodes a call to `C`.
    pub fn is<C: SolCall>(&self) -> bool {
        self.selector() == C::SELECTOR
    }

    /// Decode the calldata as `C`, panicking on mismatch.
    pub fn decode<C: SolCall>(&self) -> C {
        C::abi_decode(&self.input, true)
            .unwrap_or_else(|e| panic!("send to {} is not {}: {}", self.to, C::SIGNATURE, e))
    }
}

fn selector_of(input: &[u8]) -> [u8; 4] {
    let mut selector = [0u8; 4];
    let len = input.len().min(4);
    selector[..len].copy_from_slice(&input[..len]);
    selector
}

/// Recording chain double.
#[derive(Debug)]
pub struct MockChain {
    chain_id: u64,
    account: Option<Address>,
    responses: Mutex<HashMap<(Address, [u8; 4]), Bytes>>,
    exact: Mutex<HashMap<(Address, Bytes), Bytes>>,
    reverting: Mutex<HashSet<[u8; 4]>>,
    reads: Mutex<Vec<RecordedRead>>,
    sends: Mutex<Vec<RecordedSend>>,
}

impl MockChain {
    /// Mock chain with a sending account.
    pub fn new(chain_id: u64, account: Address) -> Self {
        Self {
            chain_id,
            account: Some(account),
            responses: Mutex::new(HashMap::new()),
            exact: Mutex::new(HashMap::new()),
            reverting: Mutex::new(HashSet::new()),
            reads: Mutex::new(Vec::new()),
            sends: Mutex::new(Vec::new()),
        }
    }

    /// Mock chain without any account.
    pub fn read_only(chain_id: u64) -> Self {
        Self {
            account: None,
            ..Self::new(chain_id, Address::ZERO)
        }
    }

    /// Serve `value` for every call of `C` on `to`.
    pub fn on_read<C: SolCall, V: SolValue>(&self, to: Address, value: V) {
        self.responses
            .lock()
            .insert((to, C::SELECTOR), Bytes::from(value.abi_encode()));
    }

    /// Serve `value` for this exact call on `to`. Takes precedence over
    /// [`MockChain::on_read`].
    pub fn on_call<C: SolCall, V: SolValue>(&self, to: Address, call: &C, value: V) {
        self.exact.lock().insert(
            (to, Bytes::from(call.abi_encode())),
            Bytes::from(value.abi_encode()),
        );
    }

    /// Make every send of `C` revert.
    pub fn revert_on<C: SolCall>(&self) {
        self.reverting.lock().insert(C::SELECTOR);
    }

    pub fn reads(&self) -> Vec<RecordedRead> {
        self.reads.lock().clone()
    }

    pub fn sends(&self) -> Vec<RecordedSend> {
        self.sends.lock().clone()
    }

    /// Whether anything (read or send) reached the chain.
    pub fn touched(&self) -> bool {
        !self.reads.lock().is_empty() || !self.sends.lock().is_empty()
    }

    /// Forget recorded traffic, keeping canned responses.
    pub fn clear_history(&self) {
        self.reads.lock().clear();
        self.sends.lock().clear();
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn account(&self) -> ChainResult<Address> {
        self.account.ok_or(ChainError::NoAccount)
    }

    async fn call(&self, to: Address, input: Bytes) -> ChainResult<Bytes> {
        let selector = selector_of(&input);
        self.reads.lock().push(RecordedRead {
            to,
            input: input.clone(),
        });
        if let Some(output) = self.exact.lock().get(&(to, input)).cloned() {
            return Ok(output);
        }
        self.responses
            .lock()
            .get(&(to, selector))
            .cloned()
            .ok_or_else(|| {
                ChainError::Transport(format!(
                    "execution reverted: no response for 0x{} on {}",
                    hex::encode(selector),
                    to
                ))
            })
    }

    async fn send(&self, to: Address, input: Bytes, options: &SendOptions) -> ChainResult<TxReceipt> {
        if self.account.is_none() {
            return Err(ChainError::NoAccount);
        }
        let selector = selector_of(&input);
        let index = {
            let mut sends = self.sends.lock();
            sends.push(RecordedSend {
                to,
                input,
                options: options.clone(),
            });
            sends.len() as u64
        };
        let tx_hash = keccak256(U256::from(index).to_be_bytes::<32>());

        if self.reverting.lock().contains(&selector) {
            return Err(ChainError::Reverted { tx_hash });
        }
        Ok(TxReceipt {
            tx_hash,
            block_number: Some(1_000 + index),
            gas_used: 21_000,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::IERC20;
    use crate::{read, send};

    #[tokio::test]
    async fn test_mock_serves_and_records() {
        let token = Address::repeat_byte(0x01);
        let owner = Address::repeat_byte(0x02);
        let chain = MockChain::new(97, owner);
        chain.on_read::<IERC20::allowanceCall, _>(token, U256::from(42u64));

        let call = IERC20::allowanceCall { owner, spender: token };
        let allowance = read(&chain, token, &call).await.unwrap();
        assert_eq!(allowance._0, U256::from(42u64));
        assert_eq!(chain.reads().len(), 1);
        assert_eq!(chain.reads()[0].selector(), IERC20::allowanceCall::SELECTOR);

        let approve = IERC20::approveCall { spender: owner, amount: U256::from(7u64) };
        send(&chain, token, &approve, &SendOptions::default()).await.unwrap();
        let sends = chain.sends();
        assert!(sends[0].is::<IERC20::approveCall>());
        assert_eq!(sends[0].decode::<IERC20::approveCall>().amount, U256::from(7u64));
    }

    #[tokio::test]
    async fn test_mock_missing_response_and_revert() {
        let chain = MockChain::new(97, Address::ZERO);
        let call = IERC20::balanceOfCall { account: Address::ZERO };
        assert!(read(&chain, Address::ZERO, &call).await.is_err());

        chain.revert_on::<IERC20::approveCall>();
        let approve = IERC20::approveCall { spender: Address::ZERO, amount: U256::ZERO };
        let err = send(&chain, Address::ZERO, &approve, &SendOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_on_chain());
        assert_eq!(chain.sends().len(), 1);
    }

    #[tokio::test]
    async fn test_exact_call_takes_precedence() {
        let token = Address::repeat_byte(0x01);
        let chain = MockChain::read_only(97);
        chain.on_read::<IERC20::balanceOfCall, _>(token, U256::from(1u64));
        let rich = IERC20::balanceOfCall { account: Address::repeat_byte(0xaa) };
        chain.on_call(token, &rich, U256::from(1_000u64));

        assert_eq!(read(&chain, token, &rich).await.unwrap()._0, U256::from(1_000u64));
        let other = IERC20::balanceOfCall { account: Address::repeat_byte(0xbb) };
        assert_eq!(read(&chain, token, &other).await.unwrap()._0, U256::from(1u64));
    }
}
