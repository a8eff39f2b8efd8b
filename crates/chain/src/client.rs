//! Chain access capability.
//!
//! Everything above this layer talks to the chain through [`ChainClient`]:
//! a point-in-time read (`eth_call`) and a state-changing send that resolves
//! once the transaction is included. Calldata is produced by the `sol!`
//! bindings, so the trait itself stays object safe and transport agnostic.

use crate::error::{ChainError, ChainResult};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

/// Per-transaction overrides forwarded to the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Native asset attached to the call (wei)
    pub value: U256,
    /// Explicit gas limit, otherwise the transport estimates
    pub gas_limit: Option<u64>,
    /// Explicit legacy gas price in wei
    pub gas_price: Option<u128>,
}

impl SendOptions {
    /// Options carrying a native value and no gas overrides.
    pub fn with_value(value: U256) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }
}

/// Receipt of an included transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// Read/send capability over an EVM chain.
#[async_trait]
pub trait ChainClient: Send + Sync + Debug {
    /// Chain id the client is connected to.
    fn chain_id(&self) -> u64;

    /// Address that signs and pays for sends.
    async fn account(&self) -> ChainResult<Address>;

    /// Execute a read-only call against the latest block.
    async fn call(&self, to: Address, input: Bytes) -> ChainResult<Bytes>;

    /// Submit a transaction and wait until it is included.
    ///
    /// A reverted transaction is reported as [`ChainError::Reverted`].
    async fn send(&self, to: Address, input: Bytes, options: &SendOptions) -> ChainResult<TxReceipt>;
}

/// Encode `call`, run it as a read and decode the typed return.
pub async fn read<C>(chain: &dyn ChainClient, to: Address, call: &C) -> ChainResult<C::Return>
where
    C: SolCall + Sync,
{
    debug!(to = %to, method = C::SIGNATURE, "Chain read");
    let output = chain.call(to, Bytes::from(call.abi_encode())).await?;
    C::abi_decode_returns(&output, true)
        .map_err(|e| ChainError::Decode(format!("{}: {}", C::SIGNATURE, e)))
}

/// Encode `call` and submit it as a transaction.
pub async fn send<C>(
    chain: &dyn ChainClient,
    to: Address,
    call: &C,
    options: &SendOptions,
) -> ChainResult<TxReceipt>
where
    C: SolCall + Sync,
{
    debug!(
        to = %to,
        method = C::SIGNATURE,
        value = %options.value,
        "Chain send"
    );
    chain.send(to, Bytes::from(call.abi_encode()), options).await
}
