//! Transaction orchestration.
//!
//! Every state-changing entry point runs
//! `Validate → Normalize → (EnsureAllowance) → Submit → Confirmed`.
//! Validation failures return before the chain is contacted; failures after
//! submission carry the chain's error under an `"<operation>: <method>"`
//! prefix.

mod fai;
mod governance;
mod markets;

use crate::allowance::{AllowanceGate, AllowanceOutcome};
use crate::amount::{normalize, Amount};
use crate::assets::AssetRegistry;
use crate::delegation::DelegationSigner;
use crate::error::{ArgumentError, ClientError, Result};
use crate::options::{Stage, TxOptions};
use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use fortress_chain::{send, ChainClient, SendOptions, TxReceipt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a state-changing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxOutcome {
    /// Receipt of the operation itself
    pub receipt: TxReceipt,
    /// Receipt of the approval sent ahead of it, if any
    pub approval: Option<TxReceipt>,
}

impl TxOutcome {
    fn new(receipt: TxReceipt) -> Self {
        Self {
            receipt,
            approval: None,
        }
    }

    fn with_approval(receipt: TxReceipt, allowance: AllowanceOutcome) -> Self {
        Self {
            receipt,
            approval: allowance.receipt().cloned(),
        }
    }
}

/// Entry points for markets, FAI and governance.
#[derive(Debug, Clone)]
pub struct TransactionOrchestrator {
    chain: Arc<dyn ChainClient>,
    registry: Arc<AssetRegistry>,
    allowance: AllowanceGate,
    delegation: DelegationSigner,
}

impl TransactionOrchestrator {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        registry: Arc<AssetRegistry>,
        allowance: AllowanceGate,
        delegation: DelegationSigner,
    ) -> Self {
        Self {
            chain,
            registry,
            allowance,
            delegation,
        }
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// Normalize a non-zero amount.
    fn mantissa(&self, amount: &Amount, decimals: u8, options: &TxOptions) -> Result<U256> {
        options.validate()?;
        let value = normalize(amount, decimals, options.mantissa)?;
        if value.is_zero() {
            return Err(ArgumentError::amount(amount, "must be greater than zero").into());
        }
        debug!(stage = %Stage::Normalize, amount = %amount, decimals, mantissa = %value, "Amount normalized");
        Ok(value)
    }

    /// Sending account.
    async fn account(&self, op: &str) -> Result<Address> {
        self.chain
            .account()
            .await
            .map_err(|e| ClientError::chain(format!("{}: account", op), e))
    }

    /// Approve `spender` for `amount` of `token` unless skipped.
    async fn ensure_allowance(
        &self,
        op: &str,
        spender: Address,
        token: Option<Address>,
        amount: U256,
        skip: bool,
        options: &TxOptions,
    ) -> Result<AllowanceOutcome> {
        if token.is_none() || skip {
            return self
                .allowance
                .ensure_allowance(Address::ZERO, spender, token, amount, skip, &SendOptions::default())
                .await;
        }
        let owner = self.account(op).await?;
        let approve_options = SendOptions {
            gas_price: options.gas_price,
            ..Default::default()
        };
        self.allowance
            .ensure_allowance(owner, spender, token, amount, skip, &approve_options)
            .await
    }

    /// Encode and send `call`, waiting for inclusion.
    async fn submit<C>(&self, op: &str, to: Address, call: &C, options: &SendOptions) -> Result<TxReceipt>
    where
        C: SolCall + Sync,
    {
        let method = C::SIGNATURE.split('(').next().unwrap_or(C::SIGNATURE);
        info!(
            stage = %Stage::Submit,
            op,
            to = %to,
            method,
            value = %options.value,
            "Submitting transaction"
        );

        let receipt = send(self.chain.as_ref(), to, call, options).await.map_err(|e| {
            warn!(op, method, error = %e, "Transaction failed");
            ClientError::chain(format!("{}: {}", op, method), e)
        })?;

        info!(
            stage = %Stage::Confirmed,
            op,
            tx_hash = %receipt.tx_hash,
            block = ?receipt.block_number,
            gas_used = receipt.gas_used,
            "Transaction confirmed"
        );
        Ok(receipt)
    }
}
