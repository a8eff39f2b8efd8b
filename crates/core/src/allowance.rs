//! Allowance check ahead of token-moving transactions.
//!
//! The allowance is read once, right before the approve decision, and is not
//! re-read before the dependent transaction. Concurrent calls for the same
//! owner/spender/token may both approve; the contract performs the
//! authoritative check at execution time.

use crate::error::{ClientError, Result};
use crate::options::Stage;
use alloy::primitives::{Address, U256};
use fortress_chain::contracts::IERC20;
use fortress_chain::{read, send, ChainClient, SendOptions, TxReceipt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of an allowance check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowanceOutcome {
    /// Native asset or caller opted out; nothing was read
    Skipped,
    /// Existing allowance covers the amount
    Sufficient { current: U256 },
    /// An approval for exactly the required amount was included
    Approved { previous: U256, receipt: TxReceipt },
}

impl AllowanceOutcome {
    /// Receipt of the approval, if one was sent.
    pub fn receipt(&self) -> Option<&TxReceipt> {
        match self {
            AllowanceOutcome::Approved { receipt, .. } => Some(receipt),
            _ => None,
        }
    }
}

/// Decides whether an approve must precede a token transfer.
#[derive(Debug, Clone)]
pub struct AllowanceGate {
    chain: Arc<dyn ChainClient>,
}

impl AllowanceGate {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }

    /// Ensure `spender` may move `required` of `token` from `owner`.
    ///
    /// `token` is `None` for the native asset. With `skip` set nothing is
    /// read or sent.
    pub async fn ensure_allowance(
        &self,
        owner: Address,
        spender: Address,
        token: Option<Address>,
        required: U256,
        skip: bool,
        options: &SendOptions,
    ) -> Result<AllowanceOutcome> {
        let Some(token) = token else {
            debug!(spender = %spender, "Native asset, no allowance");
            return Ok(AllowanceOutcome::Skipped);
        };
        if skip {
            debug!(token = %token, spender = %spender, "Approval skipped by caller");
            return Ok(AllowanceOutcome::Skipped);
        }

        let current = read(self.chain.as_ref(), token, &IERC20::allowanceCall { owner, spender })
            .await
            .map_err(|e| ClientError::chain("allowance: read", e))?
            ._0;

        if current >= required {
            debug!(
                token = %token,
                spender = %spender,
                current = %current,
                required = %required,
                "Allowance sufficient"
            );
            return Ok(AllowanceOutcome::Sufficient { current });
        }

        info!(
            stage = %Stage::Approve,
            token = %token,
            spender = %spender,
            current = %current,
            required = %required,
            "Approving spender"
        );
        let approve = IERC20::approveCall {
            spender,
            amount: required,
        };
        let receipt = send(self.chain.as_ref(), token, &approve, options)
            .await
            .map_err(|e| {
                warn!(token = %token, error = %e, "Approval failed");
                ClientError::chain("allowance: approve", e)
            })?;

        Ok(AllowanceOutcome::Approved {
            previous: current,
            receipt,
        })
    }
}
