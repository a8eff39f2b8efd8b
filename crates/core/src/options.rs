//! Per-call transaction options.

use crate::error::ArgumentError;
use alloy::primitives::U256;
use fortress_chain::SendOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Options accepted by every state-changing operation.
///
/// `value` is not settable: the native market derives it from the amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOptions {
    /// The amount is already scaled by decimals (default `false`)
    #[serde(default)]
    pub mantissa: bool,
    /// Explicit gas limit, estimated when absent
    #[serde(default)]
    pub gas_limit: Option<u64>,
    /// Explicit gas price in wei
    #[serde(default)]
    pub gas_price: Option<u128>,
}

impl TxOptions {
    /// Options for an amount already expressed as a mantissa.
    pub fn mantissa() -> Self {
        Self {
            mantissa: true,
            ..Default::default()
        }
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    /// Reject values no transport would accept.
    pub fn validate(&self) -> Result<(), ArgumentError> {
        if self.gas_limit == Some(0) {
            return Err(ArgumentError::option("gas_limit", "must be positive"));
        }
        if self.gas_price == Some(0) {
            return Err(ArgumentError::option("gas_price", "must be positive"));
        }
        Ok(())
    }

    /// Transport options with the given native value attached.
    pub fn send_options(&self, value: U256) -> SendOptions {
        SendOptions {
            value,
            gas_limit: self.gas_limit,
            gas_price: self.gas_price,
        }
    }
}

/// Orchestration stage, used as a log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Normalize,
    Approve,
    Submit,
    Confirmed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Normalize => "normalize",
            Stage::Approve => "approve",
            Stage::Submit => "submit",
            Stage::Confirmed => "confirmed",
        };
        f.write_str(name)
    }
}
