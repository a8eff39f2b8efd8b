//! Error taxonomy for client operations.
//!
//! Validation failures (`InvalidArgument`, `UnsupportedAsset`) are raised
//! before anything reaches the chain. `ChainCall` wraps whatever the chain
//! capability reported with the name of the step that issued it.
//!
//! A failure after a transaction was included is final: if an approval went
//! through and the dependent transaction reverted, the new allowance stays
//! on-chain. There is no rollback for included transactions.

use fortress_chain::ChainError;
use thiserror::Error;

/// Malformed caller input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("invalid amount '{value}': {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error("invalid address '{value}': {reason}")]
    InvalidAddress { value: String, reason: String },

    #[error("invalid option {field}: {reason}")]
    InvalidOption { field: String, reason: String },
}

impl ArgumentError {
    pub(crate) fn amount(value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn address(value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn option(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Client operation errors.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ArgumentError),

    #[error("unsupported asset '{symbol}' on {network}")]
    UnsupportedAsset { symbol: String, network: String },

    #[error("oracle has no price for '{symbol}'")]
    PriceUnavailable { symbol: String },

    #[error("no signer available for typed-data signatures")]
    SigningUnavailable,

    #[error("{context}: {source}")]
    ChainCall {
        context: String,
        #[source]
        source: ChainError,
    },
}

impl ClientError {
    /// Wrap a chain failure with the component step that issued it.
    pub fn chain(context: impl Into<String>, source: ChainError) -> Self {
        Self::ChainCall {
            context: context.into(),
            source,
        }
    }

    /// Whether the call failed before touching the chain.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidArgument(_)
                | ClientError::UnsupportedAsset { .. }
                | ClientError::SigningUnavailable
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_error_is_prefixed() {
        let err = ClientError::chain(
            "supply: mint",
            ChainError::Transport("connection reset".into()),
        );
        assert_eq!(err.to_string(), "supply: mint: rpc transport error: connection reset");
        assert!(!err.is_local());
    }

    #[test]
    fn test_argument_errors_are_local() {
        let err: ClientError = ArgumentError::amount("-1", "negative").into();
        assert!(err.is_local());
        assert!(err.to_string().contains("invalid amount '-1'"));
    }
}
