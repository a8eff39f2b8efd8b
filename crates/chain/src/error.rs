//! Errors reported by the chain capabilities.

use alloy::primitives::B256;
use thiserror::Error;

/// Failure reported by a read, send or signing capability.
///
/// Orchestration code never inspects these beyond wrapping them with a
/// component prefix, so the variants stay close to what the transport saw.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("rpc transport error: {0}")]
    Transport(String),

    #[error("transaction reverted: {tx_hash}")]
    Reverted { tx_hash: B256 },

    #[error("failed to decode return data: {0}")]
    Decode(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("no account configured for sending")]
    NoAccount,

    #[error("signing failed: {0}")]
    Signing(String),
}

impl ChainError {
    /// Whether the failure happened after the transaction reached the chain.
    pub fn is_on_chain(&self) -> bool {
        matches!(self, ChainError::Reverted { .. })
    }
}

pub type ChainResult<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverted_is_on_chain() {
        let err = ChainError::Reverted { tx_hash: B256::ZERO };
        assert!(err.is_on_chain());
        assert!(!ChainError::Transport("connection refused".into()).is_on_chain());
        assert!(err.to_string().starts_with("transaction reverted"));
    }
}
