//! Fortress chain interaction layer.
//!
//! This crate provides:
//! - The chain capability (`ChainClient`): point-in-time reads and sends that
//!   resolve on inclusion
//! - The typed-data signing capability (`TypedDataSigner`) with local-key and
//!   remote-proxy implementations
//! - An Alloy JSON-RPC implementation of the chain capability
//! - `sol!` bindings for the fToken markets, Comptroller, oracle, FAI
//!   controller and governance contracts
//!
//! Enable the `test-utils` feature for the recording [`test_utils::MockChain`].

mod client;
pub mod contracts;
mod error;
mod provider;
mod signer;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use client::{read, send, ChainClient, SendOptions, TxReceipt};
pub use error::{ChainError, ChainResult};
pub use provider::{RpcChainClient, RpcChainClientBuilder};
pub use signer::{
    LocalKeySigner, RpcTypedDataSigner, TypedDataRequest, TypedDataSigner, TypedSignature,
};
