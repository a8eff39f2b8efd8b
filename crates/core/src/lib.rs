//! Fortress client core.
//!
//! This crate provides the protocol logic on top of the chain capabilities:
//! - Asset registry with per-network decimals and fToken markets
//! - Amount normalization and EIP-55 address checksums
//! - Allowance gate ahead of token-moving transactions
//! - Cross-asset price resolution through the protocol oracle
//! - EIP-712 delegation and ballot signatures
//! - Transaction orchestration for markets, FAI and governance

pub mod allowance;
pub mod amount;
pub mod assets;
pub mod checksum;
pub mod config;
pub mod delegation;
mod error;
mod options;
mod orchestrator;
pub mod price;

pub use allowance::{AllowanceGate, AllowanceOutcome};
pub use amount::{format_units, normalize, Amount};
pub use assets::{AssetRef, AssetRegistry, AssetRegistryBuilder, Market, Network, OracleAsset};
pub use checksum::{checksum, is_checksum_valid, parse_address};
pub use config::{ClientConfig, DeploymentConfig};
pub use delegation::{expiry_in, DelegationSigner, SignedBallot, SignedDelegation};
pub use error::{ArgumentError, ClientError, Result};
pub use options::{Stage, TxOptions};
pub use orchestrator::{TransactionOrchestrator, TxOutcome};
pub use price::{PriceQuote, PriceResolver};
