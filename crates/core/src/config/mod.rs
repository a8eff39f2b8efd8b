//! Configuration: client runtime settings and per-network deployments.

mod client;
mod deployment;
mod env;

pub use client::ClientConfig;
pub use deployment::{DeploymentConfig, MarketEntry, NetworkSection, OracleAssetEntry};
pub use env::expand_env;
