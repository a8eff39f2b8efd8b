//! Client configuration.
//!
//! Loaded from a TOML file (`FORTRESS_CONFIG`) or from individual
//! `FORTRESS_*` environment variables. Every field has a default so an empty
//! file is a valid mainnet configuration.

use super::env::expand_env_strict;
use crate::assets::Network;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration for a Fortress client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Network name ("mainnet" or "testnet")
    #[serde(default = "default_network")]
    pub network: String,

    /// JSON-RPC endpoint, `${VAR}` references are expanded
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Deployment file listing markets and contracts
    #[serde(default = "default_deployment")]
    pub deployment: PathBuf,

    /// Name of the environment variable holding the signing key
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,

    /// Account managed by the node, used when no private key is set.
    /// Typed data is then signed remotely via `eth_signTypedData_v4`.
    #[serde(default)]
    pub signer_address: Option<String>,

    /// Seconds to wait for a receipt
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,

    /// Confirmations required before a receipt is returned
    #[serde(default = "default_required_confirmations")]
    pub required_confirmations: u64,

    /// Quote asset used when a price is requested without one
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,

    /// EIP-712 domain name of the governance token
    #[serde(default = "default_token_domain")]
    pub token_domain: String,

    /// EIP-712 domain name of the governor
    #[serde(default = "default_governor_domain")]
    pub governor_domain: String,
}

fn default_network() -> String {
    "mainnet".to_string()
}
fn default_rpc_url() -> String {
    "https://bsc-dataseed.binance.org".to_string()
}
fn default_deployment() -> PathBuf {
    PathBuf::from("config/bsc-mainnet.toml")
}
fn default_private_key_env() -> String {
    "FORTRESS_PRIVATE_KEY".to_string()
}
fn default_confirmation_timeout() -> u64 {
    120
}
fn default_required_confirmations() -> u64 {
    1
}
fn default_quote_asset() -> String {
    "USDC".to_string()
}
fn default_token_domain() -> String {
    "Fortress".to_string()
}
fn default_governor_domain() -> String {
    "Fortress Governor Alpha".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            rpc_url: default_rpc_url(),
            deployment: default_deployment(),
            private_key_env: default_private_key_env(),
            signer_address: None,
            confirmation_timeout_secs: default_confirmation_timeout(),
            required_confirmations: default_required_confirmations(),
            quote_asset: default_quote_asset(),
            token_domain: default_token_domain(),
            governor_domain: default_governor_domain(),
        }
    }
}

impl ClientConfig {
    /// Load from a TOML file. Relative deployment paths resolve against the
    /// file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let mut config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;

        if config.deployment.is_relative() {
            if let Some(dir) = path.parent() {
                config.deployment = dir.join(&config.deployment);
            }
        }
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: ClientConfig = toml::from_str(content)?;
        config.expand_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `FORTRESS_CONFIG`, or from `FORTRESS_*` variables on top of
    /// the defaults. A `.env` file is read first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        if let Ok(path) = std::env::var("FORTRESS_CONFIG") {
            return Self::from_file(path);
        }

        let mut config = Self::default();
        let var = |name: &str| std::env::var(name).ok();

        if let Some(v) = var("FORTRESS_NETWORK") {
            config.network = v;
        }
        if let Some(v) = var("FORTRESS_RPC_URL") {
            config.rpc_url = v;
        }
        if let Some(v) = var("FORTRESS_DEPLOYMENT") {
            config.deployment = PathBuf::from(v);
        }
        if let Some(v) = var("FORTRESS_PRIVATE_KEY_ENV") {
            config.private_key_env = v;
        }
        if let Some(v) = var("FORTRESS_SIGNER_ADDRESS") {
            config.signer_address = Some(v);
        }
        if let Some(v) = var("FORTRESS_CONFIRMATION_TIMEOUT_SECS") {
            config.confirmation_timeout_secs = v
                .parse()
                .context("FORTRESS_CONFIRMATION_TIMEOUT_SECS must be an integer")?;
        }
        if let Some(v) = var("FORTRESS_REQUIRED_CONFIRMATIONS") {
            config.required_confirmations = v
                .parse()
                .context("FORTRESS_REQUIRED_CONFIRMATIONS must be an integer")?;
        }
        if let Some(v) = var("FORTRESS_QUOTE_ASSET") {
            config.quote_asset = v;
        }

        config.expand_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    fn expand_env_vars(&mut self) -> Result<()> {
        self.rpc_url = expand_env_strict("rpc_url", &self.rpc_url)?;
        if let Some(address) = &self.signer_address {
            self.signer_address = Some(expand_env_strict("signer_address", address)?);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.network()?;
        if self.confirmation_timeout_secs == 0 {
            anyhow::bail!("confirmation_timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn network(&self) -> Result<Network> {
        Network::from_name(&self.network)
            .ok_or_else(|| anyhow::anyhow!("Unknown network '{}'", self.network))
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    /// Signing key from the configured environment variable, if set.
    pub fn private_key(&self) -> Option<String> {
        std::env::var(&self.private_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Log the current configuration. The signing key is never logged.
    pub fn log_config(&self) {
        tracing::info!(
            network = %self.network,
            rpc_url = %self.rpc_url,
            deployment = %self.deployment.display(),
            "Client configuration loaded"
        );
        tracing::info!(
            has_private_key = self.private_key().is_some(),
            signer_address = self.signer_address.as_deref().unwrap_or("-"),
            confirmation_timeout_secs = self.confirmation_timeout_secs,
            required_confirmations = self.required_confirmations,
            "Signing and confirmation"
        );
        tracing::info!(
            quote_asset = %self.quote_asset,
            token_domain = %self.token_domain,
            governor_domain = %self.governor_domain,
            "Protocol defaults"
        );
    }
}
