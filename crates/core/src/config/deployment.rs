//! Deployment description: network, protocol contracts and markets.

use super::env::expand_env_strict;
use crate::assets::{AssetRegistry, Network};
use crate::checksum::parse_address;
use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Full deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub network: NetworkSection,
    /// Contract name to address
    #[serde(default)]
    pub contracts: BTreeMap<String, String>,
    #[serde(default)]
    pub markets: Vec<MarketEntry>,
    #[serde(default)]
    pub oracle_assets: Vec<OracleAssetEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSection {
    pub name: String,
    pub chain_id: u64,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
}

fn default_native_symbol() -> String {
    "BNB".to_string()
}

/// One market. `underlying` is omitted for the native asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketEntry {
    pub symbol: String,
    #[serde(default)]
    pub underlying: Option<String>,
    pub derivative: String,
    #[serde(default)]
    pub decimals: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleAssetEntry {
    pub symbol: String,
    pub price_key: String,
    #[serde(default)]
    pub decimals: Option<u8>,
}

impl DeploymentConfig {
    /// Load deployment config from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deployment {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse deployment {:?}", path))
    }

    pub fn network(&self) -> Result<Network> {
        let network = Network::from_name(&self.network.name)
            .ok_or_else(|| anyhow::anyhow!("Unknown network '{}'", self.network.name))?;
        if network.chain_id() != self.network.chain_id {
            anyhow::bail!(
                "Network '{}' has chain id {}, deployment says {}",
                self.network.name,
                network.chain_id(),
                self.network.chain_id
            );
        }
        Ok(network)
    }
}

fn address(field: &str, raw: &str) -> Result<Address> {
    let expanded = expand_env_strict(field, raw)?;
    parse_address(&expanded).with_context(|| format!("{} is not a valid address", field))
}

impl AssetRegistry {
    /// Build the registry for a deployment. Addresses are `${VAR}`-expanded
    /// and checksum-validated.
    pub fn from_deployment(config: &DeploymentConfig) -> Result<Self> {
        let network = config.network()?;
        let mut builder = AssetRegistry::builder(network).native_symbol(&config.network.native_symbol);

        for (name, raw) in &config.contracts {
            builder = builder.contract(name, address(&format!("contracts.{}", name), raw)?);
        }

        for market in &config.markets {
            let underlying = market
                .underlying
                .as_deref()
                .map(|raw| address(&format!("markets.{}.underlying", market.symbol), raw))
                .transpose()?;
            let derivative = address(&format!("markets.{}.derivative", market.symbol), &market.derivative)?;
            builder = builder.market(&market.symbol, underlying, derivative, market.decimals);
        }

        for asset in &config.oracle_assets {
            let price_key = address(&format!("oracle_assets.{}.price_key", asset.symbol), &asset.price_key)?;
            builder = builder.oracle_asset(&asset.symbol, price_key, asset.decimals);
        }

        let registry = builder.build()?;
        info!(
            network = %network,
            markets = config.markets.len(),
            oracle_assets = config.oracle_assets.len(),
            contracts = config.contracts.len(),
            "Asset registry built"
        );
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::contract_names;

    const SAMPLE: &str = r#"
[network]
name = "testnet"
chain_id = 97

[contracts]
Comptroller = "0x00000000000000000000000000000000000000cc"
FTS = "${FORTRESS_DEPLOYMENT_TEST_FTS}"

[[markets]]
symbol = "BNB"
derivative = "0x0000000000000000000000000000000000000010"

[[markets]]
symbol = "DAI"
underlying = "0x0000000000000000000000000000000000000001"
derivative = "0x0000000000000000000000000000000000000011"

[[markets]]
symbol = "USDC"
underlying = "0x0000000000000000000000000000000000000002"
derivative = "0x0000000000000000000000000000000000000012"

[[oracle_assets]]
symbol = "FAI"
price_key = "0x0000000000000000000000000000000000000003"
"#;

    #[test]
    fn test_registry_from_deployment() {
        std::env::set_var(
            "FORTRESS_DEPLOYMENT_TEST_FTS",
            "0x00000000000000000000000000000000000000ff",
        );
        let config: DeploymentConfig = toml::from_str(SAMPLE).unwrap();
        let registry = AssetRegistry::from_deployment(&config).unwrap();

        assert_eq!(registry.network(), Network::Testnet);
        assert_eq!(registry.native_symbol(), "BNB");
        assert!(registry.market("BNB").unwrap().is_native());
        assert_eq!(registry.decimals_of("USDC"), Some(6));
        assert_eq!(registry.decimals_of("fUSDC"), Some(8));
        assert_eq!(
            registry.contract(contract_names::FTS).unwrap(),
            Address::with_last_byte(0xff)
        );
        assert!(registry.resolve("FAI").is_ok());
        std::env::remove_var("FORTRESS_DEPLOYMENT_TEST_FTS");
    }

    #[test]
    fn test_chain_id_mismatch_rejected() {
        let config: DeploymentConfig =
            toml::from_str("[network]\nname = \"mainnet\"\nchain_id = 97\n").unwrap();
        assert!(config.network().is_err());
    }

    #[test]
    fn test_bad_address_rejected() {
        let config: DeploymentConfig = toml::from_str(
            r#"
[network]
name = "testnet"
chain_id = 97

[[markets]]
symbol = "DAI"
underlying = "0x12"
derivative = "0x0000000000000000000000000000000000000011"
"#,
        )
        .unwrap();
        let err = AssetRegistry::from_deployment(&config).unwrap_err();
        assert!(err.to_string().contains("markets.DAI.underlying"));
    }
}
