//! Asset registry for the Fortress markets.
//!
//! The registry is built once per network from a deployment description and
//! is immutable afterwards. Every market pairs one underlying asset with one
//! `f`-prefixed derivative token; oracle-only assets have a price but no
//! market.

use crate::error::{ArgumentError, ClientError, Result};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Symbol prefix of derivative (fToken) markets.
pub const DERIVATIVE_PREFIX: &str = "f";

/// Decimals every fToken carries.
pub const DERIVATIVE_DECIMALS: u8 = 8;

/// Chain id on which USDC and USDT are 18-decimal tokens.
const BINANCE_PEG_CHAIN_ID: u64 = 56;

/// Well-known contract names in a deployment.
pub mod contract_names {
    pub const COMPTROLLER: &str = "Comptroller";
    pub const FAI_CONTROLLER: &str = "FaiController";
    pub const FAI: &str = "FAI";
    pub const FTS: &str = "FTS";
    pub const GOVERNOR: &str = "Governor";
}

/// Supported networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 56,
            Network::Testnet => 97,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }

    /// Parse from string (e.g., from config).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "mainnet" | "bsc" | "bsc-mainnet" => Some(Network::Mainnet),
            "testnet" | "bsc-testnet" | "chapel" => Some(Network::Testnet),
            _ => None,
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            56 => Some(Network::Mainnet),
            97 => Some(Network::Testnet),
            _ => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Global decimal defaults for known symbols.
fn default_decimals(symbol: &str) -> Option<u8> {
    match symbol {
        "USDC" | "USDT" => Some(6),
        "BTC" => Some(8),
        "BNB" | "BTCB" | "ETH" | "DAI" | "BUSD" | "LTC" | "XRP" | "DOT" | "LINK" | "CAKE"
        | "FTS" | "FAI" => Some(18),
        _ => None,
    }
}

/// Decimals of `symbol` on `chain_id`, applying the per-network overrides.
pub fn decimals_for(chain_id: u64, symbol: &str) -> Option<u8> {
    match symbol {
        "USDC" | "USDT" if chain_id == BINANCE_PEG_CHAIN_ID => Some(18),
        _ => default_decimals(symbol),
    }
}

/// A lending market: one underlying asset and its derivative token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    /// Underlying symbol (e.g. "DAI")
    pub symbol: String,
    /// Derivative symbol (e.g. "fDAI")
    pub derivative_symbol: String,
    /// Underlying token contract, `None` for the native gas asset
    pub underlying: Option<Address>,
    /// fToken contract
    pub derivative: Address,
    /// Underlying decimals
    pub decimals: u8,
}

impl Market {
    /// Whether the underlying is the chain's native gas asset.
    pub fn is_native(&self) -> bool {
        self.underlying.is_none()
    }
}

/// Asset priced by the oracle without a lending market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleAsset {
    pub symbol: String,
    /// Key the oracle is queried with
    pub price_key: Address,
    pub decimals: u8,
}

/// Resolved symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRef<'a> {
    Underlying(&'a Market),
    Derivative(&'a Market),
    OracleOnly(&'a OracleAsset),
}

impl<'a> AssetRef<'a> {
    pub fn symbol(&self) -> &'a str {
        match self {
            AssetRef::Underlying(m) => &m.symbol,
            AssetRef::Derivative(m) => &m.derivative_symbol,
            AssetRef::OracleOnly(a) => &a.symbol,
        }
    }

    /// Decimals of the symbol itself (8 for derivatives).
    pub fn decimals(&self) -> u8 {
        match self {
            AssetRef::Underlying(m) => m.decimals,
            AssetRef::Derivative(_) => DERIVATIVE_DECIMALS,
            AssetRef::OracleOnly(a) => a.decimals,
        }
    }

    /// Decimals of the priced underlying.
    pub fn underlying_decimals(&self) -> u8 {
        match self {
            AssetRef::Underlying(m) | AssetRef::Derivative(m) => m.decimals,
            AssetRef::OracleOnly(a) => a.decimals,
        }
    }

    /// Address the oracle is keyed by.
    pub fn price_key(&self) -> Address {
        match self {
            AssetRef::Underlying(m) | AssetRef::Derivative(m) => m.derivative,
            AssetRef::OracleOnly(a) => a.price_key,
        }
    }

    pub fn is_derivative(&self) -> bool {
        matches!(self, AssetRef::Derivative(_))
    }

    pub fn market(&self) -> Option<&'a Market> {
        match self {
            AssetRef::Underlying(m) | AssetRef::Derivative(m) => Some(m),
            AssetRef::OracleOnly(_) => None,
        }
    }
}

/// Immutable per-network registry of markets, oracle assets and contracts.
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    network: Network,
    native_symbol: String,
    markets: HashMap<String, Market>,
    oracle_assets: HashMap<String, OracleAsset>,
    contracts: HashMap<String, Address>,
}

impl AssetRegistry {
    pub fn builder(network: Network) -> AssetRegistryBuilder {
        AssetRegistryBuilder::new(network)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn chain_id(&self) -> u64 {
        self.network.chain_id()
    }

    pub fn native_symbol(&self) -> &str {
        &self.native_symbol
    }

    /// Resolve a symbol to a market side or an oracle-only asset.
    pub fn resolve(&self, symbol: &str) -> Result<AssetRef<'_>> {
        if let Some(market) = self.markets.get(symbol) {
            return Ok(AssetRef::Underlying(market));
        }
        if let Some(underlying) = symbol.strip_prefix(DERIVATIVE_PREFIX) {
            if let Some(market) = self.markets.get(underlying) {
                return Ok(AssetRef::Derivative(market));
            }
        }
        if let Some(asset) = self.oracle_assets.get(symbol) {
            return Ok(AssetRef::OracleOnly(asset));
        }
        Err(self.unsupported(symbol))
    }

    /// Market whose underlying symbol is `symbol`.
    pub fn market(&self, symbol: &str) -> Result<&Market> {
        self.markets.get(symbol).ok_or_else(|| self.unsupported(symbol))
    }

    /// Market named by either its underlying or derivative symbol.
    pub fn market_for(&self, symbol: &str) -> Result<&Market> {
        self.resolve(symbol)?
            .market()
            .ok_or_else(|| self.unsupported(symbol))
    }

    /// Address of a token symbol, derivative symbol or contract name.
    pub fn address_of(&self, name: &str) -> Option<Address> {
        if let Some(address) = self.contracts.get(name) {
            return Some(*address);
        }
        match self.resolve(name).ok()? {
            AssetRef::Underlying(m) => m.underlying,
            AssetRef::Derivative(m) => Some(m.derivative),
            AssetRef::OracleOnly(a) => Some(a.price_key),
        }
    }

    /// Address of a named protocol contract.
    pub fn contract(&self, name: &str) -> Result<Address> {
        self.contracts.get(name).copied().ok_or_else(|| {
            ArgumentError::option(
                "contracts",
                format!("'{}' is not deployed on {}", name, self.network),
            )
            .into()
        })
    }

    pub fn decimals_of(&self, symbol: &str) -> Option<u8> {
        self.resolve(symbol).ok().map(|asset| asset.decimals())
    }

    pub fn is_underlying(&self, symbol: &str) -> bool {
        self.markets.contains_key(symbol)
    }

    pub fn is_derivative(&self, symbol: &str) -> bool {
        matches!(self.resolve(symbol), Ok(AssetRef::Derivative(_)))
    }

    pub fn underlying_of(&self, derivative_symbol: &str) -> Option<&str> {
        match self.resolve(derivative_symbol).ok()? {
            AssetRef::Derivative(m) => Some(&m.symbol),
            _ => None,
        }
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    fn unsupported(&self, symbol: &str) -> ClientError {
        ClientError::UnsupportedAsset {
            symbol: symbol.to_string(),
            network: self.network.to_string(),
        }
    }
}

/// Builder enforcing the registry invariants.
#[derive(Debug)]
pub struct AssetRegistryBuilder {
    network: Network,
    native_symbol: String,
    markets: Vec<(String, Option<Address>, Address, Option<u8>)>,
    oracle_assets: Vec<(String, Address, Option<u8>)>,
    contracts: HashMap<String, Address>,
}

impl AssetRegistryBuilder {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            native_symbol: "BNB".to_string(),
            markets: Vec::new(),
            oracle_assets: Vec::new(),
            contracts: HashMap::new(),
        }
    }

    pub fn native_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.native_symbol = symbol.into();
        self
    }

    /// Add a market. `underlying` is `None` for the native asset; `decimals`
    /// falls back to the per-network defaults.
    pub fn market(
        mut self,
        symbol: impl Into<String>,
        underlying: Option<Address>,
        derivative: Address,
        decimals: Option<u8>,
    ) -> Self {
        self.markets
            .push((symbol.into(), underlying, derivative, decimals));
        self
    }

    pub fn oracle_asset(mut self, symbol: impl Into<String>, price_key: Address, decimals: Option<u8>) -> Self {
        self.oracle_assets.push((symbol.into(), price_key, decimals));
        self
    }

    pub fn contract(mut self, name: impl Into<String>, address: Address) -> Self {
        self.contracts.insert(name.into(), address);
        self
    }

    pub fn build(self) -> std::result::Result<AssetRegistry, ArgumentError> {
        let chain_id = self.network.chain_id();
        let resolve_decimals = |symbol: &str, explicit: Option<u8>| {
            explicit
                .or_else(|| decimals_for(chain_id, symbol))
                .filter(|d| *d <= crate::amount::MAX_DECIMALS)
                .ok_or_else(|| {
                    ArgumentError::option("decimals", format!("unknown or invalid for '{}'", symbol))
                })
        };

        let mut markets = HashMap::with_capacity(self.markets.len());
        let mut derivative_addresses = HashMap::new();
        for (symbol, underlying, derivative, decimals) in self.markets {
            if underlying.is_none() && symbol != self.native_symbol {
                return Err(ArgumentError::option(
                    "markets",
                    format!("'{}' has no underlying token but is not the native asset", symbol),
                ));
            }
            if let Some(other) = derivative_addresses.insert(derivative, symbol.clone()) {
                return Err(ArgumentError::option(
                    "markets",
                    format!("'{}' and '{}' share derivative {}", other, symbol, derivative),
                ));
            }
            let market = Market {
                derivative_symbol: format!("{}{}", DERIVATIVE_PREFIX, symbol),
                decimals: resolve_decimals(&symbol, decimals)?,
                symbol: symbol.clone(),
                underlying,
                derivative,
            };
            if markets.insert(symbol.clone(), market).is_some() {
                return Err(ArgumentError::option("markets", format!("duplicate market '{}'", symbol)));
            }
        }

        for market in markets.values() {
            if markets.contains_key(&market.derivative_symbol) {
                return Err(ArgumentError::option(
                    "markets",
                    format!("'{}' collides with a derivative symbol", market.derivative_symbol),
                ));
            }
        }

        let mut oracle_assets = HashMap::with_capacity(self.oracle_assets.len());
        for (symbol, price_key, decimals) in self.oracle_assets {
            let is_derivative_name = symbol
                .strip_prefix(DERIVATIVE_PREFIX)
                .is_some_and(|u| markets.contains_key(u));
            if markets.contains_key(&symbol) || is_derivative_name {
                return Err(ArgumentError::option(
                    "oracle_assets",
                    format!("'{}' already names a market", symbol),
                ));
            }
            let asset = OracleAsset {
                decimals: resolve_decimals(&symbol, decimals)?,
                symbol: symbol.clone(),
                price_key,
            };
            oracle_assets.insert(symbol, asset);
        }

        Ok(AssetRegistry {
            network: self.network,
            native_symbol: self.native_symbol,
            markets,
            oracle_assets,
            contracts: self.contracts,
        })
    }
}
