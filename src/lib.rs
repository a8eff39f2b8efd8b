//! Fortress lending protocol client.
//!
//! [`Fortress`] wires the chain capability, an optional typed-data signer and
//! the per-network asset registry into the price resolver and the
//! transaction orchestrator. Build it with [`Fortress::connect`] from a
//! [`ClientConfig`], or with [`Fortress::new`] around any [`ChainClient`].

pub mod telemetry;

use alloy::primitives::U256;
use anyhow::{Context, Result as AnyResult};
use std::sync::Arc;
use tracing::{info, warn};

pub use fortress_chain::{
    ChainClient, ChainError, LocalKeySigner, RpcChainClient, RpcChainClientBuilder, RpcTypedDataSigner,
    TxReceipt, TypedDataSigner, TypedSignature,
};
pub use fortress_core::{
    checksum, format_units, normalize, parse_address, Amount, AllowanceGate, ArgumentError, AssetRegistry,
    ClientConfig, ClientError, DelegationSigner, DeploymentConfig, Network, PriceQuote, PriceResolver, Result,
    SignedBallot, SignedDelegation, TransactionOrchestrator, TxOptions, TxOutcome,
};

/// Client facade holding every component.
#[derive(Debug, Clone)]
pub struct Fortress {
    config: ClientConfig,
    chain: Arc<dyn ChainClient>,
    registry: Arc<AssetRegistry>,
    prices: PriceResolver,
    orchestrator: TransactionOrchestrator,
}

impl Fortress {
    /// Assemble the client around existing capabilities.
    pub fn new(
        config: ClientConfig,
        chain: Arc<dyn ChainClient>,
        signer: Option<Arc<dyn TypedDataSigner>>,
        registry: Arc<AssetRegistry>,
    ) -> Result<Self> {
        if chain.chain_id() != registry.chain_id() {
            return Err(ClientError::InvalidArgument(ArgumentError::InvalidOption {
                field: "network".to_string(),
                reason: format!(
                    "chain client is on chain {} but the registry is for {}",
                    chain.chain_id(),
                    registry.network()
                ),
            }));
        }

        let prices = PriceResolver::new(chain.clone(), registry.clone(), config.quote_asset.clone());
        let allowance = AllowanceGate::new(chain.clone());
        let delegation = DelegationSigner::new(
            chain.clone(),
            signer,
            registry.clone(),
            config.token_domain.clone(),
            config.governor_domain.clone(),
        );
        let orchestrator = TransactionOrchestrator::new(chain.clone(), registry.clone(), allowance, delegation);

        Ok(Self {
            config,
            chain,
            registry,
            prices,
            orchestrator,
        })
    }

    /// Load the deployment, connect to the RPC endpoint and pick a signer:
    /// the configured private key, else the node-managed `signer_address`,
    /// else read-only.
    pub async fn connect(config: &ClientConfig) -> AnyResult<Self> {
        config.log_config();
        let network = config.network()?;

        let deployment = DeploymentConfig::from_file(&config.deployment)?;
        let registry = AssetRegistry::from_deployment(&deployment)?;
        if registry.network() != network {
            anyhow::bail!(
                "Deployment {:?} is for {}, config selects {}",
                config.deployment,
                registry.network(),
                network
            );
        }

        let mut builder = RpcChainClientBuilder::new(&config.rpc_url, network.chain_id())
            .confirmation_timeout(config.confirmation_timeout())
            .required_confirmations(config.required_confirmations);

        let signer: Option<Arc<dyn TypedDataSigner>> = if let Some(key) = config.private_key() {
            let local = LocalKeySigner::from_private_key(&key)
                .with_context(|| format!("Invalid key in {}", config.private_key_env))?;
            info!(account = %local.address(), "Using local signing key");
            builder = builder.signer(local.clone());
            Some(Arc::new(local))
        } else if let Some(address) = &config.signer_address {
            let address = parse_address(address).context("Invalid signer_address")?;
            info!(account = %address, "Using node-managed account");
            builder = builder.account(address);
            Some(Arc::new(RpcTypedDataSigner::new(config.rpc_url.clone(), address)))
        } else {
            warn!("No signing key or signer address configured, client is read-only");
            None
        };

        let chain = builder.connect().await.context("Failed to connect to RPC endpoint")?;
        Ok(Self::new(config.clone(), Arc::new(chain), signer, Arc::new(registry))?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn prices(&self) -> &PriceResolver {
        &self.prices
    }

    /// Orchestrator with the full set of operations (collateral markets,
    /// ballots, vote counts).
    pub fn orchestrator(&self) -> &TransactionOrchestrator {
        &self.orchestrator
    }

    pub async fn supply(
        &self,
        asset: &str,
        amount: impl Into<Amount>,
        skip_approval: bool,
        options: TxOptions,
    ) -> Result<TxOutcome> {
        self.orchestrator.supply(asset, amount, skip_approval, options).await
    }

    pub async fn redeem(&self, asset: &str, amount: impl Into<Amount>, options: TxOptions) -> Result<TxOutcome> {
        self.orchestrator.redeem(asset, amount, options).await
    }

    pub async fn borrow(&self, asset: &str, amount: impl Into<Amount>, options: TxOptions) -> Result<TxOutcome> {
        self.orchestrator.borrow(asset, amount, options).await
    }

    pub async fn repay_borrow(
        &self,
        asset: &str,
        amount: impl Into<Amount>,
        borrower: Option<&str>,
        skip_approval: bool,
        options: TxOptions,
    ) -> Result<TxOutcome> {
        self.orchestrator
            .repay_borrow(asset, amount, borrower, skip_approval, options)
            .await
    }

    pub async fn mint_fai(&self, amount: impl Into<Amount>, options: TxOptions) -> Result<TxOutcome> {
        self.orchestrator.mint_fai(amount, options).await
    }

    pub async fn repay_fai(&self, amount: impl Into<Amount>, skip_approval: bool, options: TxOptions) -> Result<TxOutcome> {
        self.orchestrator.repay_fai(amount, skip_approval, options).await
    }

    /// Price of `asset` in `in_asset`, or in the configured quote asset.
    pub async fn get_price(&self, asset: &str, in_asset: Option<&str>) -> Result<PriceQuote> {
        self.prices.get_price(asset, in_asset).await
    }

    pub async fn create_delegation_signature(&self, delegatee: &str, expiry: u64) -> Result<SignedDelegation> {
        self.orchestrator.create_delegation_signature(delegatee, expiry).await
    }

    pub async fn delegate(&self, delegatee: &str, options: TxOptions) -> Result<TxOutcome> {
        self.orchestrator.delegate(delegatee, options).await
    }

    pub async fn delegate_by_sig(
        &self,
        delegatee: &str,
        nonce: U256,
        expiry: U256,
        signature: &TypedSignature,
        options: TxOptions,
    ) -> Result<TxOutcome> {
        self.orchestrator
            .delegate_by_sig(delegatee, nonce, expiry, signature, options)
            .await
    }
}
