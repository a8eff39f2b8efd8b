//! JSON-RPC implementation of [`ChainClient`].
//! Uses Alloy providers for type-safe RPC interactions.
//!
//! Reads go through a plain HTTP provider. Sends go through a provider with
//! the local wallet attached, or through `eth_sendTransaction` for an account
//! the node manages; nonce, gas and chain id are filled by Alloy unless
//! overridden through [`SendOptions`].

use crate::client::{ChainClient, SendOptions, TxReceipt};
use crate::error::{ChainError, ChainResult};
use crate::signer::LocalKeySigner;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default time to wait for a transaction to be included.
const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Builder for [`RpcChainClient`].
pub struct RpcChainClientBuilder {
    rpc_url: String,
    chain_id: u64,
    signer: Option<LocalKeySigner>,
    account: Option<Address>,
    confirmation_timeout: Duration,
    required_confirmations: u64,
}

impl RpcChainClientBuilder {
    /// Create a new builder.
    pub fn new(rpc_url: impl Into<String>, chain_id: u64) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            chain_id,
            signer: None,
            account: None,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            required_confirmations: 1,
        }
    }

    /// Attach a local key used for sending (also sets the account).
    pub fn signer(mut self, signer: LocalKeySigner) -> Self {
        self.account = Some(signer.inner().address());
        self.signer = Some(signer);
        self
    }

    /// Account without a local key: used as `from` on reads and sent through
    /// the node's `eth_sendTransaction`.
    pub fn account(mut self, account: Address) -> Self {
        self.account = Some(account);
        self
    }

    /// How long `send` waits for inclusion.
    pub fn confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// Number of blocks a receipt must be buried under.
    pub fn required_confirmations(mut self, confirmations: u64) -> Self {
        self.required_confirmations = confirmations.max(1);
        self
    }

    /// Build the client and verify the endpoint serves the expected chain.
    pub async fn connect(self) -> ChainResult<RpcChainClient> {
        let client = self.build()?;
        let provider = ProviderBuilder::new().on_http(client.url()?);
        let remote_chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        if remote_chain_id != client.chain_id {
            return Err(ChainError::Transport(format!(
                "endpoint serves chain {} but {} was configured",
                remote_chain_id, client.chain_id
            )));
        }

        info!(
            rpc = %client.rpc_url,
            chain_id = client.chain_id,
            account = ?client.account,
            "Chain client connected"
        );
        Ok(client)
    }

    /// Build the client without contacting the endpoint.
    pub fn build(self) -> ChainResult<RpcChainClient> {
        let client = RpcChainClient {
            rpc_url: self.rpc_url,
            chain_id: self.chain_id,
            wallet: self.signer.map(|s| EthereumWallet::from(s.inner().clone())),
            account: self.account,
            confirmation_timeout: self.confirmation_timeout,
            required_confirmations: self.required_confirmations,
        };
        client.url()?;
        Ok(client)
    }
}

/// HTTP JSON-RPC chain client.
#[derive(Clone)]
pub struct RpcChainClient {
    rpc_url: String,
    chain_id: u64,
    wallet: Option<EthereumWallet>,
    account: Option<Address>,
    confirmation_timeout: Duration,
    required_confirmations: u64,
}

impl RpcChainClient {
    /// Get the RPC URL.
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    fn url(&self) -> ChainResult<url::Url> {
        self.rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::Transport(format!("invalid rpc url: {}", e)))
    }

    /// Get current block number.
    pub async fn block_number(&self) -> ChainResult<u64> {
        let provider = ProviderBuilder::new().on_http(self.url()?);
        provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn account(&self) -> ChainResult<Address> {
        self.account.ok_or(ChainError::NoAccount)
    }

    async fn call(&self, to: Address, input: Bytes) -> ChainResult<Bytes> {
        let provider = ProviderBuilder::new().on_http(self.url()?);
        let mut tx = TransactionRequest::default().with_to(to).with_input(input);
        if let Some(from) = self.account {
            tx = tx.with_from(from);
        }

        provider
            .call(tx)
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))
    }

    async fn send(&self, to: Address, input: Bytes, options: &SendOptions) -> ChainResult<TxReceipt> {
        let total_start = Instant::now();

        let mut tx = TransactionRequest::default()
            .with_to(to)
            .with_input(input)
            .with_value(options.value)
            .with_chain_id(self.chain_id);
        if let Some(gas_limit) = options.gas_limit {
            tx = tx.with_gas_limit(gas_limit);
        }
        if let Some(gas_price) = options.gas_price {
            tx = tx.with_gas_price(gas_price);
        }

        let url = self.url()?;
        let pending = match (&self.wallet, self.account) {
            (Some(wallet), _) => {
                ProviderBuilder::new()
                    .wallet(wallet.clone())
                    .on_http(url)
                    .send_transaction(tx)
                    .await
            }
            // Node-managed account: eth_sendTransaction
            (None, Some(from)) => {
                ProviderBuilder::new()
                    .on_http(url)
                    .send_transaction(tx.with_from(from))
                    .await
            }
            (None, None) => return Err(ChainError::NoAccount),
        }
        .map_err(|e| ChainError::Transport(e.to_string()))?;
        let tx_hash = *pending.tx_hash();

        info!(
            tx_hash = %tx_hash,
            to = %to,
            value = %options.value,
            submit_ms = total_start.elapsed().as_millis(),
            "Transaction submitted, waiting for confirmation"
        );

        let receipt = tokio::time::timeout(
            self.confirmation_timeout,
            pending
                .with_required_confirmations(self.required_confirmations)
                .get_receipt(),
        )
        .await
        .map_err(|_| ChainError::Timeout(format!("receipt of {}", tx_hash)))?
        .map_err(|e| ChainError::Transport(e.to_string()))?;

        if receipt.status() {
            info!(
                tx_hash = %tx_hash,
                block = receipt.block_number.unwrap_or(0),
                gas_used = receipt.gas_used,
                total_ms = total_start.elapsed().as_millis(),
                "Transaction confirmed"
            );
            Ok(TxReceipt {
                tx_hash,
                block_number: receipt.block_number,
                gas_used: receipt.gas_used as u64,
            })
        } else {
            warn!(
                tx_hash = %tx_hash,
                total_ms = total_start.elapsed().as_millis(),
                "Transaction reverted"
            );
            Err(ChainError::Reverted { tx_hash })
        }
    }
}

impl std::fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("account", &self.account)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .finish_non_exhaustive()
    }
}
