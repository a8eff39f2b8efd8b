//! Supply, redeem, borrow and repay against fToken markets.

use super::{TransactionOrchestrator, TxOutcome};
use crate::amount::Amount;
use crate::assets::{contract_names, AssetRef, DERIVATIVE_DECIMALS};
use crate::checksum::parse_address;
use crate::error::{ClientError, Result};
use crate::options::{Stage, TxOptions};
use alloy::primitives::{Address, U256};
use fortress_chain::contracts::{IComptroller, IFBnb, IFToken};
use std::time::Instant;
use tracing::{debug, info, instrument};

impl TransactionOrchestrator {
    /// Supply `amount` of an underlying asset, minting fTokens.
    ///
    /// The native asset travels in the transaction value and skips the
    /// allowance check.
    #[instrument(skip(self, amount, options), fields(amount = tracing::field::Empty))]
    pub async fn supply(
        &self,
        asset: &str,
        amount: impl Into<Amount>,
        skip_approval: bool,
        options: TxOptions,
    ) -> Result<TxOutcome> {
        let start = Instant::now();
        let amount = amount.into();
        tracing::Span::current().record("amount", tracing::field::display(&amount));
        debug!(stage = %Stage::Validate, asset, "Supply requested");

        let market = self.registry.market(asset)?;
        let value = self.mantissa(&amount, market.decimals, &options)?;

        let outcome = if market.is_native() {
            let receipt = self
                .submit("supply", market.derivative, &IFBnb::mintCall {}, &options.send_options(value))
                .await?;
            TxOutcome::new(receipt)
        } else {
            let allowance = self
                .ensure_allowance("supply", market.derivative, market.underlying, value, skip_approval, &options)
                .await?;
            let call = IFToken::mintCall { mintAmount: value };
            let receipt = self
                .submit("supply", market.derivative, &call, &options.send_options(U256::ZERO))
                .await?;
            TxOutcome::with_approval(receipt, allowance)
        };

        info!(
            asset,
            mantissa = %value,
            tx_hash = %outcome.receipt.tx_hash,
            approved = outcome.approval.is_some(),
            elapsed_ms = start.elapsed().as_millis(),
            "Supply complete"
        );
        Ok(outcome)
    }

    /// Redeem from a market.
    ///
    /// A derivative symbol (`fDAI`) redeems that many fTokens; an underlying
    /// symbol (`DAI`) redeems fTokens worth that much underlying.
    #[instrument(skip(self, amount, options))]
    pub async fn redeem(&self, asset: &str, amount: impl Into<Amount>, options: TxOptions) -> Result<TxOutcome> {
        let amount = amount.into();
        let receipt = match self.registry.resolve(asset)? {
            AssetRef::Derivative(market) => {
                let value = self.mantissa(&amount, DERIVATIVE_DECIMALS, &options)?;
                let call = IFToken::redeemCall { redeemTokens: value };
                self.submit("redeem", market.derivative, &call, &options.send_options(U256::ZERO))
                    .await?
            }
            AssetRef::Underlying(market) => {
                let value = self.mantissa(&amount, market.decimals, &options)?;
                let call = IFToken::redeemUnderlyingCall { redeemAmount: value };
                self.submit("redeem", market.derivative, &call, &options.send_options(U256::ZERO))
                    .await?
            }
            AssetRef::OracleOnly(other) => {
                return Err(ClientError::UnsupportedAsset {
                    symbol: other.symbol.clone(),
                    network: self.registry.network().to_string(),
                });
            }
        };
        Ok(TxOutcome::new(receipt))
    }

    /// Borrow `amount` of an underlying asset. No allowance is involved.
    #[instrument(skip(self, amount, options))]
    pub async fn borrow(&self, asset: &str, amount: impl Into<Amount>, options: TxOptions) -> Result<TxOutcome> {
        let amount = amount.into();
        let market = self.registry.market(asset)?;
        let value = self.mantissa(&amount, market.decimals, &options)?;
        let call = IFToken::borrowCall { borrowAmount: value };
        let receipt = self
            .submit("borrow", market.derivative, &call, &options.send_options(U256::ZERO))
            .await?;
        Ok(TxOutcome::new(receipt))
    }

    /// Repay a borrow, either the caller's own (`borrower` absent or empty)
    /// or on behalf of `borrower`.
    ///
    /// A non-empty `borrower` must be a valid address; anything else is
    /// rejected before the chain is contacted.
    #[instrument(skip(self, amount, options))]
    pub async fn repay_borrow(
        &self,
        asset: &str,
        amount: impl Into<Amount>,
        borrower: Option<&str>,
        skip_approval: bool,
        options: TxOptions,
    ) -> Result<TxOutcome> {
        let amount = amount.into();
        let borrower = match borrower.map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_address(raw)?),
        };
        let market = self.registry.market(asset)?;
        let value = self.mantissa(&amount, market.decimals, &options)?;

        if market.is_native() {
            let send_options = options.send_options(value);
            let receipt = match borrower {
                Some(borrower) => {
                    let call = IFBnb::repayBorrowBehalfCall { borrower };
                    self.submit("repayBorrow", market.derivative, &call, &send_options).await?
                }
                None => {
                    self.submit("repayBorrow", market.derivative, &IFBnb::repayBorrowCall {}, &send_options)
                        .await?
                }
            };
            return Ok(TxOutcome::new(receipt));
        }

        let allowance = self
            .ensure_allowance("repayBorrow", market.derivative, market.underlying, value, skip_approval, &options)
            .await?;
        let send_options = options.send_options(U256::ZERO);
        let receipt = match borrower {
            Some(borrower) => {
                let call = IFToken::repayBorrowBehalfCall {
                    borrower,
                    repayAmount: value,
                };
                self.submit("repayBorrow", market.derivative, &call, &send_options).await?
            }
            None => {
                let call = IFToken::repayBorrowCall { repayAmount: value };
                self.submit("repayBorrow", market.derivative, &call, &send_options).await?
            }
        };
        Ok(TxOutcome::with_approval(receipt, allowance))
    }

    /// Use the given markets as collateral.
    #[instrument(skip(self, options))]
    pub async fn enter_markets(&self, assets: &[&str], options: TxOptions) -> Result<TxOutcome> {
        options.validate()?;
        let f_tokens = assets
            .iter()
            .map(|symbol| self.registry.market_for(symbol).map(|m| m.derivative))
            .collect::<Result<Vec<Address>>>()?;
        let comptroller = self.registry.contract(contract_names::COMPTROLLER)?;
        let call = IComptroller::enterMarketsCall { fTokens: f_tokens };
        let receipt = self
            .submit("enterMarkets", comptroller, &call, &options.send_options(U256::ZERO))
            .await?;
        Ok(TxOutcome::new(receipt))
    }

    /// Stop using a market as collateral.
    #[instrument(skip(self, options))]
    pub async fn exit_market(&self, asset: &str, options: TxOptions) -> Result<TxOutcome> {
        options.validate()?;
        let market = self.registry.market_for(asset)?;
        let comptroller = self.registry.contract(contract_names::COMPTROLLER)?;
        let call = IComptroller::exitMarketCall { fToken: market.derivative };
        let receipt = self
            .submit("exitMarket", comptroller, &call, &options.send_options(U256::ZERO))
            .await?;
        Ok(TxOutcome::new(receipt))
    }
}
