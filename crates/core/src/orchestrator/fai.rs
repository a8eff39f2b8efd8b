//! FAI stablecoin minting and repayment through the FaiController.

use super::{TransactionOrchestrator, TxOutcome};
use crate::amount::Amount;
use crate::assets::contract_names;
use crate::error::Result;
use crate::options::TxOptions;
use alloy::primitives::U256;
use fortress_chain::contracts::IFaiController;
use tracing::instrument;

/// Registry symbol of the stablecoin.
const FAI_SYMBOL: &str = "FAI";

impl TransactionOrchestrator {
    fn fai_decimals(&self) -> Result<u8> {
        Ok(self.registry.resolve(FAI_SYMBOL)?.decimals())
    }

    /// Mint FAI against the caller's collateral.
    #[instrument(skip(self, amount, options))]
    pub async fn mint_fai(&self, amount: impl Into<Amount>, options: TxOptions) -> Result<TxOutcome> {
        let amount = amount.into();
        let value = self.mantissa(&amount, self.fai_decimals()?, &options)?;
        let controller = self.registry.contract(contract_names::FAI_CONTROLLER)?;
        let call = IFaiController::mintFAICall { mintFAIAmount: value };
        let receipt = self
            .submit("mintFAI", controller, &call, &options.send_options(U256::ZERO))
            .await?;
        Ok(TxOutcome::new(receipt))
    }

    /// Repay minted FAI. The controller pulls the tokens, so it is approved
    /// first unless `skip_approval` is set.
    #[instrument(skip(self, amount, options))]
    pub async fn repay_fai(&self, amount: impl Into<Amount>, skip_approval: bool, options: TxOptions) -> Result<TxOutcome> {
        let amount = amount.into();
        let value = self.mantissa(&amount, self.fai_decimals()?, &options)?;
        let controller = self.registry.contract(contract_names::FAI_CONTROLLER)?;
        let token = self.registry.contract(contract_names::FAI)?;

        let allowance = self
            .ensure_allowance("repayFAI", controller, Some(token), value, skip_approval, &options)
            .await?;
        let call = IFaiController::repayFAICall { repayFAIAmount: value };
        let receipt = self
            .submit("repayFAI", controller, &call, &options.send_options(U256::ZERO))
            .await?;
        Ok(TxOutcome::with_approval(receipt, allowance))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use fortress_chain::contracts::IERC20;

    #[tokio::test]
    async fn test_mint_fai() {
        let (chain, orchestrator) = orchestrator();
        orchestrator.mint_fai("12.5", TxOptions::default()).await.unwrap();

        let sends = chain.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].to, FAI_CONTROLLER);
        assert_eq!(
            sends[0].decode::<IFaiController::mintFAICall>().mintFAIAmount,
            U256::from(12_500_000_000_000_000_000u128)
        );
    }

    #[tokio::test]
    async fn test_repay_fai_approves_controller() {
        let (chain, orchestrator) = orchestrator();
        chain.on_read::<IERC20::allowanceCall, _>(FAI, U256::from(1u64));

        let outcome = orchestrator
            .repay_fai(500u64, false, TxOptions::mantissa())
            .await
            .unwrap();
        assert!(outcome.approval.is_some());

        let sends = chain.sends();
        assert_eq!(sends.len(), 2);
        assert_eq!(sends[0].to, FAI);
        assert_eq!(sends[0].decode::<IERC20::approveCall>().spender, FAI_CONTROLLER);
        assert_eq!(sends[1].decode::<IFaiController::repayFAICall>().repayFAIAmount, U256::from(500u64));
    }
}
