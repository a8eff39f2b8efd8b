//! Vote delegation and proposal voting.

use super::{TransactionOrchestrator, TxOutcome};
use crate::assets::contract_names;
use crate::checksum::parse_address;
use crate::delegation::{SignedBallot, SignedDelegation, MAX_SUPPORT};
use crate::error::{ArgumentError, ClientError, Result};
use crate::options::TxOptions;
use alloy::primitives::{Address, U256};
use fortress_chain::contracts::{IFts, IGovernor};
use fortress_chain::{read, TypedSignature};
use tracing::{debug, instrument};

impl TransactionOrchestrator {
    /// Delegate the caller's votes to `delegatee`.
    #[instrument(skip(self, options))]
    pub async fn delegate(&self, delegatee: &str, options: TxOptions) -> Result<TxOutcome> {
        options.validate()?;
        let delegatee = parse_address(delegatee)?;
        let token = self.registry.contract(contract_names::FTS)?;
        let receipt = self
            .submit("delegate", token, &IFts::delegateCall { delegatee }, &options.send_options(U256::ZERO))
            .await?;
        Ok(TxOutcome::new(receipt))
    }

    /// Submit a delegation signed off-chain. The token contract checks the
    /// nonce, expiry and signer.
    #[instrument(skip(self, signature, options))]
    pub async fn delegate_by_sig(
        &self,
        delegatee: &str,
        nonce: U256,
        expiry: U256,
        signature: &TypedSignature,
        options: TxOptions,
    ) -> Result<TxOutcome> {
        options.validate()?;
        let delegatee = parse_address(delegatee)?;
        let token = self.registry.contract(contract_names::FTS)?;
        let call = IFts::delegateBySigCall {
            delegatee,
            nonce,
            expiry,
            v: signature.v,
            r: signature.r,
            s: signature.s,
        };
        let receipt = self
            .submit("delegateBySig", token, &call, &options.send_options(U256::ZERO))
            .await?;
        Ok(TxOutcome::new(receipt))
    }

    /// Submit a [`SignedDelegation`] as produced by
    /// [`TransactionOrchestrator::create_delegation_signature`].
    pub async fn submit_delegation(&self, signed: &SignedDelegation, options: TxOptions) -> Result<TxOutcome> {
        self.delegate_by_sig(
            &signed.delegatee.to_checksum(None),
            signed.nonce,
            signed.expiry,
            &signed.signature,
            options,
        )
        .await
    }

    /// Sign a delegation without submitting it.
    pub async fn create_delegation_signature(&self, delegatee: &str, expiry: u64) -> Result<SignedDelegation> {
        self.delegation.create_delegation_signature(delegatee, expiry).await
    }

    /// Sign a ballot without submitting it.
    pub async fn create_vote_signature(&self, proposal_id: U256, support: u8) -> Result<SignedBallot> {
        self.delegation.create_vote_signature(proposal_id, support).await
    }

    /// Vote on a proposal from the sending account.
    #[instrument(skip(self, options))]
    pub async fn cast_vote(&self, proposal_id: U256, support: u8, options: TxOptions) -> Result<TxOutcome> {
        options.validate()?;
        check_support(support)?;
        let governor = self.registry.contract(contract_names::GOVERNOR)?;
        let call = IGovernor::castVoteCall {
            proposalId: proposal_id,
            support,
        };
        let receipt = self
            .submit("castVote", governor, &call, &options.send_options(U256::ZERO))
            .await?;
        Ok(TxOutcome::new(receipt))
    }

    /// Submit a ballot signed off-chain.
    #[instrument(skip(self, ballot, options), fields(proposal = %ballot.proposal_id))]
    pub async fn cast_vote_by_sig(&self, ballot: &SignedBallot, options: TxOptions) -> Result<TxOutcome> {
        options.validate()?;
        check_support(ballot.support)?;
        let governor = self.registry.contract(contract_names::GOVERNOR)?;
        let call = IGovernor::castVoteBySigCall {
            proposalId: ballot.proposal_id,
            support: ballot.support,
            v: ballot.signature.v,
            r: ballot.signature.r,
            s: ballot.signature.s,
        };
        let receipt = self
            .submit("castVoteBySig", governor, &call, &options.send_options(U256::ZERO))
            .await?;
        Ok(TxOutcome::new(receipt))
    }

    /// Current votes of `account`, or of the sending account.
    pub async fn get_current_votes(&self, account: Option<&str>) -> Result<U256> {
        let account: Address = match account.map(str::trim) {
            None | Some("") => self.account("getCurrentVotes").await?,
            Some(raw) => parse_address(raw)?,
        };
        let token = self.registry.contract(contract_names::FTS)?;
        let votes = read(self.chain.as_ref(), token, &IFts::getCurrentVotesCall { account })
            .await
            .map_err(|e| ClientError::chain("getCurrentVotes", e))?
            ._0;
        let votes = U256::from(votes);
        debug!(account = %account, votes = %votes, "Current votes");
        Ok(votes)
    }
}

fn check_support(support: u8) -> Result<()> {
    if support > MAX_SUPPORT {
        return Err(ArgumentError::option("support", format!("must be at most {}", MAX_SUPPORT)).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use alloy::primitives::B256;

    const DELEGATEE: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    #[tokio::test]
    async fn test_delegate_validates_address() {
        let (chain, orchestrator) = orchestrator();
        assert!(orchestrator.delegate("0xnope", TxOptions::default()).await.is_err());
        assert!(!chain.touched());

        orchestrator.delegate(DELEGATEE, TxOptions::default()).await.unwrap();
        let sends = chain.sends();
        assert_eq!(sends[0].to, FTS);
        assert_eq!(sends[0].decode::<IFts::delegateCall>().delegatee, DELEGATEE.parse::<Address>().unwrap());
    }

    #[tokio::test]
    async fn test_delegate_by_sig_forwards_signature() {
        let (chain, orchestrator) = orchestrator();
        let signature = TypedSignature {
            v: 27,
            r: B256::repeat_byte(0x04),
            s: B256::repeat_byte(0x05),
        };
        orchestrator
            .delegate_by_sig(DELEGATEE, U256::from(4u64), U256::from(99u64), &signature, TxOptions::default())
            .await
            .unwrap();

        let call = chain.sends()[0].decode::<IFts::delegateBySigCall>();
        assert_eq!(call.nonce, U256::from(4u64));
        assert_eq!(call.expiry, U256::from(99u64));
        assert_eq!((call.v, call.r, call.s), (27, signature.r, signature.s));
    }

    #[tokio::test]
    async fn test_signing_without_signer_fails_locally() {
        let (chain, orchestrator) = orchestrator();
        let err = orchestrator.create_delegation_signature(DELEGATEE, u64::MAX).await.unwrap_err();
        assert!(matches!(err, ClientError::SigningUnavailable));
        assert!(!chain.touched());
    }

    #[tokio::test]
    async fn test_votes() {
        let (chain, orchestrator) = orchestrator();
        chain.on_read::<IFts::getCurrentVotesCall, _>(FTS, U256::from(1_000u64));
        assert_eq!(orchestrator.get_current_votes(None).await.unwrap(), U256::from(1_000u64));
        assert_eq!(orchestrator.get_current_votes(Some(DELEGATEE)).await.unwrap(), U256::from(1_000u64));

        orchestrator.cast_vote(U256::from(3u64), 1, TxOptions::default()).await.unwrap();
        assert!(orchestrator.cast_vote(U256::from(3u64), 9, TxOptions::default()).await.is_err());
        let sends = chain.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].to, GOVERNOR);
        assert_eq!(sends[0].decode::<IGovernor::castVoteCall>().support, 1);
    }
}
