//! Off-chain EIP-712 signatures for vote delegation and ballots.
//!
//! Nothing here submits a transaction. Replay protection (nonce) and
//! staleness (expiry) are enforced by the contracts when the signature is
//! used.

use crate::assets::{contract_names, AssetRegistry};
use crate::checksum::parse_address;
use crate::error::{ArgumentError, ClientError, Result};
use alloy::primitives::{Address, U256};
use alloy::sol_types::{Eip712Domain, SolStruct};
use chrono::{Duration, Utc};
use fortress_chain::contracts::{Ballot, Delegation, IFts};
use fortress_chain::{read, ChainClient, TypedDataRequest, TypedDataSigner, TypedSignature};
use serde_json::{json, Value};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Highest `support` value a ballot accepts (against / for / abstain).
pub const MAX_SUPPORT: u8 = 2;

/// A signed delegation, ready for `delegateBySig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDelegation {
    pub delegatee: Address,
    pub nonce: U256,
    pub expiry: U256,
    pub signature: TypedSignature,
}

/// A signed ballot, ready for `castVoteBySig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBallot {
    pub proposal_id: U256,
    pub support: u8,
    pub signature: TypedSignature,
}

/// Unix timestamp `ttl` from now, for use as a delegation expiry.
pub fn expiry_in(ttl: Duration) -> u64 {
    (Utc::now() + ttl).timestamp().max(0) as u64
}

/// Builds and signs typed-data messages for the governance contracts.
#[derive(Debug, Clone)]
pub struct DelegationSigner {
    chain: Arc<dyn ChainClient>,
    signer: Option<Arc<dyn TypedDataSigner>>,
    registry: Arc<AssetRegistry>,
    token_domain: String,
    governor_domain: String,
}

impl DelegationSigner {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        signer: Option<Arc<dyn TypedDataSigner>>,
        registry: Arc<AssetRegistry>,
        token_domain: impl Into<String>,
        governor_domain: impl Into<String>,
    ) -> Self {
        Self {
            chain,
            signer,
            registry,
            token_domain: token_domain.into(),
            governor_domain: governor_domain.into(),
        }
    }

    fn signer(&self) -> Result<&Arc<dyn TypedDataSigner>> {
        self.signer.as_ref().ok_or(ClientError::SigningUnavailable)
    }

    /// Domain with name, chain id and verifying contract (no version).
    fn domain(&self, name: &str, verifying_contract: Address) -> Eip712Domain {
        Eip712Domain::new(
            Some(Cow::Owned(name.to_string())),
            None,
            Some(U256::from(self.chain.chain_id())),
            Some(verifying_contract),
            None,
        )
    }

    /// Sign a delegation of the signer's votes to `delegatee`, valid until
    /// `expiry` (unix seconds).
    pub async fn create_delegation_signature(&self, delegatee: &str, expiry: u64) -> Result<SignedDelegation> {
        let delegatee = parse_address(delegatee)?;
        let signer = self.signer()?;
        let token = self.registry.contract(contract_names::FTS)?;

        let now = Utc::now().timestamp().max(0) as u64;
        if expiry <= now {
            warn!(expiry, now, "Delegation expiry is already in the past");
        }

        let nonce = read(self.chain.as_ref(), token, &IFts::noncesCall { account: signer.address() })
            .await
            .map_err(|e| ClientError::chain("delegation: nonces", e))?
            ._0;

        let message = Delegation {
            delegatee,
            nonce,
            expiry: U256::from(expiry),
        };
        let json_message = json!({
            "delegatee": delegatee.to_checksum(None),
            "nonce": nonce.to_string(),
            "expiry": expiry.to_string(),
        });
        let request = self.request(&self.token_domain, token, &message, json_message);
        debug!(delegatee = %delegatee, nonce = %nonce, expiry, "Delegation message built");

        let signature = signer
            .sign_typed_data(&request)
            .await
            .map_err(|e| ClientError::chain("delegation: sign", e))?;
        info!(signer = %signer.address(), delegatee = %delegatee, nonce = %nonce, "Delegation signed");

        Ok(SignedDelegation {
            delegatee,
            nonce,
            expiry: message.expiry,
            signature,
        })
    }

    /// Sign a ballot for `proposal_id` under the governor domain.
    pub async fn create_vote_signature(&self, proposal_id: U256, support: u8) -> Result<SignedBallot> {
        if support > MAX_SUPPORT {
            return Err(ArgumentError::option("support", format!("must be at most {}", MAX_SUPPORT)).into());
        }
        let signer = self.signer()?;
        let governor = self.registry.contract(contract_names::GOVERNOR)?;

        let message = Ballot {
            proposalId: proposal_id,
            support,
        };
        let json_message = json!({
            "proposalId": proposal_id.to_string(),
            "support": support,
        });
        let request = self.request(&self.governor_domain, governor, &message, json_message);

        let signature = signer
            .sign_typed_data(&request)
            .await
            .map_err(|e| ClientError::chain("ballot: sign", e))?;
        info!(signer = %signer.address(), proposal = %proposal_id, support, "Ballot signed");

        Ok(SignedBallot {
            proposal_id,
            support,
            signature,
        })
    }

    fn request<T: SolStruct>(
        &self,
        domain_name: &str,
        verifying_contract: Address,
        message: &T,
        json_message: Value,
    ) -> TypedDataRequest {
        let domain = self.domain(domain_name, verifying_contract);
        TypedDataRequest {
            primary_type: T::NAME,
            signing_hash: message.eip712_signing_hash(&domain),
            payload: typed_data_payload(
                T::NAME,
                message_fields(T::NAME),
                domain_name,
                self.chain.chain_id(),
                verifying_contract,
                json_message,
            ),
        }
    }
}

fn message_fields(primary_type: &str) -> Value {
    match primary_type {
        "Delegation" => json!([
            { "name": "delegatee", "type": "address" },
            { "name": "nonce", "type": "uint256" },
            { "name": "expiry", "type": "uint256" },
        ]),
        "Ballot" => json!([
            { "name": "proposalId", "type": "uint256" },
            { "name": "support", "type": "uint8" },
        ]),
        _ => json!([]),
    }
}

/// `eth_signTypedData_v4` payload for remote signers.
fn typed_data_payload(
    primary_type: &str,
    fields: Value,
    domain_name: &str,
    chain_id: u64,
    verifying_contract: Address,
    message: Value,
) -> Value {
    json!({
        "types": {
            "EIP712Domain": [
                { "name": "name", "type": "string" },
                { "name": "chainId", "type": "uint256" },
                { "name": "verifyingContract", "type": "address" },
            ],
            primary_type: fields,
        },
        "domain": {
            "name": domain_name,
            "chainId": chain_id,
            "verifyingContract": verifying_contract.to_checksum(None),
        },
        "primaryType": primary_type,
        "message": message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Network;
    use alloy::primitives::{keccak256, B256};
    use alloy::signers::SignerSync;
    use fortress_chain::test_utils::MockChain;
    use fortress_chain::LocalKeySigner;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const FTS: Address = Address::repeat_byte(0xf5);
    const GOVERNOR: Address = Address::repeat_byte(0x90);
    const DELEGATEE: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    fn setup(with_signer: bool) -> (Arc<MockChain>, LocalKeySigner, DelegationSigner) {
        let registry = AssetRegistry::builder(Network::Testnet)
            .contract(contract_names::FTS, FTS)
            .contract(contract_names::GOVERNOR, GOVERNOR)
            .build()
            .unwrap();
        let chain = Arc::new(MockChain::read_only(97));
        chain.on_read::<IFts::noncesCall, _>(FTS, U256::from(3u64));

        let key = LocalKeySigner::from_private_key(DEV_KEY).unwrap();
        let signer: Option<Arc<dyn TypedDataSigner>> = with_signer.then(|| Arc::new(key.clone()) as _);
        let delegation = DelegationSigner::new(chain.clone(), signer, Arc::new(registry), "Fortress", "Fortress Governor Alpha");
        (chain, key, delegation)
    }

    fn word(address: Address) -> [u8; 32] {
        B256::left_padding_from(address.as_slice()).0
    }

    /// Digest computed by hand from the EIP-712 encoding rules.
    fn expected_delegation_digest(delegatee: Address, nonce: u64, expiry: u64) -> B256 {
        let type_hash = keccak256("Delegation(address delegatee,uint256 nonce,uint256 expiry)");
        let mut data = type_hash.to_vec();
        data.extend_from_slice(&word(delegatee));
        data.extend_from_slice(&U256::from(nonce).to_be_bytes::<32>());
        data.extend_from_slice(&U256::from(expiry).to_be_bytes::<32>());
        let struct_hash = keccak256(&data);

        let domain_type = keccak256("EIP712Domain(string name,uint256 chainId,address verifyingContract)");
        let mut domain = domain_type.to_vec();
        domain.extend_from_slice(keccak256("Fortress").as_slice());
        domain.extend_from_slice(&U256::from(97u64).to_be_bytes::<32>());
        domain.extend_from_slice(&word(FTS));
        let separator = keccak256(&domain);

        let mut digest = vec![0x19, 0x01];
        digest.extend_from_slice(separator.as_slice());
        digest.extend_from_slice(struct_hash.as_slice());
        keccak256(&digest)
    }

    #[tokio::test]
    async fn test_delegation_signature_matches_manual_digest() {
        let (chain, key, delegation) = setup(true);
        let signed = delegation.create_delegation_signature(DELEGATEE, 10_000_000_000).await.unwrap();

        let delegatee: Address = DELEGATEE.parse().unwrap();
        assert_eq!(signed.delegatee, delegatee);
        assert_eq!(signed.nonce, U256::from(3u64));

        let digest = expected_delegation_digest(delegatee, 3, 10_000_000_000);
        let expected = key.inner().sign_hash_sync(&digest).unwrap().as_bytes();
        assert_eq!(signed.signature.to_bytes(), expected);

        // nonce read for the signer on the token contract
        let reads = chain.reads();
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].to, FTS);
        assert!(chain.sends().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_delegatee_and_missing_signer() {
        let (chain, _, delegation) = setup(true);
        let err = delegation.create_delegation_signature("0x1234", 1).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(ArgumentError::InvalidAddress { .. })));
        assert!(!chain.touched());

        let (chain, _, delegation) = setup(false);
        let err = delegation.create_delegation_signature(DELEGATEE, 1).await.unwrap_err();
        assert!(matches!(err, ClientError::SigningUnavailable));
        assert!(!chain.touched());
    }

    #[tokio::test]
    async fn test_vote_signature() {
        let (chain, key, delegation) = setup(true);
        let signed = delegation.create_vote_signature(U256::from(7u64), 1).await.unwrap();

        let domain = Eip712Domain::new(
            Some(Cow::Borrowed("Fortress Governor Alpha")),
            None,
            Some(U256::from(97u64)),
            Some(GOVERNOR),
            None,
        );
        let ballot = Ballot {
            proposalId: U256::from(7u64),
            support: 1,
        };
        let expected = key.inner().sign_hash_sync(&ballot.eip712_signing_hash(&domain)).unwrap().as_bytes();
        assert_eq!(signed.signature.to_bytes(), expected);
        assert!(!chain.touched());

        assert!(delegation.create_vote_signature(U256::from(7u64), 3).await.is_err());
    }

    #[test]
    fn test_payload_shape() {
        let payload = typed_data_payload(
            "Delegation",
            message_fields("Delegation"),
            "Fortress",
            56,
            FTS,
            json!({ "delegatee": DELEGATEE, "nonce": "0", "expiry": "1" }),
        );
        assert_eq!(payload["primaryType"], "Delegation");
        assert_eq!(payload["domain"]["chainId"], 56);
        assert_eq!(payload["types"]["Delegation"].as_array().unwrap().len(), 3);
        assert!(payload["domain"].get("version").is_none());
    }

    #[test]
    fn test_expiry_in_future() {
        let now = Utc::now().timestamp() as u64;
        assert!(expiry_in(Duration::hours(1)) >= now + 3_599);
    }
}
