//! Typed-data signing capability.
//!
//! Signers receive a fully built EIP-712 request: the 32-byte signing hash
//! for signers holding a key, and the `eth_signTypedData_v4` JSON payload for
//! signer proxies that only accept structured data.

use crate::error::{ChainError, ChainResult};
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

/// `(v, r, s)` signature over a typed-data hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedSignature {
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl TypedSignature {
    /// Parse the 65-byte `r || s || v` encoding. A recovery id of 0/1 is
    /// lifted to 27/28.
    pub fn from_bytes(bytes: &[u8]) -> ChainResult<Self> {
        if bytes.len() != 65 {
            return Err(ChainError::Signing(format!(
                "expected 65 signature bytes, got {}",
                bytes.len()
            )));
        }
        let v = match bytes[64] {
            v @ (0 | 1) => v + 27,
            v @ (27 | 28) => v,
            other => {
                return Err(ChainError::Signing(format!("invalid recovery id {}", other)));
            }
        };
        Ok(Self {
            v,
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
        })
    }

    /// The 65-byte `r || s || v` encoding.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(self.r.as_slice());
        out[32..64].copy_from_slice(self.s.as_slice());
        out[64] = self.v;
        out
    }
}

/// A typed-data message ready to be signed.
#[derive(Debug, Clone)]
pub struct TypedDataRequest {
    /// Primary type name (e.g. "Delegation")
    pub primary_type: &'static str,
    /// keccak256("\x19\x01" || domainSeparator || hashStruct(message))
    pub signing_hash: B256,
    /// `eth_signTypedData_v4` payload (types, domain, primaryType, message)
    pub payload: serde_json::Value,
}

/// Capability that produces typed-data signatures for one account.
#[async_trait]
pub trait TypedDataSigner: Send + Sync + Debug {
    /// Account the signatures recover to.
    fn address(&self) -> Address;

    /// Sign the request without submitting anything.
    async fn sign_typed_data(&self, request: &TypedDataRequest) -> ChainResult<TypedSignature>;
}

/// Signer holding a raw secp256k1 key.
#[derive(Debug, Clone)]
pub struct LocalKeySigner {
    inner: PrivateKeySigner,
}

impl LocalKeySigner {
    /// Parse a hex private key (with or without 0x prefix).
    pub fn from_private_key(private_key: &str) -> ChainResult<Self> {
        let key_str = private_key.trim().trim_start_matches("0x");
        let inner: PrivateKeySigner = key_str
            .parse()
            .map_err(|e| ChainError::Signing(format!("invalid private key: {}", e)))?;
        Ok(Self { inner })
    }

    /// Underlying alloy signer (used to build the sending wallet).
    pub fn inner(&self) -> &PrivateKeySigner {
        &self.inner
    }
}

#[async_trait]
impl TypedDataSigner for LocalKeySigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_typed_data(&self, request: &TypedDataRequest) -> ChainResult<TypedSignature> {
        debug!(
            signer = %self.inner.address(),
            primary_type = request.primary_type,
            hash = %request.signing_hash,
            "Signing typed data locally"
        );
        let signature = self
            .inner
            .sign_hash(&request.signing_hash)
            .await
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        TypedSignature::from_bytes(&signature.as_bytes())
    }
}

/// Signer proxy that forwards `eth_signTypedData_v4` to a node or wallet
/// endpoint managing the key.
#[derive(Debug, Clone)]
pub struct RpcTypedDataSigner {
    rpc_url: String,
    address: Address,
}

impl RpcTypedDataSigner {
    pub fn new(rpc_url: impl Into<String>, address: Address) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            address,
        }
    }
}

#[async_trait]
impl TypedDataSigner for RpcTypedDataSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_typed_data(&self, request: &TypedDataRequest) -> ChainResult<TypedSignature> {
        let url: url::Url = self
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::Transport(format!("invalid rpc url: {}", e)))?;
        let provider = ProviderBuilder::new().on_http(url);

        debug!(
            signer = %self.address,
            primary_type = request.primary_type,
            "Requesting eth_signTypedData_v4"
        );
        let raw: Bytes = provider
            .raw_request(
                "eth_signTypedData_v4".into(),
                (self.address, request.payload.to_string()),
            )
            .await
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        TypedSignature::from_bytes(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::keccak256;
    use alloy::signers::SignerSync;

    // Well-known development key (DO NOT USE IN PRODUCTION)
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_local_signer_address() {
        let signer = LocalKeySigner::from_private_key(DEV_KEY).unwrap();
        assert_eq!(
            format!("{:?}", signer.address()).to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        assert!(LocalKeySigner::from_private_key("0x1234").is_err());
    }

    #[test]
    fn test_signature_bytes() {
        let mut raw = [0x11u8; 65];
        raw[64] = 1;
        let sig = TypedSignature::from_bytes(&raw).unwrap();
        assert_eq!(sig.v, 28);
        assert_eq!(sig.r, B256::repeat_byte(0x11));

        let back = sig.to_bytes();
        assert_eq!(back[64], 28);
        assert_eq!(&back[..64], &raw[..64]);

        raw[64] = 5;
        assert!(TypedSignature::from_bytes(&raw).is_err());
        assert!(TypedSignature::from_bytes(&raw[..64]).is_err());
    }

    #[tokio::test]
    async fn test_local_signer_signs_hash() {
        let signer = LocalKeySigner::from_private_key(DEV_KEY).unwrap();
        let hash = keccak256(b"fortress");
        let request = TypedDataRequest {
            primary_type: "Delegation",
            signing_hash: hash,
            payload: serde_json::Value::Null,
        };

        let sig = signer.sign_typed_data(&request).await.unwrap();
        let expected = signer.inner().sign_hash_sync(&hash).unwrap().as_bytes();
        assert_eq!(sig.to_bytes(), expected);
        assert!(sig.v == 27 || sig.v == 28);
    }
}
