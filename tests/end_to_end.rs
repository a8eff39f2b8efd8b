//! End-to-end scenarios through the `Fortress` facade over a mock chain.

use alloy::primitives::{Address, U256};
use fortress::{
    AssetRegistry, ClientConfig, ClientError, Fortress, LocalKeySigner, Network, TxOptions, TypedDataSigner,
};
use fortress_chain::contracts::{IComptroller, IERC20, IFToken, IFts, IPriceOracle};
use fortress_chain::test_utils::MockChain;
use fortress_core::assets::contract_names;
use std::sync::Arc;

const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const DELEGATEE: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

const DAI: Address = Address::repeat_byte(0x01);
const USDC: Address = Address::repeat_byte(0x02);
const F_BNB: Address = Address::repeat_byte(0x10);
const F_DAI: Address = Address::repeat_byte(0x11);
const F_USDC: Address = Address::repeat_byte(0x12);
const COMPTROLLER: Address = Address::repeat_byte(0xcc);
const ORACLE: Address = Address::repeat_byte(0x0e);
const FTS: Address = Address::repeat_byte(0xf5);

fn registry() -> Arc<AssetRegistry> {
    let registry = AssetRegistry::builder(Network::Mainnet)
        .market("BNB", None, F_BNB, None)
        .market("DAI", Some(DAI), F_DAI, None)
        .market("USDC", Some(USDC), F_USDC, None)
        .contract(contract_names::COMPTROLLER, COMPTROLLER)
        .contract(contract_names::FTS, FTS)
        .build()
        .unwrap();
    Arc::new(registry)
}

fn client(with_signer: bool) -> (Arc<MockChain>, Fortress) {
    let key = LocalKeySigner::from_private_key(DEV_KEY).unwrap();
    let chain = Arc::new(MockChain::new(56, key.address()));
    let signer: Option<Arc<dyn TypedDataSigner>> = with_signer.then(|| Arc::new(key) as _);
    let fortress = Fortress::new(ClientConfig::default(), chain.clone(), signer, registry()).unwrap();
    (chain, fortress)
}

fn e18(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

#[tokio::test]
async fn supply_one_dai_mints_one_e18() {
    let (chain, fortress) = client(false);
    chain.on_read::<IERC20::allowanceCall, _>(DAI, e18(5));

    let outcome = fortress.supply("DAI", 1, false, TxOptions::default()).await.unwrap();
    assert!(outcome.approval.is_none());

    let sends = chain.sends();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].to, F_DAI);
    assert_eq!(
        sends[0].decode::<IFToken::mintCall>().mintAmount,
        U256::from(1_000_000_000_000_000_000u128)
    );
}

#[tokio::test]
async fn supply_with_short_allowance_approves_exactly_once() {
    let (chain, fortress) = client(false);
    chain.on_read::<IERC20::allowanceCall, _>(USDC, U256::ZERO);

    // USDC carries 18 decimals on chain 56
    fortress.supply("USDC", "2", false, TxOptions::default()).await.unwrap();

    let sends = chain.sends();
    let approvals: Vec<_> = sends.iter().filter(|s| s.is::<IERC20::approveCall>()).collect();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].decode::<IERC20::approveCall>().amount, e18(2));
    assert_eq!(sends.last().unwrap().decode::<IFToken::mintCall>().mintAmount, e18(2));
}

#[tokio::test]
async fn redeem_derivative_symbol_uses_token_units() {
    let (chain, fortress) = client(false);
    fortress.redeem("fDAI", 1, TxOptions::default()).await.unwrap();

    let sends = chain.sends();
    assert!(sends[0].is::<IFToken::redeemCall>());
    assert!(!sends[0].is::<IFToken::redeemUnderlyingCall>());
    assert_eq!(sends[0].decode::<IFToken::redeemCall>().redeemTokens, U256::from(100_000_000u64));
}

#[tokio::test]
async fn repay_own_borrow_and_reject_garbage_borrower() {
    let (chain, fortress) = client(false);
    fortress
        .repay_borrow("DAI", 1, Some(""), true, TxOptions::default())
        .await
        .unwrap();
    assert!(chain.sends()[0].is::<IFToken::repayBorrowCall>());

    chain.clear_history();
    let err = fortress
        .repay_borrow("DAI", 1, Some("not-an-address"), false, TxOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));
    assert!(!chain.touched());
}

#[tokio::test]
async fn price_in_default_quote_asset() {
    let (chain, fortress) = client(false);
    chain.on_read::<IComptroller::oracleCall, _>(COMPTROLLER, ORACLE);
    // DAI at $1.01, USDC at $1 (both 18 decimals here)
    let price = |key| IPriceOracle::getUnderlyingPriceCall { fToken: key };
    chain.on_call(ORACLE, &price(F_DAI), U256::from(1_010_000_000_000_000_000u128));
    chain.on_call(ORACLE, &price(F_USDC), e18(1));

    let dai = fortress.get_price("DAI", None).await.unwrap();
    assert_eq!(dai.to_string(), "1.01");

    let forward = fortress.get_price("DAI", Some("USDC")).await.unwrap();
    let backward = fortress.get_price("USDC", Some("DAI")).await.unwrap();
    assert!((forward.to_f64() * backward.to_f64() - 1.0).abs() < 1e-12);
    assert!(chain.sends().is_empty());
}

#[tokio::test]
async fn delegation_signature_round_trip_through_delegate_by_sig() {
    let (chain, fortress) = client(true);
    chain.on_read::<IFts::noncesCall, _>(FTS, U256::from(0u64));

    let signed = fortress
        .create_delegation_signature(DELEGATEE, 4_102_444_800)
        .await
        .unwrap();
    assert!(chain.sends().is_empty());

    fortress
        .delegate_by_sig(DELEGATEE, signed.nonce, signed.expiry, &signed.signature, TxOptions::default())
        .await
        .unwrap();
    let call = chain.sends()[0].decode::<IFts::delegateBySigCall>();
    assert_eq!(call.delegatee, signed.delegatee);
    assert_eq!(call.expiry, U256::from(4_102_444_800u64));
    assert_eq!(call.v, signed.signature.v);
}

#[tokio::test]
async fn delegation_without_signer_is_unavailable() {
    let (_, fortress) = client(false);
    let err = fortress.create_delegation_signature(DELEGATEE, 1).await.unwrap_err();
    assert!(matches!(err, ClientError::SigningUnavailable));
}

#[test]
fn chain_and_registry_must_agree() {
    let chain = Arc::new(MockChain::read_only(97));
    let result = Fortress::new(ClientConfig::default(), chain, None, registry());
    assert!(result.is_err());
}
