//! Cross-asset prices through the protocol oracle.
//!
//! The oracle returns the USD price of one underlying mantissa unit scaled so
//! that `price * 10^decimals / 1e36` is the USD value of a whole token. The
//! price of one whole `A` in `B` is therefore
//!
//! ```text
//!   (P_A * 10^d_A) / (P_B * 10^d_B)
//! ```
//!
//! and a derivative side is converted with
//! `one fToken = exchangeRate / 10^(18 + d_underlying - 8)` underlying.
//! Every product is kept as an exact 512-bit rational.

use crate::assets::{contract_names, AssetRef, AssetRegistry, DERIVATIVE_DECIMALS};
use crate::error::{ClientError, Result};
use alloy::primitives::{Address, U256, U512};
use fortress_chain::contracts::{IComptroller, IFToken, IPriceOracle};
use fortress_chain::{read, ChainClient};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Fixed precision of exchange rates.
const EXCHANGE_RATE_DECIMALS: u32 = 18;

fn pow10_wide(exp: u32) -> U512 {
    U512::from(10u64).pow(U512::from(exp))
}

/// Exact price ratio `numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub numerator: U512,
    pub denominator: U512,
}

impl PriceQuote {
    /// Build a quote reduced to lowest terms.
    pub fn new(numerator: U512, denominator: U512) -> Self {
        let divisor = numerator.gcd(denominator);
        if divisor.is_zero() {
            return Self { numerator, denominator };
        }
        Self {
            numerator: numerator / divisor,
            denominator: denominator / divisor,
        }
    }

    pub fn is_one(&self) -> bool {
        self.numerator == self.denominator
    }

    /// Decimal rendering truncated to `precision` fractional digits.
    pub fn to_decimal_string(&self, precision: u32) -> String {
        let scaled = self.numerator * pow10_wide(precision) / self.denominator;
        let digits = scaled.to_string();
        if precision == 0 {
            return digits;
        }
        let precision = precision as usize;
        let padded = if digits.len() <= precision {
            format!("{}{}", "0".repeat(precision + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - precision);
        format!("{}.{}", int_part, frac_part)
    }

    pub fn to_f64(&self) -> f64 {
        self.to_decimal_string(18).parse().unwrap_or(f64::NAN)
    }

    /// Product of two quotes.
    pub fn mul(&self, other: &PriceQuote) -> PriceQuote {
        PriceQuote::new(
            self.numerator * other.numerator,
            self.denominator * other.denominator,
        )
    }
}

impl fmt::Display for PriceQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_decimal_string(18);
        let trimmed = text.trim_end_matches('0').trim_end_matches('.');
        f.write_str(trimmed)
    }
}

/// One side of a price, as read from the chain.
#[derive(Debug, Clone, Copy)]
struct Side {
    price: U256,
    exchange_rate: Option<U256>,
    underlying_decimals: u8,
}

impl Side {
    /// Value of one whole token of this side as a rational in USD-scaled
    /// units: `P * 10^d` (times the derivative conversion).
    fn value(&self) -> (U512, U512) {
        let base = U512::from(self.price) * pow10_wide(self.underlying_decimals as u32);
        match self.exchange_rate {
            Some(rate) => (
                base * U512::from(rate),
                pow10_wide(EXCHANGE_RATE_DECIMALS - DERIVATIVE_DECIMALS as u32 + self.underlying_decimals as u32),
            ),
            None => (base, U512::from(1u64)),
        }
    }
}

/// Derives the price of any supported asset in any other.
#[derive(Debug, Clone)]
pub struct PriceResolver {
    chain: Arc<dyn ChainClient>,
    registry: Arc<AssetRegistry>,
    quote_asset: String,
}

impl PriceResolver {
    pub fn new(chain: Arc<dyn ChainClient>, registry: Arc<AssetRegistry>, quote_asset: impl Into<String>) -> Self {
        Self {
            chain,
            registry,
            quote_asset: quote_asset.into(),
        }
    }

    /// Symbol used when no quote asset is given.
    pub fn quote_asset(&self) -> &str {
        &self.quote_asset
    }

    /// Price of one whole `asset` in `in_asset` (default quote asset).
    #[instrument(skip(self), fields(network = %self.registry.network()))]
    pub async fn get_price(&self, asset: &str, in_asset: Option<&str>) -> Result<PriceQuote> {
        let in_asset = in_asset.unwrap_or(&self.quote_asset);
        let base = self.registry.resolve(asset)?;
        let quote = self.registry.resolve(in_asset)?;

        let oracle = self.oracle().await?;
        let (base_side, quote_side) = tokio::try_join!(self.side(oracle, base), self.side(oracle, quote))?;

        let (base_num, base_den) = base_side.value();
        let (quote_num, quote_den) = quote_side.value();
        let price = PriceQuote::new(base_num * quote_den, base_den * quote_num);
        debug!(asset, in_asset, price = %price, "Price resolved");
        Ok(price)
    }

    async fn oracle(&self) -> Result<Address> {
        let comptroller = self.registry.contract(contract_names::COMPTROLLER)?;
        let oracle = read(self.chain.as_ref(), comptroller, &IComptroller::oracleCall {})
            .await
            .map_err(|e| ClientError::chain("price: oracle lookup", e))?
            ._0;
        Ok(oracle)
    }

    async fn side(&self, oracle: Address, asset: AssetRef<'_>) -> Result<Side> {
        let key = asset.price_key();
        let price_call = IPriceOracle::getUnderlyingPriceCall { fToken: key };
        let price = read(self.chain.as_ref(), oracle, &price_call)
            .await
            .map_err(|e| ClientError::chain("price: getUnderlyingPrice", e))?
            ._0;
        if price.is_zero() {
            return Err(ClientError::PriceUnavailable {
                symbol: asset.symbol().to_string(),
            });
        }

        let exchange_rate = if asset.is_derivative() {
            let rate = read(self.chain.as_ref(), key, &IFToken::exchangeRateCurrentCall {})
                .await
                .map_err(|e| ClientError::chain("price: exchangeRateCurrent", e))?
                ._0;
            if rate.is_zero() {
                return Err(ClientError::PriceUnavailable {
                    symbol: asset.symbol().to_string(),
                });
            }
            Some(rate)
        } else {
            None
        };

        Ok(Side {
            price,
            exchange_rate,
            underlying_decimals: asset.underlying_decimals(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Network;
    use fortress_chain::test_utils::MockChain;

    const COMPTROLLER: Address = Address::repeat_byte(0xcc);
    const ORACLE: Address = Address::repeat_byte(0x0e);
    const F_DAI: Address = Address::repeat_byte(0x11);
    const F_USDC: Address = Address::repeat_byte(0x12);
    const FAI_KEY: Address = Address::repeat_byte(0x03);

    fn e(exp: u32) -> U256 {
        U256::from(10u64).pow(U256::from(exp))
    }

    /// DAI at $1 (18 decimals), USDC at $1 (6 decimals), FAI at $2,
    /// fDAI exchange rate 0.02 DAI per fDAI.
    fn setup() -> (Arc<MockChain>, PriceResolver) {
        let registry = AssetRegistry::builder(Network::Testnet)
            .market("DAI", Some(Address::repeat_byte(0x01)), F_DAI, None)
            .market("USDC", Some(Address::repeat_byte(0x02)), F_USDC, None)
            .oracle_asset("FAI", FAI_KEY, None)
            .contract(contract_names::COMPTROLLER, COMPTROLLER)
            .build()
            .unwrap();

        let chain = Arc::new(MockChain::read_only(97));
        chain.on_read::<IComptroller::oracleCall, _>(COMPTROLLER, ORACLE);
        let price = |key| IPriceOracle::getUnderlyingPriceCall { fToken: key };
        chain.on_call(ORACLE, &price(F_DAI), e(18));
        chain.on_call(ORACLE, &price(F_USDC), e(30));
        chain.on_call(ORACLE, &price(FAI_KEY), U256::from(2u64) * e(18));
        // 0.02 * 1e18 * 1e18 / 1e8
        chain.on_read::<IFToken::exchangeRateCurrentCall, _>(F_DAI, U256::from(2u64) * e(26));

        let resolver = PriceResolver::new(chain.clone(), Arc::new(registry), "USDC");
        (chain, resolver)
    }

    #[tokio::test]
    async fn test_same_asset_is_one() {
        let (_, resolver) = setup();
        assert!(resolver.get_price("DAI", Some("DAI")).await.unwrap().is_one());
        assert!(resolver.get_price("fDAI", Some("fDAI")).await.unwrap().is_one());
    }

    #[tokio::test]
    async fn test_plain_ratio_across_decimals() {
        let (_, resolver) = setup();
        let dai = resolver.get_price("DAI", None).await.unwrap();
        assert!(dai.is_one(), "DAI/USDC = {}", dai);

        let fai = resolver.get_price("FAI", Some("DAI")).await.unwrap();
        assert_eq!(fai.to_string(), "2");
    }

    #[tokio::test]
    async fn test_derivative_reduces_to_exchange_rate() {
        let (_, resolver) = setup();
        let fdai = resolver.get_price("fDAI", Some("DAI")).await.unwrap();
        assert_eq!(fdai.to_string(), "0.02");

        let dai_in_fdai = resolver.get_price("DAI", Some("fDAI")).await.unwrap();
        assert_eq!(dai_in_fdai.to_string(), "50");

        let fdai_usdc = resolver.get_price("fDAI", Some("USDC")).await.unwrap();
        assert_eq!(fdai_usdc.to_decimal_string(4), "0.0200");
    }

    #[tokio::test]
    async fn test_inverse_product_is_one() {
        let (_, resolver) = setup();
        for (a, b) in [("DAI", "USDC"), ("fDAI", "FAI"), ("USDC", "fDAI")] {
            let forward = resolver.get_price(a, Some(b)).await.unwrap();
            let backward = resolver.get_price(b, Some(a)).await.unwrap();
            assert!(forward.mul(&backward).is_one(), "{}/{}", a, b);
        }
    }

    #[tokio::test]
    async fn test_unsupported_and_unpriced() {
        let (chain, resolver) = setup();
        let err = resolver.get_price("WBTC", None).await.unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedAsset { .. }));
        assert!(!chain.touched());

        chain.on_call(
            ORACLE,
            &IPriceOracle::getUnderlyingPriceCall { fToken: FAI_KEY },
            U256::ZERO,
        );
        let err = resolver.get_price("FAI", None).await.unwrap_err();
        assert!(matches!(err, ClientError::PriceUnavailable { symbol } if symbol == "FAI"));
    }

    #[test]
    fn test_decimal_rendering() {
        let third = PriceQuote::new(U512::from(1u64), U512::from(3u64));
        assert_eq!(third.to_decimal_string(4), "0.3333");
        assert_eq!(third.to_decimal_string(0), "0");
        assert!((third.to_f64() - 1.0 / 3.0).abs() < 1e-12);

        let big = PriceQuote::new(U512::from(12_345u64), U512::from(100u64));
        assert_eq!(big.to_string(), "123.45");
        assert_eq!(big.denominator, U512::from(20u64));
    }
}
