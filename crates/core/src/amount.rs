//! Exact conversion between human-scale amounts and on-chain mantissas.
//!
//! All scaling happens on decimal digits and `U256` integers. Native floats
//! are first rendered with their shortest round-trip decimal representation,
//! so `0.1` scales to exactly `100000000000000000` at 18 decimals instead of
//! inheriting binary floating-point error.

use crate::error::ArgumentError;
use alloy::primitives::U256;
use std::fmt;

/// Pre-computed powers of 10 for fast decimal conversion
const POW10: [u128; 39] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
    10_000_000_000_000,
    100_000_000_000_000,
    1_000_000_000_000_000,
    10_000_000_000_000_000,
    100_000_000_000_000_000,
    1_000_000_000_000_000_000,
    10_000_000_000_000_000_000,
    100_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000_000,
];

/// Largest decimal count an asset may declare.
pub const MAX_DECIMALS: u8 = 18;

/// Power of 10 as `U256`, `None` once it no longer fits.
#[inline]
pub fn checked_pow10(exp: u32) -> Option<U256> {
    if (exp as usize) < POW10.len() {
        Some(U256::from(POW10[exp as usize]))
    } else {
        U256::from(10u64).checked_pow(U256::from(exp))
    }
}

/// Power of 10 for a decimal count already checked against `MAX_DECIMALS`.
#[inline(always)]
pub(crate) fn pow10(decimals: u8) -> U256 {
    debug_assert!(decimals <= MAX_DECIMALS);
    U256::from(POW10[decimals as usize])
}

/// Amount supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Amount {
    /// Decimal string, optionally with exponent ("1.5", "2e-3")
    Decimal(String),
    /// Native float
    Float(f64),
    /// Arbitrary-precision integer
    Integer(U256),
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Decimal(s) => f.write_str(s),
            Amount::Float(v) => write!(f, "{}", v),
            Amount::Integer(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Amount {
    fn from(value: &str) -> Self {
        Amount::Decimal(value.to_string())
    }
}

impl From<String> for Amount {
    fn from(value: String) -> Self {
        Amount::Decimal(value)
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Amount::Float(value)
    }
}

impl From<U256> for Amount {
    fn from(value: U256) -> Self {
        Amount::Integer(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount::Integer(U256::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Amount::Integer(U256::from(value))
    }
}

// Signed integers go through the decimal path so negatives are rejected there.
impl From<i32> for Amount {
    fn from(value: i32) -> Self {
        Amount::Decimal(value.to_string())
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::Decimal(value.to_string())
    }
}

/// Convert `amount` into an integer mantissa.
///
/// With `is_mantissa` the amount must already be an integer and is returned
/// unchanged. Otherwise it is scaled by `10^decimals` and rounded half-up to
/// the nearest integer.
pub fn normalize(amount: &Amount, decimals: u8, is_mantissa: bool) -> Result<U256, ArgumentError> {
    if decimals > MAX_DECIMALS {
        return Err(ArgumentError::option(
            "decimals",
            format!("{} exceeds {}", decimals, MAX_DECIMALS),
        ));
    }
    let scale = if is_mantissa { 0 } else { decimals as i64 };

    match amount {
        Amount::Integer(value) => value
            .checked_mul(pow10(scale as u8))
            .ok_or_else(|| ArgumentError::amount(value, "exceeds 256 bits")),
        Amount::Float(value) => {
            if !value.is_finite() {
                return Err(ArgumentError::amount(value, "not a finite number"));
            }
            if *value < 0.0 {
                return Err(ArgumentError::amount(value, "negative"));
            }
            if *value == 0.0 {
                return Ok(U256::ZERO);
            }
            // Display prints the shortest representation that round-trips.
            scale_decimal(&format!("{}", value), scale, is_mantissa)
        }
        Amount::Decimal(value) => scale_decimal(value, scale, is_mantissa),
    }
}

/// Render a mantissa back to a human-scale decimal string (exact).
pub fn format_units(mantissa: U256, decimals: u8) -> String {
    if decimals == 0 {
        return mantissa.to_string();
    }
    // 10^78 exceeds U256::MAX, so every mantissa is below it.
    let (whole, remainder) = match checked_pow10(decimals as u32) {
        Some(divisor) => (mantissa / divisor, mantissa % divisor),
        None => (U256::ZERO, mantissa),
    };
    if remainder.is_zero() {
        return whole.to_string();
    }

    let fraction = format!("{:0>width$}", remainder, width = decimals as usize);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

/// Parsed decimal literal: `digits * 10^exponent`.
struct DecimalLiteral {
    digits: String,
    exponent: i64,
}

fn parse_decimal(raw: &str) -> Result<DecimalLiteral, ArgumentError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ArgumentError::amount(raw, "empty"));
    }
    if text.starts_with('-') {
        return Err(ArgumentError::amount(raw, "negative"));
    }
    let text = text.strip_prefix('+').unwrap_or(text);

    let (mantissa, exp) = match text.find(|c: char| c == 'e' || c == 'E') {
        Some(pos) => {
            let exp: i64 = text[pos + 1..]
                .parse()
                .map_err(|_| ArgumentError::amount(raw, "malformed exponent"))?;
            (&text[..pos], exp)
        }
        None => (text, 0),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (mantissa, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part) {
        return Err(ArgumentError::amount(raw, "not a decimal number"));
    }

    let mut digits = format!("{}{}", int_part, frac_part);
    let leading = digits.len() - digits.trim_start_matches('0').len();
    digits.drain(..leading);

    let exponent = i64::try_from(frac_part.len())
        .ok()
        .and_then(|len| exp.checked_sub(len))
        .ok_or_else(|| ArgumentError::amount(raw, "exponent out of range"))?;

    Ok(DecimalLiteral { digits, exponent })
}

fn scale_decimal(raw: &str, scale: i64, exact: bool) -> Result<U256, ArgumentError> {
    let literal = parse_decimal(raw)?;
    if literal.digits.is_empty() {
        return Ok(U256::ZERO);
    }

    let shift = literal
        .exponent
        .checked_add(scale)
        .ok_or_else(|| ArgumentError::amount(raw, "exponent out of range"))?;
    if shift >= 0 {
        let base = U256::from_str_radix(&literal.digits, 10)
            .map_err(|_| ArgumentError::amount(raw, "exceeds 256 bits"))?;
        let factor = u32::try_from(shift)
            .ok()
            .and_then(checked_pow10)
            .ok_or_else(|| ArgumentError::amount(raw, "exceeds 256 bits"))?;
        return base
            .checked_mul(factor)
            .ok_or_else(|| ArgumentError::amount(raw, "exceeds 256 bits"));
    }

    // Drop the digits below the unit and round half-up on the first one.
    let dropped = usize::try_from(shift.unsigned_abs()).unwrap_or(usize::MAX);
    let digits = literal.digits.as_str();
    let (kept, rest) = if dropped >= digits.len() {
        ("", digits)
    } else {
        digits.split_at(digits.len() - dropped)
    };
    if exact && rest.bytes().any(|b| b != b'0') {
        return Err(ArgumentError::amount(raw, "mantissa must be an integer"));
    }
    let round_up = dropped <= digits.len() && rest.as_bytes().first().is_some_and(|b| *b >= b'5');

    let base = if kept.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(kept, 10).map_err(|_| ArgumentError::amount(raw, "exceeds 256 bits"))?
    };
    if round_up {
        base.checked_add(U256::from(1u64))
            .ok_or_else(|| ArgumentError::amount(raw, "exceeds 256 bits"))
    } else {
        Ok(base)
    }
}
