//! Mixed-case checksummed address encoding (EIP-55).

use crate::error::ArgumentError;
use alloy::primitives::{keccak256, Address};

/// Validate a 20-byte hex address and return its checksummed form.
///
/// The `0x` prefix is optional. Input may be all lower-case or all upper-case.
/// Mixed-case input is taken as an already checksummed address and must match
/// the computed casing.
pub fn checksum(address: &str) -> Result<String, ArgumentError> {
    let body = address.strip_prefix("0x").unwrap_or(address);
    if body.len() != 40 {
        return Err(ArgumentError::address(
            address,
            format!("expected 40 hex characters, got {}", body.len()),
        ));
    }
    if !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ArgumentError::address(address, "non-hex character"));
    }

    let lower = body.to_ascii_lowercase();
    let hash = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }

    let has_upper = body.bytes().any(|b| b.is_ascii_uppercase());
    let has_lower = body.bytes().any(|b| b.is_ascii_lowercase());
    if has_upper && has_lower && out[2..] != *body {
        return Err(ArgumentError::address(address, "checksum mismatch"));
    }
    Ok(out)
}

/// Whether `address` is exactly in its checksummed form.
pub fn is_checksum_valid(address: &str) -> bool {
    checksum(address).is_ok_and(|canonical| canonical == address)
}

/// Validate and parse an address.
pub fn parse_address(address: &str) -> Result<Address, ArgumentError> {
    let canonical = checksum(address)?;
    canonical
        .parse()
        .map_err(|e| ArgumentError::address(address, format!("{}", e)))
}
