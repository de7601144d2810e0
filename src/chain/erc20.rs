//! ERC-20 binding and token unit helpers

use crate::{Error, Result};
use alloy::primitives::U256;
use alloy::sol;

sol! {
    #[sol(rpc)]
    contract IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address owner) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
    }
}

/// Format a raw token amount as a decimal string, trimming trailing zeros.
pub fn format_units(raw: U256, decimals: u8) -> String {
    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = raw / divisor;
    let frac = raw % divisor;

    if frac.is_zero() {
        return whole.to_string();
    }

    let frac_str = format!("{:0>width$}", frac, width = decimals as usize);
    let trimmed = frac_str.trim_end_matches('0');
    format!("{}.{}", whole, trimmed)
}

/// Parse a decimal string into raw token units.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(Error::InvalidAmount("empty amount".into()));
    }

    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if frac.len() > decimals as usize {
        return Err(Error::InvalidAmount(format!(
            "{} has more than {} decimal places",
            amount, decimals
        )));
    }
    if !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
        || (whole.is_empty() && frac.is_empty())
    {
        return Err(Error::InvalidAmount(format!("not a decimal number: {}", amount)));
    }

    let whole_part = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10)
            .map_err(|_| Error::InvalidAmount(format!("number too large: {}", amount)))?
    };
    let frac_padded = format!("{:0<width$}", frac, width = decimals as usize);
    let frac_part = if frac_padded.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&frac_padded, 10)
            .map_err(|_| Error::InvalidAmount(format!("number too large: {}", amount)))?
    };

    let scale = U256::from(10u64).pow(U256::from(decimals));
    whole_part
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_part))
        .ok_or_else(|| Error::InvalidAmount(format!("number too large: {}", amount)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_amounts() {
        assert_eq!(format_units(U256::from(5_000_000u64), 6), "5");
        assert_eq!(format_units(U256::ZERO, 18), "0");
    }

    #[test]
    fn formats_fractional_amounts() {
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(
            format_units(U256::from(1_000_000_000_000_000u64), 18),
            "0.001"
        );
        assert_eq!(format_units(U256::from(123_456u64), 6), "0.123456");
    }

    #[test]
    fn parses_whole_and_fractional() {
        assert_eq!(parse_units("5", 6).unwrap(), U256::from(5_000_000u64));
        assert_eq!(parse_units("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(
            parse_units("0.001", 18).unwrap(),
            U256::from(1_000_000_000_000_000u64)
        );
        assert_eq!(parse_units(".5", 6).unwrap(), U256::from(500_000u64));
    }

    #[test]
    fn parse_format_roundtrip() {
        let raw = parse_units("12.345678", 6).unwrap();
        assert_eq!(format_units(raw, 6), "12.345678");
    }

    #[test]
    fn rejects_garbage_and_excess_precision() {
        assert!(parse_units("abc", 6).is_err());
        assert!(parse_units("", 6).is_err());
        assert!(parse_units("1.2345678", 6).is_err());
        assert!(parse_units("-1", 6).is_err());
        assert!(parse_units(".", 6).is_err());
    }
}
