use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use super::error::ValidationError;

pub const MAX_SLIPPAGE_BPS: u16 = 10_000;

fn parse_mint(mint: &str) -> Result<Pubkey, String> {
    if mint.trim().is_empty() {
        return Err("must not be empty".to_string());
    }
    Pubkey::from_str(mint.trim()).map_err(|_| format!("{mint} is not a valid mint address"))
}

pub fn validate_pair(input_mint: &str, output_mint: &str) -> Result<(Pubkey, Pubkey), ValidationError> {
    let input = parse_mint(input_mint).map_err(ValidationError::InputAsset)?;
    let output = parse_mint(output_mint).map_err(ValidationError::OutputAsset)?;

    if input == output {
        return Err(ValidationError::OutputAsset(format!(
            "{output_mint} is the same as the input asset"
        )));
    }
    Ok((input, output))
}

pub fn validate_amount(amount: u64) -> Result<(), ValidationError> {
    if amount == 0 {
        return Err(ValidationError::Amount("must be greater than zero".to_string()));
    }
    Ok(())
}

pub fn validate_ui_amount(amount: Decimal) -> Result<(), ValidationError> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::Amount(format!("{amount} must be greater than zero")));
    }
    Ok(())
}

pub fn validate_slippage(slippage_bps: u16) -> Result<(), ValidationError> {
    if slippage_bps > MAX_SLIPPAGE_BPS {
        return Err(ValidationError::Slippage(slippage_bps));
    }
    Ok(())
}

/// Everything a provider checks before its quote request leaves the process.
pub fn validate_quote_request(
    input_mint: &str,
    output_mint: &str,
    amount: u64,
    slippage_bps: u16,
) -> Result<(), ValidationError> {
    validate_pair(input_mint, output_mint)?;
    validate_amount(amount)?;
    validate_slippage(slippage_bps)
}

/// Exactly one destination per swap.
pub fn single_destination(output_mints: &[String]) -> Result<&str, ValidationError> {
    match output_mints {
        [] => Err(ValidationError::Destination("no destination asset given".to_string())),
        [output] => Ok(output.as_str()),
        many => Err(ValidationError::Destination(format!(
            "expected one destination asset, got {}",
            many.len()
        ))),
    }
}

/// Scales a UI amount to smallest units, truncating sub-unit dust.
pub fn ui_to_units(amount: Decimal, decimals: u8) -> Result<u64, ValidationError> {
    validate_ui_amount(amount)?;

    let scale = 10u64
        .checked_pow(u32::from(decimals))
        .ok_or_else(|| ValidationError::Amount(format!("unsupported decimals: {decimals}")))?;
    let units = amount
        .checked_mul(Decimal::from(scale))
        .map(|scaled| scaled.trunc())
        .and_then(|scaled| scaled.to_u64())
        .ok_or_else(|| ValidationError::Amount(format!("{amount} is out of range")))?;

    validate_amount(units).map_err(|_| {
        ValidationError::Amount(format!("{amount} is below the smallest unit of a {decimals}-decimal token"))
    })?;
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    const SOL: &str = "So11111111111111111111111111111111111111112";
    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    #[test]
    fn rejects_identical_assets() {
        let error = validate_pair(SOL, SOL).unwrap_err();
        assert!(error.to_string().starts_with("invalid output asset:"));
    }

    #[test]
    fn rejects_empty_and_malformed_assets() {
        assert!(matches!(validate_pair("", USDC), Err(ValidationError::InputAsset(_))));
        assert!(matches!(validate_pair(SOL, "not-a-mint"), Err(ValidationError::OutputAsset(_))));
        assert!(validate_pair(SOL, USDC).is_ok());
    }

    #[test]
    fn rejects_zero_amount_and_excess_slippage() {
        assert!(validate_quote_request(SOL, USDC, 0, 50).is_err());
        assert_eq!(
            validate_quote_request(SOL, USDC, 1, 10_001),
            Err(ValidationError::Slippage(10_001))
        );
        assert!(validate_quote_request(SOL, USDC, 1, 10_000).is_ok());
        assert!(validate_quote_request(SOL, USDC, 1, 0).is_ok());
    }

    #[test]
    fn needs_exactly_one_destination() {
        assert!(single_destination(&[]).is_err());
        assert_eq!(single_destination(&[USDC.to_string()]), Ok(USDC));
        assert!(single_destination(&[USDC.to_string(), SOL.to_string()]).is_err());
    }

    #[test]
    fn ui_amounts_scale_by_decimals() {
        assert_eq!(ui_to_units(Decimal::new(15, 1), 9), Ok(1_500_000_000));
        assert_eq!(ui_to_units(Decimal::new(1_234_567, 6), 6), Ok(1_234_567));
        assert_eq!(ui_to_units(Decimal::new(12_345_678, 7), 6), Ok(1_234_567));
    }

    #[test]
    fn ui_amounts_must_be_positive_and_representable() {
        assert!(ui_to_units(Decimal::ZERO, 9).is_err());
        assert!(ui_to_units(Decimal::new(-1, 0), 9).is_err());
        assert!(ui_to_units(Decimal::new(1, 10), 6).is_err());
        assert!(ui_to_units(Decimal::from(u64::MAX), 9).is_err());
    }
}
