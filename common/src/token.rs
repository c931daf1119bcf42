//! Token metadata and unit math.
//!
//! Token quantities are carried in base units (`u128`) alongside the token's
//! metadata and a USD valuation. [`parse_units`] and [`format_units`] convert
//! between base units and human decimal strings.

use crate::address::TokenAddress;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata for a payable token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    /// Chain the token lives on.
    pub chain_id: u64,
    /// Token contract address (mint / asset id on non-EVM rails).
    #[serde(rename = "token")]
    pub address: TokenAddress,
    /// Ticker symbol, e.g. `"USDC"`.
    pub symbol: String,
    /// Base-unit decimals.
    pub decimals: u8,
    /// Decimals to show in UIs.
    pub display_decimals: u8,
    /// USD value of one whole token.
    pub usd: f64,
    /// Conversion rate from USD: a USD amount divided by this rate yields
    /// whole-token units.
    pub price_from_usd: f64,
}

/// Reference to a token by chain and address, as used in payer preferences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRef {
    /// Chain the token lives on.
    pub chain: u64,
    /// Token contract address.
    pub address: TokenAddress,
}

/// A token quantity: base units plus the USD valuation at quote time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    /// The token being counted.
    pub token: TokenInfo,
    /// Quantity in base units.
    #[serde(with = "crate::bigint_str")]
    pub amount: u128,
    /// USD valuation of the full quantity.
    pub usd: f64,
}

impl TokenAmount {
    /// Build the token quantity worth `usd` dollars.
    ///
    /// Divides by the token's `price_from_usd` rate and scales to base
    /// units, rounding to the nearest unit. Non-finite or negative results
    /// (zero rate, negative input) yield a zero quantity; the `usd` field
    /// always records the requested amount.
    #[must_use]
    // Scaling goes through f64, matching the quote math upstream of it.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_usd(token: TokenInfo, usd: f64) -> Self {
        let whole_units = usd / token.price_from_usd;
        let scaled = whole_units * 10f64.powi(i32::from(token.decimals));
        let amount = if scaled.is_finite() && scaled > 0.0 {
            scaled.round() as u128
        } else {
            0
        };
        Self { token, amount, usd }
    }

    /// Build a token quantity from base units, valuing it at the token's
    /// current USD rate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_units(token: TokenInfo, amount: u128) -> Self {
        let whole_units = amount as f64 / 10f64.powi(i32::from(token.decimals));
        let usd = whole_units * token.usd;
        Self { token, amount, usd }
    }

    /// The quantity as a decimal string of whole units, e.g. `"25.5"`.
    #[must_use]
    pub fn units(&self) -> String {
        format_units(self.amount, self.token.decimals)
    }
}

/// Error type for [`parse_units`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseUnitsError {
    /// The input is not a decimal number.
    #[error("not a decimal amount: {0}")]
    Invalid(String),
    /// The scaled value does not fit in 128 bits.
    #[error("amount overflows: {0}")]
    Overflow(String),
}

/// Parse a decimal string into base units.
///
/// `parse_units("25.5", 6)` is `25_500_000`. Fractional digits beyond the
/// token's precision are truncated.
///
/// # Errors
///
/// Returns [`ParseUnitsError`] when the input is not a non-negative decimal
/// number or the scaled value overflows `u128`.
pub fn parse_units(value: &str, decimals: u8) -> Result<u128, ParseUnitsError> {
    let invalid = || ParseUnitsError::Invalid(value.to_string());
    let overflow = || ParseUnitsError::Overflow(value.to_string());

    let (int_part, frac_part) = match value.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (value, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let scale = 10u128.checked_pow(u32::from(decimals)).ok_or_else(overflow)?;
    let whole: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| overflow())?
    };

    let digits = usize::from(decimals);
    let truncated: String = frac_part.chars().take(digits).collect();
    let frac_scale = 10u128
        .checked_pow(u32::try_from(digits - truncated.len()).unwrap_or(u32::MAX))
        .ok_or_else(overflow)?;
    let frac: u128 = if truncated.is_empty() {
        0
    } else {
        truncated.parse::<u128>().map_err(|_| overflow())? * frac_scale
    };

    whole
        .checked_mul(scale)
        .and_then(|scaled| scaled.checked_add(frac))
        .ok_or_else(overflow)
}

/// Format base units as a decimal string of whole units.
///
/// `format_units(25_500_000, 6)` is `"25.5"`. Trailing fractional zeros are
/// trimmed; a whole number has no decimal point.
#[must_use]
pub fn format_units(amount: u128, decimals: u8) -> String {
    let Some(scale) = 10u128.checked_pow(u32::from(decimals)) else {
        // Decimals beyond the u128 range cannot occur for real tokens;
        // render the raw amount rather than panic.
        return amount.to_string();
    };
    let whole = amount / scale;
    let frac = amount % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac_digits = format!("{frac:0width$}", width = usize::from(decimals));
    format!("{whole}.{}", frac_digits.trim_end_matches('0'))
}
