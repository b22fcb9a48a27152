//! Type-safe price representation using decimal arithmetic.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a Shopify money amount cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid money amount: {0:?}")]
pub struct PriceError(pub String);

/// A price with currency information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: String,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub fn new(amount: Decimal, currency_code: impl Into<String>) -> Self {
        Self {
            amount,
            currency_code: currency_code.into(),
        }
    }

    /// Parse a Shopify `Decimal` scalar (e.g. `"19.5"`).
    ///
    /// # Errors
    ///
    /// Returns `PriceError` if the amount is not a decimal number.
    pub fn parse(amount: &str, currency_code: impl Into<String>) -> Result<Self, PriceError> {
        let amount =
            Decimal::from_str(amount.trim()).map_err(|_| PriceError(amount.to_string()))?;
        Ok(Self::new(amount, currency_code))
    }

    /// Format for display, e.g. `$1,234.50` or `CHF19.00`.
    ///
    /// Amounts are rounded half away from zero to two decimals and the
    /// integer part is grouped by thousands.
    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{}{}",
            currency_symbol(&self.currency_code),
            format_amount(self.amount)
        )
    }
}

/// Display symbol for an ISO 4217 code; unknown codes are returned as-is.
#[must_use]
pub fn currency_symbol(code: &str) -> &str {
    match code {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "CAD" => "CA$",
        "AUD" => "A$",
        "JPY" | "CNY" => "¥",
        "INR" => "₹",
        "BRL" => "R$",
        "MXN" => "MX$",
        "SEK" | "NOK" | "DKK" => "kr",
        "NZD" => "NZ$",
        "SGD" => "S$",
        "HKD" => "HK$",
        other => other,
    }
}

fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{fraction}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats_two_decimals() {
        assert_eq!(Price::parse("19.5", "USD").unwrap().display(), "$19.50");
        assert_eq!(Price::parse("0", "EUR").unwrap().display(), "€0.00");
        assert_eq!(Price::parse("7", "GBP").unwrap().display(), "£7.00");
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Price::parse("1234.5", "USD").unwrap().display(), "$1,234.50");
        assert_eq!(
            Price::parse("1234567.891", "CAD").unwrap().display(),
            "CA$1,234,567.89"
        );
        assert_eq!(Price::parse("999.999", "USD").unwrap().display(), "$1,000.00");
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        assert_eq!(Price::parse("2.345", "USD").unwrap().display(), "$2.35");
        assert_eq!(Price::parse("2.125", "USD").unwrap().display(), "$2.13");
    }

    #[test]
    fn test_unknown_currency_uses_code() {
        assert_eq!(Price::parse("10", "CHF").unwrap().display(), "CHF10.00");
        assert_eq!(Price::parse("10", "PLN").unwrap().display(), "PLN10.00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Price::parse("ten", "USD").is_err());
        assert!(Price::parse("", "USD").is_err());
    }
}
