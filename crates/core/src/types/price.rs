//! Price representation using decimal arithmetic.
//!
//! All catalog amounts are prices excluding tax ("HT"). There is no tax,
//! discount or rounding logic here: a line costs `price_ht * quantity`.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount with currency information, used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., euros, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a euro price, the storefront's only currency.
    #[must_use]
    pub const fn eur(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::EUR)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount.round_dp(2)
        )
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    EUR,
    USD,
    GBP,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::EUR => "€",
            Self::USD => "$",
            Self::GBP => "£",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_two_decimals() {
        assert_eq!(Price::eur(Decimal::new(20, 0)).to_string(), "€20.00");
        assert_eq!(Price::eur(Decimal::new(1999, 2)).to_string(), "€19.99");
    }

    #[test]
    fn test_display_rounds_extra_precision() {
        assert_eq!(Price::eur(Decimal::new(10_005, 3)).to_string(), "€10.00");
    }
}
