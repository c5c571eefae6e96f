//! Custom Askama template filters.

use std::fmt::Display;
use std::str::FromStr;

use rust_decimal::Decimal;

use comptoir_core::Price;

/// Formats an amount as euros with two decimal places.
///
/// Usage in templates: `{{ product.price_ht|money }}` renders `€19.90`.
/// Input that is not a decimal is rendered unchanged.
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn money(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(Decimal::from_str(raw.trim()).map_or(raw, |amount| Price::eur(amount).to_string()))
}
