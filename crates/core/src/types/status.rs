//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a persisted cart.
///
/// A cart starts `Open` and moves to `Finalized` ("validated") once. It is
/// never reopened; a new open cart is created on the next add-to-cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.cart_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    #[default]
    Open,
    Finalized,
}

impl CartStatus {
    /// Whether the cart still accepts line changes.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Finalized => write!(f, "finalized"),
        }
    }
}

impl std::str::FromStr for CartStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "finalized" => Ok(Self::Finalized),
            _ => Err(format!("invalid cart status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_status_round_trips_through_str() {
        for status in [CartStatus::Open, CartStatus::Finalized] {
            assert_eq!(status.to_string().parse::<CartStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_cart_status_default_is_open() {
        assert!(CartStatus::default().is_open());
        assert!(!CartStatus::Finalized.is_open());
    }

    #[test]
    fn test_cart_status_rejects_unknown() {
        assert!("validated".parse::<CartStatus>().is_err());
    }
}
