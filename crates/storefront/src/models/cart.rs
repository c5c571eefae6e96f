//! Cart domain types.
//!
//! A persisted [`Cart`] belongs to an authenticated user and is stored in
//! `PostgreSQL`. A [`GuestCart`] lives only in the visitor's session and holds
//! a name/price snapshot taken when each product was added.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use comptoir_core::{CartId, CartStatus, ProductId, UserId};

use super::catalog::Product;

/// A persisted cart record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub status: CartStatus,
    /// Running total maintained on every line mutation.
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

/// One line of a cart as shown to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub price_ht: Decimal,
    /// Always greater than zero.
    pub quantity: i32,
}

impl CartItem {
    /// New line with a single unit of `product`.
    #[must_use]
    pub fn single(product: &Product) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price_ht: product.price_ht,
            quantity: 1,
        }
    }

    /// `price_ht * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price_ht * Decimal::from(self.quantity)
    }
}

/// The requester's cart contents with the summed total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSummary {
    /// Set only when backed by a persisted cart.
    pub cart_id: Option<CartId>,
    pub items: Vec<CartItem>,
    pub total: Decimal,
}

impl CartSummary {
    /// Build a summary, computing the total by summation over `items`.
    #[must_use]
    pub fn from_items(cart_id: Option<CartId>, items: Vec<CartItem>) -> Self {
        let total = sum_lines(&items);
        Self {
            cart_id,
            items,
            total,
        }
    }

    /// An empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }

    /// Find the line for `product_id`.
    #[must_use]
    pub fn item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }
}

/// Sum of `price_ht * quantity` over `items`.
#[must_use]
pub fn sum_lines(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_total).sum()
}

/// Session-held cart for visitors who are not logged in.
///
/// Lines keep insertion order and there is at most one line per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestCart {
    lines: Vec<CartItem>,
}

impl GuestCart {
    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartItem] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add one unit of `product`, snapshotting its name and price on first add.
    pub fn add(&mut self, product: &Product) {
        match self.line_mut(product.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => self.lines.push(CartItem::single(product)),
        }
    }

    /// Drop the line for `product_id`. Returns whether a line was removed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        self.lines.len() != before
    }

    /// Set the quantity of an existing line; zero or less removes it.
    /// Returns whether the cart changed.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i32) -> bool {
        if quantity <= 0 {
            return self.remove(product_id);
        }
        match self.line_mut(product_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Sum of the snapshotted line totals.
    #[must_use]
    pub fn total(&self) -> Decimal {
        sum_lines(&self.lines)
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartItem> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::catalog::Category;
    use comptoir_core::CategoryId;

    fn widget(price: i64) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Widget".to_owned(),
            price_ht: Decimal::new(price, 0),
            category: Category {
                id: CategoryId::new(1),
                name: "Tools".to_owned(),
            },
        }
    }

    #[test]
    fn test_guest_cart_repeated_add_increments() {
        let mut cart = GuestCart::default();
        cart.add(&widget(20));
        cart.add(&widget(20));

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
        assert_eq!(cart.total(), Decimal::new(40, 0));
    }

    #[test]
    fn test_guest_cart_keeps_price_snapshot() {
        let mut cart = GuestCart::default();
        cart.add(&widget(20));
        // Price changed in the catalog afterwards; the snapshot wins.
        cart.add(&widget(25));

        assert_eq!(cart.lines()[0].price_ht, Decimal::new(20, 0));
        assert_eq!(cart.total(), Decimal::new(40, 0));
    }

    #[test]
    fn test_guest_cart_set_quantity_zero_removes() {
        let mut cart = GuestCart::default();
        cart.add(&widget(20));

        assert!(cart.set_quantity(ProductId::new(1), 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_guest_cart_set_quantity_on_missing_line_is_noop() {
        let mut cart = GuestCart::default();
        assert!(!cart.set_quantity(ProductId::new(9), 3));
        assert!(!cart.remove(ProductId::new(9)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_guest_cart_serializes_for_session() {
        let mut cart = GuestCart::default();
        cart.add(&widget(20));

        let value = serde_json::to_value(&cart).unwrap();
        let restored: GuestCart = serde_json::from_value(value).unwrap();
        assert_eq!(restored, cart);
    }

    #[test]
    fn test_summary_counts_units() {
        let mut cart = GuestCart::default();
        cart.add(&widget(3));
        cart.add(&widget(3));
        let summary = CartSummary::from_items(None, cart.lines().to_vec());

        assert_eq!(summary.item_count(), 2);
        assert_eq!(summary.total, Decimal::new(6, 0));
        assert!(summary.item(ProductId::new(1)).is_some());
    }
}
