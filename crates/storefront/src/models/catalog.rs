//! Catalog domain types.

use rust_decimal::Decimal;

use comptoir_core::{CategoryId, ProductId};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Store-assigned ID.
    pub id: CategoryId,
    /// Display name, unique within the store.
    pub name: String,
}

/// A product with its category resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Store-assigned ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price excluding tax.
    pub price_ht: Decimal,
    /// Owning category (always present).
    pub category: Category,
}

/// Decimal places a price may carry (`NUMERIC(12, 2)`).
pub const PRICE_SCALE: u32 = 2;

/// Largest price the `NUMERIC(12, 2)` column holds.
// 999_999_999_999 × 10^-2, spelled via the const `from_parts` (`Decimal::new` is not const).
pub const MAX_PRICE_HT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Input for creating or editing a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub price_ht: Decimal,
    pub category_id: CategoryId,
}

impl ProductDraft {
    /// Check the draft's own fields. Category existence is checked by the
    /// catalog service against the store.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message when the name is blank, or the price
    /// is negative, too large, or finer than a cent.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("product name is required".to_owned());
        }
        if self.price_ht < Decimal::ZERO {
            return Err("price must be zero or more".to_owned());
        }
        if self.price_ht > MAX_PRICE_HT {
            return Err(format!("price must be at most {MAX_PRICE_HT}"));
        }
        if self.price_ht.normalize().scale() > PRICE_SCALE {
            return Err("price can have at most two decimal places".to_owned());
        }
        Ok(())
    }
}

/// Restriction applied when listing products.
///
/// An empty `category_ids` means every category; a missing bound means the
/// range is open on that side. Both bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category_ids: Vec<CategoryId>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
}

impl ProductFilter {
    /// Filter that matches every product.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether `product` passes this filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let in_category =
            self.category_ids.is_empty() || self.category_ids.contains(&product.category.id);
        let above_min = self.price_min.is_none_or(|min| product.price_ht >= min);
        let below_max = self.price_max.is_none_or(|max| product.price_ht <= max);
        in_category && above_min && below_max
    }
}

/// Products of one category, in store order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    pub category: Category,
    pub products: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i32, price: i64, category: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price_ht: Decimal::new(price, 0),
            category: Category {
                id: CategoryId::new(category),
                name: format!("Category {category}"),
            },
        }
    }

    #[test]
    fn test_filter_all_matches_everything() {
        assert!(ProductFilter::all().matches(&product(1, 0, 1)));
        assert!(ProductFilter::all().matches(&product(2, 1_000_000, 9)));
    }

    #[test]
    fn test_filter_bounds_are_inclusive() {
        let filter = ProductFilter {
            category_ids: vec![],
            price_min: Some(Decimal::new(10, 0)),
            price_max: Some(Decimal::new(50, 0)),
        };
        assert!(filter.matches(&product(1, 10, 1)));
        assert!(filter.matches(&product(2, 50, 1)));
        assert!(!filter.matches(&product(3, 9, 1)));
        assert!(!filter.matches(&product(4, 51, 1)));
    }

    #[test]
    fn test_filter_restricts_categories() {
        let filter = ProductFilter {
            category_ids: vec![CategoryId::new(2)],
            ..ProductFilter::default()
        };
        assert!(filter.matches(&product(1, 5, 2)));
        assert!(!filter.matches(&product(2, 5, 3)));
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = ProductDraft {
            name: "Widget".to_owned(),
            price_ht: Decimal::ZERO,
            category_id: CategoryId::new(1),
        };
        assert!(draft.validate().is_ok());

        draft.price_ht = Decimal::new(-1, 2);
        assert!(draft.validate().is_err());

        draft.price_ht = Decimal::ONE;
        draft.name = "   ".to_owned();
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_draft_price_fits_the_column() {
        let mut draft = ProductDraft {
            name: "Widget".to_owned(),
            price_ht: MAX_PRICE_HT,
            category_id: CategoryId::new(1),
        };
        assert!(draft.validate().is_ok());

        draft.price_ht = Decimal::new(100_000_000_000, 0);
        assert!(draft.validate().is_err());

        draft.price_ht = Decimal::new(1999, 3);
        assert!(draft.validate().is_err());

        // Trailing zeros are not extra precision.
        draft.price_ht = Decimal::new(19_900, 3);
        assert!(draft.validate().is_ok());
    }
}
