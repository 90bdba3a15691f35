//! Product catalog domain model.
//!
//! The catalog itself is maintained elsewhere; the core consumes it for
//! pricing, stock, and the legal size/color sets.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{CategoryId, ProductId, UserId};

/// A product catalog record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Owning seller.
    pub seller_id: UserId,
    /// Category (used for coupon applicability).
    pub category_id: Option<CategoryId>,
    /// English display name.
    pub name_en: String,
    /// Arabic display name.
    pub name_ar: Option<String>,
    /// Globally unique SKU.
    pub sku: String,
    /// Authoritative list price.
    pub original_price: Decimal,
    /// Optional sale price, valid only inside its window.
    pub sale_price: Option<Decimal>,
    /// Start of the sale window.
    pub sale_starts_at: Option<DateTime<Utc>>,
    /// End of the sale window.
    pub sale_ends_at: Option<DateTime<Utc>>,
    /// Flat authoritative stock counter.
    pub stock_quantity: i32,
    /// Legal sizes for this product.
    pub sizes: Vec<String>,
    /// Legal colors for this product.
    pub colors: Vec<String>,
    /// Inactive products cannot be ordered.
    pub active: bool,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The sale price, if one is configured and `now` falls inside its window.
    ///
    /// An open-ended bound (missing start or end) does not constrain the
    /// window on that side.
    #[must_use]
    pub fn active_sale_price(&self, now: DateTime<Utc>) -> Option<Decimal> {
        let sale = self.sale_price?;
        if let Some(start) = self.sale_starts_at
            && now < start
        {
            return None;
        }
        if let Some(end) = self.sale_ends_at
            && now > end
        {
            return None;
        }
        Some(sale)
    }

    /// Whether `size` is in the product's declared size set.
    #[must_use]
    pub fn offers_size(&self, size: &str) -> bool {
        self.sizes.iter().any(|s| s == size)
    }

    /// Whether `color` is in the product's declared color set.
    #[must_use]
    pub fn offers_color(&self, color: &str) -> bool {
        self.colors.iter().any(|c| c == color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn product_with_sale(
        sale: Option<Decimal>,
        starts: Option<DateTime<Utc>>,
        ends: Option<DateTime<Utc>>,
    ) -> Product {
        Product {
            id: ProductId::new(1),
            seller_id: UserId::new(1),
            category_id: None,
            name_en: "Linen Shirt".to_string(),
            name_ar: None,
            sku: "SHIRT-001".to_string(),
            original_price: Decimal::new(5000, 2),
            sale_price: sale,
            sale_starts_at: starts,
            sale_ends_at: ends,
            stock_quantity: 10,
            sizes: vec!["S".to_string(), "M".to_string()],
            colors: vec!["Red".to_string(), "Blue".to_string()],
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn sale_price_applies_inside_window() {
        let now = Utc::now();
        let product = product_with_sale(
            Some(Decimal::new(4000, 2)),
            Some(now - Duration::days(1)),
            Some(now + Duration::days(1)),
        );
        assert_eq!(product.active_sale_price(now), Some(Decimal::new(4000, 2)));
    }

    #[test]
    fn sale_price_ignored_outside_window() {
        let now = Utc::now();
        let expired = product_with_sale(
            Some(Decimal::new(4000, 2)),
            Some(now - Duration::days(10)),
            Some(now - Duration::days(1)),
        );
        assert_eq!(expired.active_sale_price(now), None);

        let upcoming = product_with_sale(
            Some(Decimal::new(4000, 2)),
            Some(now + Duration::days(1)),
            None,
        );
        assert_eq!(upcoming.active_sale_price(now), None);
    }

    #[test]
    fn open_ended_window_is_unbounded() {
        let now = Utc::now();
        let product = product_with_sale(Some(Decimal::new(4000, 2)), None, None);
        assert_eq!(product.active_sale_price(now), Some(Decimal::new(4000, 2)));
    }

    #[test]
    fn size_and_color_membership() {
        let product = product_with_sale(None, None, None);
        assert!(product.offers_size("M"));
        assert!(!product.offers_size("XL"));
        assert!(product.offers_color("Red"));
        assert!(!product.offers_color("Green"));
    }
}
