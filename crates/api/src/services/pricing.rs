//! Unit price resolution.
//!
//! The same chain is used by the cart (advisory snapshot) and the order
//! engine (frozen into the line item): variant price override, else the
//! product's sale price inside its active window, else the original price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::inventory::Variant;
use crate::models::product::Product;

/// Resolve the effective unit price for a product, optionally through a
/// matched variant.
#[must_use]
pub fn resolve_unit_price(
    product: &Product,
    variant: Option<&Variant>,
    now: DateTime<Utc>,
) -> Decimal {
    if let Some(price) = variant.and_then(|v| v.overrides.price_override) {
        return price;
    }
    product
        .active_sale_price(now)
        .unwrap_or(product.original_price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::{InventoryId, ProductId, UserId, VariantId};
    use chrono::Duration;

    use crate::models::inventory::VariantOverrides;

    fn product(original: Decimal, sale: Option<Decimal>) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(1),
            seller_id: UserId::new(1),
            category_id: None,
            name_en: "Mug".to_string(),
            name_ar: None,
            sku: "MUG-001".to_string(),
            original_price: original,
            sale_price: sale,
            sale_starts_at: Some(now - Duration::days(1)),
            sale_ends_at: Some(now + Duration::days(1)),
            stock_quantity: 10,
            sizes: vec![],
            colors: vec![],
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn variant(price_override: Option<Decimal>) -> Variant {
        Variant {
            id: VariantId::new(1),
            inventory_id: InventoryId::new(1),
            size: "M".to_string(),
            colors: vec![],
            quantity: 5,
            image_url: None,
            overrides: VariantOverrides {
                price_override,
                ..VariantOverrides::default()
            },
            attributes: serde_json::Map::new(),
        }
    }

    #[test]
    fn variant_override_wins() {
        let p = product(Decimal::new(2000, 2), Some(Decimal::new(1500, 2)));
        let v = variant(Some(Decimal::new(1200, 2)));
        assert_eq!(
            resolve_unit_price(&p, Some(&v), Utc::now()),
            Decimal::new(1200, 2)
        );
    }

    #[test]
    fn sale_price_beats_original_inside_window() {
        let p = product(Decimal::new(2000, 2), Some(Decimal::new(1500, 2)));
        assert_eq!(
            resolve_unit_price(&p, None, Utc::now()),
            Decimal::new(1500, 2)
        );
        // Variant without an override falls through to the sale price.
        let v = variant(None);
        assert_eq!(
            resolve_unit_price(&p, Some(&v), Utc::now()),
            Decimal::new(1500, 2)
        );
    }

    #[test]
    fn original_price_when_no_sale() {
        let p = product(Decimal::new(2000, 2), None);
        assert_eq!(
            resolve_unit_price(&p, None, Utc::now()),
            Decimal::new(2000, 2)
        );
    }

    #[test]
    fn expired_sale_falls_back_to_original() {
        let mut p = product(Decimal::new(2000, 2), Some(Decimal::new(1500, 2)));
        p.sale_ends_at = Some(Utc::now() - Duration::hours(1));
        assert_eq!(
            resolve_unit_price(&p, None, Utc::now()),
            Decimal::new(2000, 2)
        );
    }
}
