//! Inventory ledger domain models.
//!
//! One ledger per product, holding zero or more variants (size x color
//! combination). `total_quantity` caches the sum of variant quantities and is
//! recomputed on every write; it is the value queried for stock-status
//! filtering.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{InventoryId, ProductId, VariantId};

/// The per-product inventory ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    /// Unique ledger ID.
    pub id: InventoryId,
    /// The product this ledger belongs to (one-to-one).
    pub product_id: ProductId,
    /// Cached sum of all variant quantities.
    pub total_quantity: i32,
    /// The variants in this ledger.
    pub variants: Vec<Variant>,
    /// When the ledger was created.
    pub created_at: DateTime<Utc>,
    /// When the ledger was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A size x color combination with its own quantity and overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    /// Stable variant ID (the only supported addressing scheme).
    pub id: VariantId,
    /// Owning ledger.
    pub inventory_id: InventoryId,
    /// Variant size; must be in the product's declared sizes.
    pub size: String,
    /// Variant colors, stored sorted and de-duplicated.
    pub colors: Vec<String>,
    /// Units on hand for this combination.
    pub quantity: i32,
    /// Optional variant image.
    pub image_url: Option<String>,
    /// Typed attribute overrides.
    #[serde(flatten)]
    pub overrides: VariantOverrides,
    /// Free-form extension attributes beyond the typed overrides.
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Known per-variant overrides of product-level attributes.
///
/// Anything else a variant wants to override goes in the generic
/// `attributes` map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantOverrides {
    /// Price override for this combination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_override: Option<Decimal>,
    /// Weight override for this combination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_override: Option<Decimal>,
    /// SKU override for this combination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku_override: Option<String>,
}

/// Input for creating or replacing a variant.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantInput {
    /// Variant size.
    pub size: String,
    /// Variant colors (any order; canonicalized on write).
    #[serde(default)]
    pub colors: Vec<String>,
    /// Units on hand.
    pub quantity: i32,
    /// Optional variant image.
    pub image_url: Option<String>,
    /// Typed attribute overrides.
    #[serde(flatten, default)]
    pub overrides: VariantOverrides,
    /// Free-form extension attributes.
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Variant {
    /// Whether this variant matches the given size/colors request.
    ///
    /// Size compares by equality; colors compare as an order-independent
    /// set. An unspecified size matches any variant size.
    #[must_use]
    pub fn matches(&self, size: Option<&str>, colors: &[String]) -> bool {
        if let Some(requested) = size
            && self.size != requested
        {
            return false;
        }
        self.colors == canonical_colors(colors)
    }
}

/// Canonical form of a color set: sorted and de-duplicated.
///
/// Stored variants always hold canonical color lists, so set equality
/// reduces to list equality.
#[must_use]
pub fn canonical_colors(colors: &[String]) -> Vec<String> {
    let mut canonical: Vec<String> = colors.to_vec();
    canonical.sort();
    canonical.dedup();
    canonical
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(size: &str, colors: &[&str]) -> Variant {
        Variant {
            id: VariantId::new(1),
            inventory_id: InventoryId::new(1),
            size: size.to_string(),
            colors: canonical_colors(
                &colors.iter().map(ToString::to_string).collect::<Vec<_>>(),
            ),
            quantity: 5,
            image_url: None,
            overrides: VariantOverrides::default(),
            attributes: serde_json::Map::new(),
        }
    }

    #[test]
    fn canonical_colors_sorts_and_dedups() {
        let colors = vec![
            "Red".to_string(),
            "Blue".to_string(),
            "Red".to_string(),
        ];
        assert_eq!(
            canonical_colors(&colors),
            vec!["Blue".to_string(), "Red".to_string()]
        );
    }

    #[test]
    fn match_is_order_independent_on_colors() {
        let v = variant("M", &["Red", "Blue"]);
        assert!(v.matches(
            Some("M"),
            &["Blue".to_string(), "Red".to_string()]
        ));
        assert!(v.matches(
            Some("M"),
            &["Red".to_string(), "Blue".to_string()]
        ));
        assert!(!v.matches(Some("L"), &["Red".to_string(), "Blue".to_string()]));
        assert!(!v.matches(Some("M"), &["Red".to_string()]));
    }

    #[test]
    fn unspecified_size_matches_any() {
        let v = variant("M", &["Red"]);
        assert!(v.matches(None, &["Red".to_string()]));
    }
}
