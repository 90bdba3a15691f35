//! Cart domain models.
//!
//! Carts are advisory: stock checks happen at mutation time but reserve
//! nothing, so checkout can still fail if stock moved meanwhile.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{CartId, CartItemId, CouponId, ProductId, UserId, VariantId};

/// A customer's cart (one per user, created lazily).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    /// Unique cart ID.
    pub id: CartId,
    /// Owning customer.
    pub user_id: UserId,
    /// Applied coupon, if any.
    pub coupon_id: Option<CouponId>,
    /// Ordered list of items.
    pub items: Vec<CartItem>,
    /// Sum of item subtotals before discount.
    pub subtotal: Decimal,
    /// Discount from the applied coupon.
    pub discount_amount: Decimal,
    /// Shipping cost (extension point, currently zero).
    pub shipping_cost: Decimal,
    /// Tax (extension point, currently zero).
    pub tax: Decimal,
    /// `subtotal - discount_amount + shipping_cost + tax`.
    pub total: Decimal,
    /// When the cart was created.
    pub created_at: DateTime<Utc>,
    /// When the cart was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A single cart line.
///
/// `unit_price` and `subtotal` are snapshots taken at add time; they are
/// re-snapshotted only when the line itself is mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Unique item ID.
    pub id: CartItemId,
    /// Owning cart.
    pub cart_id: CartId,
    /// The product.
    pub product_id: ProductId,
    /// The matched inventory variant, if size/colors were given.
    pub variant_id: Option<VariantId>,
    /// Requested quantity.
    pub quantity: i32,
    /// Requested size.
    pub size: Option<String>,
    /// Requested colors (canonical order).
    pub colors: Vec<String>,
    /// Unit price snapshotted at add time.
    pub unit_price: Decimal,
    /// `unit_price * quantity`.
    pub subtotal: Decimal,
    /// Display position within the cart.
    pub position: i32,
}

impl CartItem {
    /// Whether an incoming add should merge into this line.
    ///
    /// Product, variant, size, and color set must all match exactly;
    /// otherwise the add appends a new line.
    #[must_use]
    pub fn merges_with(
        &self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        size: Option<&str>,
        colors: &[String],
    ) -> bool {
        self.product_id == product_id
            && self.variant_id == variant_id
            && self.size.as_deref() == size
            && self.colors == super::inventory::canonical_colors(colors)
    }
}

/// Input for `POST /cart/items`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddCartItemInput {
    /// The product to add.
    pub product_id: ProductId,
    /// Requested quantity.
    pub quantity: i32,
    /// Requested size, if targeting a variant.
    pub size: Option<String>,
    /// Requested colors, if targeting a variant.
    #[serde(default)]
    pub colors: Vec<String>,
}

/// Input for `PATCH /cart/items/{item_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCartItemInput {
    /// New quantity for the line.
    pub quantity: i32,
}

/// Input for `PATCH /cart` (coupon apply/clear and wholesale item replace).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartPatchInput {
    /// Apply this coupon code.
    pub coupon_code: Option<String>,
    /// Remove the currently applied coupon.
    #[serde(default)]
    pub remove_coupon: bool,
    /// Replace all items with this list (validated like adds).
    pub items: Option<Vec<AddCartItemInput>>,
}
