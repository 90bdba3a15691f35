//! Order domain models.
//!
//! An order is created once, then mutated only through status transitions.
//! Its line items are an immutable snapshot of name/SKU/price captured at
//! purchase time and are never re-derived from the live catalog.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{
    AddressId, CouponId, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus,
    ProductId, UserId, VariantId,
};

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Human-readable unique order number (`ORD-<base36 millis>-<suffix>`).
    pub order_number: String,
    /// The buying customer.
    pub user_id: UserId,
    /// Set only when every line item belongs to the same seller.
    pub seller_id: Option<UserId>,
    /// Shipping destination.
    pub shipping_address_id: AddressId,
    /// The immutable line-item snapshot.
    pub items: Vec<OrderItem>,
    /// Sum of line subtotals before discount.
    pub subtotal: Decimal,
    /// Total coupon discount.
    pub discount_amount: Decimal,
    /// Applied coupon, if any.
    pub coupon_id: Option<CouponId>,
    /// Applied coupon code, frozen at purchase time.
    pub coupon_code: Option<String>,
    /// Shipping cost (extension point, currently zero).
    pub shipping_cost: Decimal,
    /// Tax (extension point, currently zero).
    pub tax: Decimal,
    /// `subtotal - discount_amount + shipping_cost + tax`.
    pub total: Decimal,
    /// How the customer pays.
    pub payment_method: PaymentMethod,
    /// Passive field set by an external payment event.
    pub payment_status: PaymentStatus,
    /// Stamped once when `payment_status` first becomes `paid`.
    pub paid_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Stamped once on the transition into `confirmed`.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Stamped once on the transition into `shipped`.
    pub shipped_at: Option<DateTime<Utc>>,
    /// Stamped once on the transition into `delivered`.
    pub delivered_at: Option<DateTime<Utc>>,
    /// Stamped once on the transition into `cancelled`.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Why the order was cancelled.
    pub cancellation_reason: Option<String>,
    /// Carrier tracking number, set while shipping.
    pub tracking_number: Option<String>,
    /// Notes from the customer.
    pub customer_notes: Option<String>,
    /// Internal notes from staff.
    pub admin_notes: Option<String>,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
    /// When the order was last updated.
    pub updated_at: DateTime<Utc>,
}

/// One immutable order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    /// Unique item ID.
    pub id: OrderItemId,
    /// Owning order.
    pub order_id: OrderId,
    /// The ordered product.
    pub product_id: ProductId,
    /// The product's seller at purchase time.
    pub seller_id: UserId,
    /// The matched inventory variant, if size/colors were given.
    pub variant_id: Option<VariantId>,
    /// Product English name at purchase time.
    pub product_name_en: String,
    /// Product Arabic name at purchase time.
    pub product_name_ar: Option<String>,
    /// Product SKU at purchase time.
    pub sku: String,
    /// Requested size.
    pub size: Option<String>,
    /// Requested colors (canonical order).
    pub colors: Vec<String>,
    /// Ordered quantity.
    pub quantity: i32,
    /// Frozen unit price (never recomputed).
    pub unit_price: Decimal,
    /// This line's share of the coupon discount.
    pub discount: Decimal,
    /// `unit_price * quantity - discount`.
    pub subtotal: Decimal,
}

/// One requested line in `POST /orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemInput {
    /// The product to order.
    pub product_id: ProductId,
    /// Requested quantity.
    pub quantity: i32,
    /// Requested size, if targeting a variant.
    pub size: Option<String>,
    /// Requested colors, if targeting a variant.
    #[serde(default)]
    pub colors: Vec<String>,
}

/// Input for `POST /orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    /// The requested lines, processed in input order.
    pub items: Vec<OrderItemInput>,
    /// Shipping destination (must belong to the buyer).
    pub shipping_address_id: AddressId,
    /// How the customer pays.
    pub payment_method: PaymentMethod,
    /// Optional coupon code.
    pub coupon_code: Option<String>,
    /// Notes from the customer.
    pub customer_notes: Option<String>,
}

/// Input for `PATCH /orders/{id}` (pending-only edits).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrderInput {
    /// New shipping destination.
    pub shipping_address_id: Option<AddressId>,
    /// New customer notes.
    pub customer_notes: Option<String>,
}

/// Input for `PATCH /orders/{id}/status`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrderStatusInput {
    /// New lifecycle status.
    pub status: Option<OrderStatus>,
    /// New payment status (external event).
    pub payment_status: Option<PaymentStatus>,
    /// Carrier tracking number.
    pub tracking_number: Option<String>,
    /// Internal staff notes.
    pub admin_notes: Option<String>,
    /// Required when cancelling.
    pub cancellation_reason: Option<String>,
}
