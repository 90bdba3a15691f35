//! Coupon domain model.
//!
//! Coupon validation is stateless: eligibility, date window, and
//! applicability are evaluated against the order at redemption time and
//! nothing about the coupon mutates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use bazaar_core::{CategoryId, CouponId, ParseStatusError, ProductId, UserId};

/// How a coupon is attached to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CouponMethod {
    /// Applied automatically when eligible.
    Automatic,
    /// Requires the customer to enter the code.
    #[default]
    Code,
}

/// The shape of the discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` percent off the subtotal (0-100).
    Percentage,
    /// `value` currency units off, capped at the subtotal.
    Fixed,
}

/// Which products a coupon applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CouponScope {
    #[default]
    All,
    Products,
    Categories,
}

/// Which customers may redeem a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CouponEligibility {
    #[default]
    All,
    Customers,
}

/// A discount coupon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    /// Unique coupon ID.
    pub id: CouponId,
    /// Redemption code (unique).
    pub code: String,
    /// Automatic vs code-based.
    pub method: CouponMethod,
    /// Percentage or fixed.
    pub discount_type: DiscountType,
    /// Percent (0-100) or currency amount, per `discount_type`.
    pub value: Decimal,
    /// Applicability scope.
    pub applies_to: CouponScope,
    /// Products in scope when `applies_to == Products`.
    pub applicable_product_ids: Vec<ProductId>,
    /// Categories in scope when `applies_to == Categories`.
    pub applicable_category_ids: Vec<CategoryId>,
    /// Eligibility scope.
    pub eligibility: CouponEligibility,
    /// Customers in scope when `eligibility == Customers`.
    pub eligible_user_ids: Vec<UserId>,
    /// Start of the active window.
    pub starts_at: Option<DateTime<Utc>>,
    /// End of the active window.
    pub ends_at: Option<DateTime<Utc>>,
    /// Inactive coupons cannot be redeemed.
    pub active: bool,
    /// When the coupon was created.
    pub created_at: DateTime<Utc>,
}

macro_rules! impl_text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// The canonical string form, as stored in the database.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseStatusError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

impl_text_enum!(CouponMethod, "coupon method", {
    Automatic => "automatic",
    Code => "code",
});

impl_text_enum!(DiscountType, "discount type", {
    Percentage => "percentage",
    Fixed => "fixed",
});

impl_text_enum!(CouponScope, "coupon scope", {
    All => "all",
    Products => "products",
    Categories => "categories",
});

impl_text_enum!(CouponEligibility, "coupon eligibility", {
    All => "all",
    Customers => "customers",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_enums_round_trip() {
        assert_eq!(
            "percentage".parse::<DiscountType>().expect("parse"),
            DiscountType::Percentage
        );
        assert_eq!(DiscountType::Fixed.as_str(), "fixed");
        assert_eq!(
            "categories".parse::<CouponScope>().expect("parse"),
            CouponScope::Categories
        );
        assert!("bogus".parse::<CouponEligibility>().is_err());
    }
}
