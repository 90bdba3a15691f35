//! Stateless coupon resolution.
//!
//! Nothing here touches inventory or mutates the coupon; the order engine
//! calls [`validate`] and [`compute_discount`] synchronously during
//! creation, and [`distribute_discount`] to push the discount down into
//! line items.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use bazaar_core::{CategoryId, ProductId, UserId};

use crate::error::DomainError;
use crate::models::coupon::{Coupon, CouponEligibility, CouponScope, DiscountType};

/// The per-line facts applicability is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct CouponLine {
    pub product_id: ProductId,
    pub category_id: Option<CategoryId>,
}

/// Check window, eligibility, and applicability for a redemption attempt.
///
/// # Errors
///
/// Returns the matching `DomainError` coupon variant on the first rule
/// that fails, in window -> eligibility -> applicability order.
pub fn validate(
    coupon: &Coupon,
    buyer: UserId,
    lines: &[CouponLine],
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    if let Some(starts) = coupon.starts_at
        && now < starts
    {
        return Err(DomainError::CouponNotYetActive(coupon.code.clone()));
    }
    if let Some(ends) = coupon.ends_at
        && now > ends
    {
        return Err(DomainError::CouponExpired(coupon.code.clone()));
    }

    if coupon.eligibility == CouponEligibility::Customers
        && !coupon.eligible_user_ids.contains(&buyer)
    {
        return Err(DomainError::CouponNotEligible(coupon.code.clone()));
    }

    let applies = match coupon.applies_to {
        CouponScope::All => true,
        CouponScope::Products => lines
            .iter()
            .any(|line| coupon.applicable_product_ids.contains(&line.product_id)),
        CouponScope::Categories => lines.iter().any(|line| {
            line.category_id
                .is_some_and(|c| coupon.applicable_category_ids.contains(&c))
        }),
    };
    if !applies {
        return Err(DomainError::CouponNotApplicable(coupon.code.clone()));
    }

    Ok(())
}

/// Compute the total discount against an order subtotal.
///
/// Percentage coupons take `subtotal * value / 100`; fixed coupons are
/// capped at the subtotal so the discount can never exceed it.
///
/// # Errors
///
/// Returns `DomainError::PercentageOutOfRange` if a percentage value is
/// outside 0-100.
pub fn compute_discount(coupon: &Coupon, subtotal: Decimal) -> Result<Decimal, DomainError> {
    let discount = match coupon.discount_type {
        DiscountType::Percentage => {
            if coupon.value < Decimal::ZERO || coupon.value > Decimal::ONE_HUNDRED {
                return Err(DomainError::PercentageOutOfRange(coupon.value));
            }
            (subtotal * coupon.value / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        }
        DiscountType::Fixed => coupon.value.min(subtotal),
    };
    Ok(discount)
}

/// Distribute a discount across line subtotals proportionally.
///
/// Each line's share is rounded to two decimal places; the rounding
/// remainder lands on the last line so the shares always sum to exactly
/// `discount`.
#[must_use]
pub fn distribute_discount(discount: Decimal, line_subtotals: &[Decimal]) -> Vec<Decimal> {
    let subtotal: Decimal = line_subtotals.iter().sum();
    if line_subtotals.is_empty() || subtotal.is_zero() || discount.is_zero() {
        return vec![Decimal::ZERO; line_subtotals.len()];
    }

    let mut shares = Vec::with_capacity(line_subtotals.len());
    let mut allocated = Decimal::ZERO;
    for (i, line) in line_subtotals.iter().enumerate() {
        let share = if i == line_subtotals.len() - 1 {
            discount - allocated
        } else {
            (discount * line / subtotal)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };
        allocated += share;
        shares.push(share);
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use bazaar_core::CouponId;
    use crate::models::coupon::CouponMethod;

    fn coupon(discount_type: DiscountType, value: Decimal) -> Coupon {
        Coupon {
            id: CouponId::new(1),
            code: "SAVE10".to_string(),
            method: CouponMethod::Code,
            discount_type,
            value,
            applies_to: CouponScope::All,
            applicable_product_ids: vec![],
            applicable_category_ids: vec![],
            eligibility: CouponEligibility::All,
            eligible_user_ids: vec![],
            starts_at: None,
            ends_at: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    const BUYER: UserId = UserId::new(7);

    fn line(product: i32, category: Option<i32>) -> CouponLine {
        CouponLine {
            product_id: ProductId::new(product),
            category_id: category.map(CategoryId::new),
        }
    }

    #[test]
    fn window_checks() {
        let mut c = coupon(DiscountType::Percentage, Decimal::TEN);
        c.starts_at = Some(Utc::now() + Duration::days(1));
        assert_eq!(
            validate(&c, BUYER, &[line(1, None)], Utc::now()),
            Err(DomainError::CouponNotYetActive("SAVE10".to_string()))
        );

        c.starts_at = None;
        c.ends_at = Some(Utc::now() - Duration::days(1));
        assert_eq!(
            validate(&c, BUYER, &[line(1, None)], Utc::now()),
            Err(DomainError::CouponExpired("SAVE10".to_string()))
        );
    }

    #[test]
    fn customer_restricted_eligibility() {
        let mut c = coupon(DiscountType::Percentage, Decimal::TEN);
        c.eligibility = CouponEligibility::Customers;
        c.eligible_user_ids = vec![UserId::new(99)];
        assert_eq!(
            validate(&c, BUYER, &[line(1, None)], Utc::now()),
            Err(DomainError::CouponNotEligible("SAVE10".to_string()))
        );

        c.eligible_user_ids.push(BUYER);
        assert!(validate(&c, BUYER, &[line(1, None)], Utc::now()).is_ok());
    }

    #[test]
    fn product_scope_must_intersect_lines() {
        let mut c = coupon(DiscountType::Percentage, Decimal::TEN);
        c.applies_to = CouponScope::Products;
        c.applicable_product_ids = vec![ProductId::new(5)];
        assert_eq!(
            validate(&c, BUYER, &[line(1, None), line(2, None)], Utc::now()),
            Err(DomainError::CouponNotApplicable("SAVE10".to_string()))
        );
        assert!(validate(&c, BUYER, &[line(1, None), line(5, None)], Utc::now()).is_ok());
    }

    #[test]
    fn category_scope_must_intersect_lines() {
        let mut c = coupon(DiscountType::Percentage, Decimal::TEN);
        c.applies_to = CouponScope::Categories;
        c.applicable_category_ids = vec![CategoryId::new(3)];
        assert!(validate(&c, BUYER, &[line(1, Some(3))], Utc::now()).is_ok());
        assert_eq!(
            validate(&c, BUYER, &[line(1, Some(4)), line(2, None)], Utc::now()),
            Err(DomainError::CouponNotApplicable("SAVE10".to_string()))
        );
    }

    #[test]
    fn percentage_discount() {
        let c = coupon(DiscountType::Percentage, Decimal::TEN);
        assert_eq!(
            compute_discount(&c, Decimal::new(10000, 2)).expect("discount"),
            Decimal::new(1000, 2)
        );
    }

    #[test]
    fn percentage_over_100_rejected() {
        let c = coupon(DiscountType::Percentage, Decimal::new(101, 0));
        assert_eq!(
            compute_discount(&c, Decimal::ONE_HUNDRED),
            Err(DomainError::PercentageOutOfRange(Decimal::new(101, 0)))
        );
    }

    #[test]
    fn fixed_discount_capped_at_subtotal() {
        let c = coupon(DiscountType::Fixed, Decimal::new(5000, 2));
        assert_eq!(
            compute_discount(&c, Decimal::new(3000, 2)).expect("discount"),
            Decimal::new(3000, 2)
        );
        assert_eq!(
            compute_discount(&c, Decimal::new(8000, 2)).expect("discount"),
            Decimal::new(5000, 2)
        );
    }

    #[test]
    fn distribution_sums_exactly() {
        // 10.00 over thirds rounds unevenly; the last line absorbs it.
        let lines = vec![
            Decimal::new(3333, 2),
            Decimal::new(3333, 2),
            Decimal::new(3334, 2),
        ];
        let shares = distribute_discount(Decimal::new(1000, 2), &lines);
        let total: Decimal = shares.iter().sum();
        assert_eq!(total, Decimal::new(1000, 2));
        assert_eq!(shares.len(), 3);
    }

    #[test]
    fn distribution_is_proportional() {
        let lines = vec![Decimal::new(7500, 2), Decimal::new(2500, 2)];
        let shares = distribute_discount(Decimal::new(1000, 2), &lines);
        assert_eq!(shares, vec![Decimal::new(750, 2), Decimal::new(250, 2)]);
    }

    #[test]
    fn zero_subtotal_distributes_nothing() {
        let shares = distribute_discount(Decimal::new(1000, 2), &[Decimal::ZERO]);
        assert_eq!(shares, vec![Decimal::ZERO]);
    }
}
