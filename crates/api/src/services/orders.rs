//! Order engine.
//!
//! Creation runs as one database transaction: every touched product and
//! variant row is locked (`SELECT ... FOR UPDATE`) for the duration of
//! validate-then-decrement, so two concurrent orders for the last unit
//! cannot both pass the availability check. A failure at any line aborts
//! the whole call with no partial order and no stock touched.
//!
//! Status transitions and deletion take the same locks before restoring
//! stock, so a cancellation cannot interleave with a new order on the
//! same variant.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};

use bazaar_core::{OrderId, OrderStatus, PaymentStatus, ProductId, UserId, VariantId};

use crate::db::orders::{NewOrder, NewOrderItem, OrderStatusWrite};
use crate::db::{AddressRepository, CouponRepository, OrderRepository, inventory, orders, products};
use crate::error::{AppError, DomainError};
use crate::models::auth::AuthScope;
use crate::models::coupon::Coupon;
use crate::models::inventory::canonical_colors;
use crate::models::order::{CreateOrderInput, Order, UpdateOrderInput, UpdateOrderStatusInput};
use crate::services::{coupons, pricing};

/// How many fresh order numbers to try before giving up.
const ORDER_NUMBER_ATTEMPTS: u32 = 5;

/// One validated line, priced and ready to persist.
struct PreparedLine {
    item: NewOrderItem,
    coupon_line: coupons::CouponLine,
}

/// Order engine service.
pub struct OrderService {
    pool: PgPool,
}

impl OrderService {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Place an order: the critical transaction.
    ///
    /// Lines are processed sequentially in input order. Each product (and
    /// matched variant) is locked, validated against current stock, and
    /// priced; after every line passes, the optional coupon is resolved
    /// and distributed, the order and its immutable snapshot are
    /// persisted, and only then are stock decrements applied. Commit
    /// makes all of it visible at once.
    ///
    /// # Errors
    ///
    /// Any per-line validation error (`ProductNotFound`,
    /// `InsufficientStock`, `VariantNotFound`, ...), any coupon error, or
    /// `AddressNotFound`/`AccessDenied` for a bad shipping address. On
    /// error nothing is persisted.
    #[instrument(skip(self, scope, input), fields(user_id = %scope.user_id, lines = input.items.len()))]
    pub async fn create(
        &self,
        scope: &AuthScope,
        input: CreateOrderInput,
    ) -> Result<Order, AppError> {
        if input.items.is_empty() {
            return Err(AppError::BadRequest("order has no items".to_string()));
        }
        for item in &input.items {
            if item.quantity < 1 {
                return Err(DomainError::InvalidQuantity(item.quantity).into());
            }
        }

        let address = AddressRepository::new(&self.pool)
            .get(input.shipping_address_id)
            .await?
            .ok_or(DomainError::AddressNotFound(input.shipping_address_id))?;
        if address.user_id != scope.user_id {
            return Err(DomainError::AccessDenied.into());
        }

        // Coupon lookup does not need the lock scope; validation against
        // the lines happens after they are prepared.
        let coupon = match &input.coupon_code {
            Some(code) => Some(
                CouponRepository::new(&self.pool)
                    .get_active_by_code(code)
                    .await?
                    .ok_or_else(|| DomainError::CouponNotFound(code.clone()))?,
            ),
            None => None,
        };

        let mut tx = self.pool.begin().await?;
        let order = self
            .create_in_tx(&mut tx, scope, &input, coupon.as_ref())
            .await?;
        tx.commit().await?;

        info!(order_id = %order.id, order_number = %order.order_number, total = %order.total, "order placed");
        Ok(order)
    }

    async fn create_in_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        scope: &AuthScope,
        input: &CreateOrderInput,
        coupon: Option<&Coupon>,
    ) -> Result<Order, AppError> {
        let now = Utc::now();
        let mut lines: Vec<PreparedLine> = Vec::with_capacity(input.items.len());
        // Lines may repeat a product or variant; availability is checked
        // against the running total across the whole order, not each line
        // in isolation.
        let mut product_requested: HashMap<ProductId, i32> = HashMap::new();
        let mut variant_requested: HashMap<VariantId, i32> = HashMap::new();

        for item in &input.items {
            let product = products::get_for_update(&mut *tx, item.product_id)
                .await?
                .ok_or(DomainError::ProductNotFound(item.product_id))?;
            if !product.active {
                return Err(DomainError::ProductNotActive(item.product_id).into());
            }
            let requested = product_requested
                .entry(item.product_id)
                .and_modify(|q| *q += item.quantity)
                .or_insert(item.quantity);
            if *requested > product.stock_quantity {
                return Err(DomainError::InsufficientStock {
                    product_id: product.id,
                    requested: *requested,
                    available: product.stock_quantity,
                }
                .into());
            }
            if let Some(size) = &item.size
                && !product.offers_size(size)
            {
                return Err(DomainError::InvalidSize {
                    product_id: product.id,
                    size: size.clone(),
                }
                .into());
            }
            for color in &item.colors {
                if !product.offers_color(color) {
                    return Err(DomainError::InvalidColor {
                        product_id: product.id,
                        color: color.clone(),
                    }
                    .into());
                }
            }

            let colors = canonical_colors(&item.colors);
            let variant = if item.size.is_some() || !colors.is_empty() {
                let variant = inventory::find_variant_for_update(
                    &mut *tx,
                    item.product_id,
                    item.size.as_deref(),
                    &colors,
                )
                .await?
                .ok_or(DomainError::VariantNotFound {
                    product_id: product.id,
                })?;
                let requested = variant_requested
                    .entry(variant.id)
                    .and_modify(|q| *q += item.quantity)
                    .or_insert(item.quantity);
                if *requested > variant.quantity {
                    return Err(DomainError::InsufficientVariantStock {
                        variant_id: variant.id,
                        requested: *requested,
                        available: variant.quantity,
                    }
                    .into());
                }
                Some(variant)
            } else {
                None
            };

            // Frozen into the snapshot; never recomputed after this point.
            let unit_price = pricing::resolve_unit_price(&product, variant.as_ref(), now);
            lines.push(PreparedLine {
                item: NewOrderItem {
                    product_id: product.id,
                    seller_id: product.seller_id,
                    variant_id: variant.as_ref().map(|v| v.id),
                    product_name_en: product.name_en.clone(),
                    product_name_ar: product.name_ar.clone(),
                    sku: product.sku.clone(),
                    size: item.size.clone(),
                    colors,
                    quantity: item.quantity,
                    unit_price,
                    discount: Decimal::ZERO,
                    subtotal: unit_price * Decimal::from(item.quantity),
                },
                coupon_line: coupons::CouponLine {
                    product_id: product.id,
                    category_id: product.category_id,
                },
            });
        }

        let subtotal: Decimal = lines.iter().map(|l| l.item.subtotal).sum();

        let mut discount_amount = Decimal::ZERO;
        if let Some(coupon) = coupon {
            let coupon_lines: Vec<_> = lines.iter().map(|l| l.coupon_line).collect();
            coupons::validate(coupon, scope.user_id, &coupon_lines, now)?;
            discount_amount = coupons::compute_discount(coupon, subtotal)?;

            let gross: Vec<Decimal> = lines.iter().map(|l| l.item.subtotal).collect();
            let shares = coupons::distribute_discount(discount_amount, &gross);
            for (line, share) in lines.iter_mut().zip(shares) {
                line.item.discount = share;
                line.item.subtotal -= share;
            }
        }

        let shipping_cost = Decimal::ZERO;
        let tax = Decimal::ZERO;
        let total = subtotal - discount_amount + shipping_cost + tax;

        let order_number = reserve_order_number(&mut *tx).await?;
        let header = NewOrder {
            order_number,
            user_id: scope.user_id,
            seller_id: single_seller(lines.iter().map(|l| l.item.seller_id)),
            shipping_address_id: input.shipping_address_id,
            subtotal,
            discount_amount,
            coupon_id: coupon.map(|c| c.id),
            coupon_code: coupon.map(|c| c.code.clone()),
            shipping_cost,
            tax,
            total,
            payment_method: input.payment_method,
            customer_notes: input.customer_notes.clone(),
        };

        let mut order = orders::insert_order(&mut *tx, &header).await?;
        let items: Vec<NewOrderItem> = lines.into_iter().map(|l| l.item).collect();
        order.items = orders::insert_items(&mut *tx, order.id, &items).await?;

        // Persisted first, stock effects second; the transaction makes
        // them atomic either way.
        for item in &order.items {
            products::adjust_stock(&mut *tx, item.product_id, -item.quantity).await?;
            if let Some(variant_id) = item.variant_id {
                inventory::adjust_variant_quantity(&mut *tx, variant_id, -item.quantity).await?;
            }
        }

        Ok(order)
    }

    /// Get one order, enforcing view access.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` if it does not exist, `AccessDenied` if
    /// the caller may not see it.
    pub async fn get(&self, scope: &AuthScope, id: OrderId) -> Result<Order, AppError> {
        let order = OrderRepository::new(&self.pool)
            .get(id)
            .await?
            .ok_or(DomainError::OrderNotFound)?;
        let sellers = line_sellers(&order);
        if !scope.can_view_order(order.user_id, &sellers) {
            return Err(DomainError::AccessDenied.into());
        }
        Ok(order)
    }

    /// List orders visible to the caller.
    ///
    /// Admins see all orders, sellers those containing their products,
    /// customers their own.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn list(&self, scope: &AuthScope) -> Result<Vec<Order>, AppError> {
        let repo = OrderRepository::new(&self.pool);
        let orders = if scope.is_admin() {
            repo.list_all().await?
        } else if scope.is_seller() {
            repo.list_for_seller(scope.user_id).await?
        } else {
            repo.list_for_user(scope.user_id).await?
        };
        Ok(orders)
    }

    /// Edit shipping address / customer notes, pending orders only.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotEditable` outside `pending`, `AccessDenied` for
    /// anyone but the buyer or an admin, `AddressNotFound`/`AccessDenied`
    /// for a bad replacement address.
    #[instrument(skip(self, scope, input), fields(order_id = %id))]
    pub async fn update(
        &self,
        scope: &AuthScope,
        id: OrderId,
        input: UpdateOrderInput,
    ) -> Result<Order, AppError> {
        let repo = OrderRepository::new(&self.pool);
        let order = repo.get(id).await?.ok_or(DomainError::OrderNotFound)?;
        if !scope.is_admin() && scope.user_id != order.user_id {
            return Err(DomainError::AccessDenied.into());
        }
        if order.status != OrderStatus::Pending {
            return Err(DomainError::OrderNotEditable(order.status).into());
        }

        if let Some(address_id) = input.shipping_address_id {
            let address = AddressRepository::new(&self.pool)
                .get(address_id)
                .await?
                .ok_or(DomainError::AddressNotFound(address_id))?;
            if address.user_id != order.user_id {
                return Err(DomainError::AccessDenied.into());
            }
        }

        repo.update_details(id, input.shipping_address_id, input.customer_notes.as_deref())
            .await?;
        repo.get(id).await?.ok_or(DomainError::OrderNotFound.into())
    }

    /// Apply a status/payment/shipping-metadata update.
    ///
    /// Entering `cancelled` from a not-yet-cancelled state restores every
    /// line's stock inside the same transaction that locks the order row.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatusTransition` for an illegal move,
    /// `CancellationReasonRequired` when cancelling without a reason, and
    /// `AccessDenied` when the caller may not transition this order.
    #[instrument(skip(self, scope, input), fields(order_id = %id))]
    pub async fn update_status(
        &self,
        scope: &AuthScope,
        id: OrderId,
        input: UpdateOrderStatusInput,
    ) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;

        let order = orders::get_for_update(&mut *tx, id)
            .await?
            .ok_or(DomainError::OrderNotFound)?;
        let sellers = line_sellers(&order);
        let cancelling = input.status == Some(OrderStatus::Cancelled);
        if !scope.can_transition_order(order.user_id, &sellers, cancelling) {
            return Err(DomainError::AccessDenied.into());
        }

        // A buyer passes the gate only to cancel; the staff-only fields of
        // the same input must not ride along on that cancellation.
        let staff = scope.is_admin() || (scope.is_seller() && sellers.contains(&scope.user_id));
        let (write, restore) = build_status_write(&order, &input, staff, Utc::now())?;
        if restore {
            restore_stock(&mut tx, &order).await?;
        }
        orders::apply_status_write(&mut *tx, id, &write).await?;

        tx.commit().await?;
        if restore {
            info!(order_number = %order.order_number, "order cancelled, stock restored");
        }

        OrderRepository::new(&self.pool)
            .get(id)
            .await?
            .ok_or(DomainError::OrderNotFound.into())
    }

    /// Delete an order, permitted only while `pending` or `cancelled`.
    ///
    /// A pending order's stock is restored first; a cancelled order's was
    /// already restored by the cancellation and is not restored twice.
    ///
    /// # Errors
    ///
    /// Returns `OrderCannotBeDeleted` outside the permitted statuses,
    /// `AccessDenied` for anyone but the buyer or an admin.
    #[instrument(skip(self, scope), fields(order_id = %id))]
    pub async fn delete(&self, scope: &AuthScope, id: OrderId) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let order = orders::get_for_update(&mut *tx, id)
            .await?
            .ok_or(DomainError::OrderNotFound)?;
        if !scope.is_admin() && scope.user_id != order.user_id {
            return Err(DomainError::AccessDenied.into());
        }
        if !matches!(order.status, OrderStatus::Pending | OrderStatus::Cancelled) {
            return Err(DomainError::OrderCannotBeDeleted(order.status).into());
        }

        if order.status != OrderStatus::Cancelled {
            restore_stock(&mut tx, &order).await?;
        }
        orders::delete_order(&mut tx, id).await?;

        tx.commit().await?;
        info!(order_number = %order.order_number, "order deleted");
        Ok(())
    }
}

/// Increment flat stock and (where applicable) variant quantities for
/// every line of an order.
///
/// A variant deleted since the order was placed only gets its flat
/// counter back; the ledger no longer has a row to credit.
async fn restore_stock(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    order: &Order,
) -> Result<(), AppError> {
    for item in &order.items {
        products::adjust_stock(&mut *tx, item.product_id, item.quantity).await?;
        if let Some(variant_id) = item.variant_id {
            let adjusted =
                inventory::adjust_variant_quantity(&mut *tx, variant_id, item.quantity).await?;
            if !adjusted {
                warn!(%variant_id, "variant gone, restored flat stock only");
            }
        }
    }
    Ok(())
}

/// Generate a number and verify it is free, a bounded number of times.
///
/// The unique constraint on `orders.order_number` remains the backstop if
/// a collision slips between check and insert.
async fn reserve_order_number(conn: &mut PgConnection) -> Result<String, AppError> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let candidate = generate_order_number();
        if !orders::order_number_exists(&mut *conn, &candidate).await? {
            return Ok(candidate);
        }
    }
    Err(AppError::Internal(
        "could not generate a unique order number".to_string(),
    ))
}

/// `ORD-<base36 millis>-<4 random alphanumerics>`.
fn generate_order_number() -> String {
    let millis = Utc::now().timestamp_millis().unsigned_abs();
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(4)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("ORD-{}-{suffix}", to_base36(millis))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// The order's owning seller, when every line belongs to the same one.
fn single_seller(mut sellers: impl Iterator<Item = UserId>) -> Option<UserId> {
    let first = sellers.next()?;
    sellers.all(|s| s == first).then_some(first)
}

fn line_sellers(order: &Order) -> Vec<UserId> {
    let mut sellers: Vec<UserId> = order.items.iter().map(|i| i.seller_id).collect();
    sellers.sort_unstable_by_key(|s| s.as_i32());
    sellers.dedup();
    sellers
}

/// Compute the new status-bearing column values for a transition.
///
/// Timestamps stamp exactly once: re-entering a state keeps the original
/// stamp. The boolean result says whether stock must be restored (first
/// entry into `cancelled`). Payment status, tracking number, and admin
/// notes are staff-only inputs and are ignored when `staff` is false.
fn build_status_write(
    order: &Order,
    input: &UpdateOrderStatusInput,
    staff: bool,
    now: DateTime<Utc>,
) -> Result<(OrderStatusWrite, bool), DomainError> {
    let mut write = OrderStatusWrite {
        status: order.status,
        payment_status: order.payment_status,
        paid_at: order.paid_at,
        confirmed_at: order.confirmed_at,
        shipped_at: order.shipped_at,
        delivered_at: order.delivered_at,
        cancelled_at: order.cancelled_at,
        cancellation_reason: order.cancellation_reason.clone(),
        tracking_number: order.tracking_number.clone(),
        admin_notes: order.admin_notes.clone(),
    };
    let mut restore = false;

    if staff {
        if let Some(tracking) = &input.tracking_number {
            write.tracking_number = Some(tracking.clone());
        }
        if let Some(notes) = &input.admin_notes {
            write.admin_notes = Some(notes.clone());
        }
    }

    if let Some(next) = input.status {
        if !order.status.can_transition_to(next) {
            return Err(DomainError::InvalidStatusTransition {
                from: order.status,
                to: next,
            });
        }
        match next {
            OrderStatus::Confirmed => {
                write.confirmed_at.get_or_insert(now);
            }
            OrderStatus::Shipped => {
                write.shipped_at.get_or_insert(now);
            }
            OrderStatus::Delivered => {
                write.delivered_at.get_or_insert(now);
            }
            OrderStatus::Cancelled => {
                let reason = input
                    .cancellation_reason
                    .clone()
                    .or_else(|| order.cancellation_reason.clone())
                    .ok_or(DomainError::CancellationReasonRequired)?;
                write.cancellation_reason = Some(reason);
                if order.status != OrderStatus::Cancelled {
                    write.cancelled_at.get_or_insert(now);
                    restore = true;
                }
            }
            OrderStatus::Pending | OrderStatus::Processing | OrderStatus::Refunded => {}
        }
        write.status = next;
    }

    if staff && let Some(payment) = input.payment_status {
        if payment == PaymentStatus::Paid && write.paid_at.is_none() {
            write.paid_at = Some(now);
        }
        write.payment_status = payment;
    }

    Ok((write, restore))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::{AddressId, PaymentMethod};

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(1),
            order_number: "ORD-TEST-0001".to_string(),
            user_id: UserId::new(1),
            seller_id: None,
            shipping_address_id: AddressId::new(1),
            items: vec![],
            subtotal: Decimal::new(10000, 2),
            discount_amount: Decimal::ZERO,
            coupon_id: None,
            coupon_code: None,
            shipping_cost: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::new(10000, 2),
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Pending,
            paid_at: None,
            status,
            confirmed_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            tracking_number: None,
            customer_notes: None,
            admin_notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn order_number_has_expected_shape() {
        let number = generate_order_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert!(!parts[1].is_empty());
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_000_000), "LFLS");
    }

    #[test]
    fn single_seller_detection() {
        let a = UserId::new(1);
        let b = UserId::new(2);
        assert_eq!(single_seller([a, a].into_iter()), Some(a));
        assert_eq!(single_seller([a, b].into_iter()), None);
        assert_eq!(single_seller(std::iter::empty()), None);
    }

    #[test]
    fn confirmation_stamps_once() {
        let now = Utc::now();
        let o = order(OrderStatus::Pending);
        let input = UpdateOrderStatusInput {
            status: Some(OrderStatus::Confirmed),
            ..UpdateOrderStatusInput::default()
        };
        let (write, restore) = build_status_write(&o, &input, true, now).expect("transition");
        assert_eq!(write.status, OrderStatus::Confirmed);
        assert_eq!(write.confirmed_at, Some(now));
        assert!(!restore);

        // Re-confirming keeps the original stamp.
        let mut confirmed = order(OrderStatus::Confirmed);
        let earlier = now - chrono::Duration::hours(1);
        confirmed.confirmed_at = Some(earlier);
        let (write, _) = build_status_write(&confirmed, &input, true, now).expect("idempotent");
        assert_eq!(write.confirmed_at, Some(earlier));
    }

    #[test]
    fn illegal_transition_rejected() {
        let o = order(OrderStatus::Pending);
        let input = UpdateOrderStatusInput {
            status: Some(OrderStatus::Delivered),
            ..UpdateOrderStatusInput::default()
        };
        assert_eq!(
            build_status_write(&o, &input, true, Utc::now()),
            Err(DomainError::InvalidStatusTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Delivered,
            })
        );
    }

    #[test]
    fn cancellation_requires_reason_and_restores_once() {
        let o = order(OrderStatus::Confirmed);
        let input = UpdateOrderStatusInput {
            status: Some(OrderStatus::Cancelled),
            ..UpdateOrderStatusInput::default()
        };
        assert_eq!(
            build_status_write(&o, &input, true, Utc::now()),
            Err(DomainError::CancellationReasonRequired)
        );

        let input = UpdateOrderStatusInput {
            status: Some(OrderStatus::Cancelled),
            cancellation_reason: Some("changed my mind".to_string()),
            ..UpdateOrderStatusInput::default()
        };
        let (write, restore) = build_status_write(&o, &input, true, Utc::now()).expect("cancel");
        assert!(restore);
        assert!(write.cancelled_at.is_some());

        // Already cancelled: no second restoration.
        let mut cancelled = order(OrderStatus::Cancelled);
        cancelled.cancellation_reason = Some("changed my mind".to_string());
        cancelled.cancelled_at = Some(Utc::now());
        let (_, restore) = build_status_write(&cancelled, &input, true, Utc::now()).expect("noop");
        assert!(!restore);
    }

    #[test]
    fn paid_stamps_paid_at_once() {
        let now = Utc::now();
        let o = order(OrderStatus::Pending);
        let input = UpdateOrderStatusInput {
            payment_status: Some(PaymentStatus::Paid),
            ..UpdateOrderStatusInput::default()
        };
        let (write, _) = build_status_write(&o, &input, true, now).expect("paid");
        assert_eq!(write.paid_at, Some(now));

        let mut paid = order(OrderStatus::Pending);
        let earlier = now - chrono::Duration::hours(2);
        paid.payment_status = PaymentStatus::Paid;
        paid.paid_at = Some(earlier);
        let (write, _) = build_status_write(&paid, &input, true, now).expect("idempotent");
        assert_eq!(write.paid_at, Some(earlier));
    }

    #[test]
    fn buyer_cancellation_ignores_staff_fields() {
        let o = order(OrderStatus::Pending);
        let input = UpdateOrderStatusInput {
            status: Some(OrderStatus::Cancelled),
            cancellation_reason: Some("changed my mind".to_string()),
            payment_status: Some(PaymentStatus::Paid),
            tracking_number: Some("TRK-123".to_string()),
            admin_notes: Some("comped shipping".to_string()),
        };
        let (write, restore) = build_status_write(&o, &input, false, Utc::now()).expect("cancel");
        assert!(restore);
        assert_eq!(write.status, OrderStatus::Cancelled);
        assert_eq!(write.payment_status, PaymentStatus::Pending);
        assert!(write.paid_at.is_none());
        assert_eq!(write.tracking_number, None);
        assert_eq!(write.admin_notes, None);

        // The same input from staff applies all of it.
        let (write, _) = build_status_write(&o, &input, true, Utc::now()).expect("staff cancel");
        assert_eq!(write.payment_status, PaymentStatus::Paid);
        assert_eq!(write.tracking_number.as_deref(), Some("TRK-123"));
        assert_eq!(write.admin_notes.as_deref(), Some("comped shipping"));
    }

    #[test]
    fn refund_allowed_from_shipped_without_restoration() {
        let o = order(OrderStatus::Shipped);
        let input = UpdateOrderStatusInput {
            status: Some(OrderStatus::Refunded),
            ..UpdateOrderStatusInput::default()
        };
        let (write, restore) = build_status_write(&o, &input, true, Utc::now()).expect("refund");
        assert_eq!(write.status, OrderStatus::Refunded);
        assert!(!restore);
    }
}
