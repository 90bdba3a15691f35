//! Database operations for orders and their immutable line items.
//!
//! Order creation and status transitions run inside a caller-owned
//! transaction so stock effects and the order write commit atomically; the
//! free functions here take `&mut PgConnection` for that reason.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use bazaar_core::{
    AddressId, CouponId, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus,
    ProductId, UserId, VariantId,
};

use super::RepositoryError;
use crate::models::order::{Order, OrderItem};

/// Internal row type for order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: String,
    user_id: i32,
    seller_id: Option<i32>,
    shipping_address_id: i32,
    subtotal: Decimal,
    discount_amount: Decimal,
    coupon_id: Option<i32>,
    coupon_code: Option<String>,
    shipping_cost: Decimal,
    tax: Decimal,
    total: Decimal,
    payment_method: String,
    payment_status: String,
    paid_at: Option<DateTime<Utc>>,
    status: String,
    confirmed_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    tracking_number: Option<String>,
    customer_notes: Option<String>,
    admin_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        Ok(Order {
            id: OrderId::new(self.id),
            order_number: self.order_number,
            user_id: UserId::new(self.user_id),
            seller_id: self.seller_id.map(UserId::new),
            shipping_address_id: AddressId::new(self.shipping_address_id),
            items,
            subtotal: self.subtotal,
            discount_amount: self.discount_amount,
            coupon_id: self.coupon_id.map(CouponId::new),
            coupon_code: self.coupon_code,
            shipping_cost: self.shipping_cost,
            tax: self.tax,
            total: self.total,
            payment_method: self.payment_method.parse::<PaymentMethod>()?,
            payment_status: self.payment_status.parse::<PaymentStatus>()?,
            paid_at: self.paid_at,
            status: self.status.parse::<OrderStatus>()?,
            confirmed_at: self.confirmed_at,
            shipped_at: self.shipped_at,
            delivered_at: self.delivered_at,
            cancelled_at: self.cancelled_at,
            cancellation_reason: self.cancellation_reason,
            tracking_number: self.tracking_number,
            customer_notes: self.customer_notes,
            admin_notes: self.admin_notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Internal row type for order item queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: i32,
    product_id: i32,
    seller_id: i32,
    variant_id: Option<i32>,
    product_name_en: String,
    product_name_ar: Option<String>,
    sku: String,
    size: Option<String>,
    colors: Vec<String>,
    quantity: i32,
    unit_price: Decimal,
    discount: Decimal,
    subtotal: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            seller_id: UserId::new(row.seller_id),
            variant_id: row.variant_id.map(VariantId::new),
            product_name_en: row.product_name_en,
            product_name_ar: row.product_name_ar,
            sku: row.sku,
            size: row.size,
            colors: row.colors,
            quantity: row.quantity,
            unit_price: row.unit_price,
            discount: row.discount,
            subtotal: row.subtotal,
        }
    }
}

const ORDER_COLUMNS: &str = r"
    id, order_number, user_id, seller_id, shipping_address_id,
    subtotal, discount_amount, coupon_id, coupon_code,
    shipping_cost, tax, total,
    payment_method, payment_status, paid_at,
    status, confirmed_at, shipped_at, delivered_at, cancelled_at,
    cancellation_reason, tracking_number, customer_notes, admin_notes,
    created_at, updated_at
";

const ORDER_ITEM_COLUMNS: &str = r"
    id, order_id, product_id, seller_id, variant_id,
    product_name_en, product_name_ar, sku, size, colors,
    quantity, unit_price, discount, subtotal
";

/// Fields for inserting a new order header.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: UserId,
    pub seller_id: Option<UserId>,
    pub shipping_address_id: AddressId,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub coupon_id: Option<CouponId>,
    pub coupon_code: Option<String>,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub customer_notes: Option<String>,
}

/// Fields for one snapshot line.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub seller_id: UserId,
    pub variant_id: Option<VariantId>,
    pub product_name_en: String,
    pub product_name_ar: Option<String>,
    pub sku: String,
    pub size: Option<String>,
    pub colors: Vec<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub subtotal: Decimal,
}

/// The full status-bearing column set written on a transition.
///
/// The caller computes the new values (stamping timestamps only on first
/// entry into a state) and this write replaces all of them at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStatusWrite {
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub tracking_number: Option<String>,
    pub admin_notes: Option<String>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order with its line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails, or
    /// `RepositoryError::DataCorruption` if a stored status is invalid.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(
            row.into_order(items.into_iter().map(Into::into).collect())?,
        ))
    }

    /// List a customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// List every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// List orders containing at least one line sold by `seller_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders o
            WHERE EXISTS (
                SELECT 1 FROM order_items i
                WHERE i.order_id = o.id AND i.seller_id = $1
            )
            ORDER BY created_at DESC
            "
        ))
        .bind(seller_id)
        .fetch_all(self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// Update the fields a customer may edit while the order is pending.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_details(
        &self,
        id: OrderId,
        shipping_address_id: Option<AddressId>,
        customer_notes: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET shipping_address_id = COALESCE($2, shipping_address_id),
                customer_notes = COALESCE($3, customer_notes),
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(shipping_address_id)
        .bind(customer_notes)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();

        let item_rows = sqlx::query_as::<_, OrderItemRow>(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items
             WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<i32, Vec<OrderItem>> = HashMap::new();
        for item in item_rows {
            by_order.entry(item.order_id).or_default().push(item.into());
        }

        rows.into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }
}

/// Whether an order number is already taken.
///
/// Checked before insert so a collision does not abort the enclosing
/// transaction; the unique constraint remains the backstop.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn order_number_exists(
    conn: &mut PgConnection,
    order_number: &str,
) -> Result<bool, RepositoryError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE order_number = $1)")
            .bind(order_number)
            .fetch_one(&mut *conn)
            .await?;
    Ok(exists)
}

/// Insert an order header inside the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order number already exists
/// (the caller regenerates and retries), or `RepositoryError::Database` for
/// any other failure.
pub async fn insert_order(conn: &mut PgConnection, order: &NewOrder) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        r"
        INSERT INTO orders (
            order_number, user_id, seller_id, shipping_address_id,
            subtotal, discount_amount, coupon_id, coupon_code,
            shipping_cost, tax, total, payment_method, customer_notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(&order.order_number)
    .bind(order.user_id)
    .bind(order.seller_id)
    .bind(order.shipping_address_id)
    .bind(order.subtotal)
    .bind(order.discount_amount)
    .bind(order.coupon_id)
    .bind(order.coupon_code.as_deref())
    .bind(order.shipping_cost)
    .bind(order.tax)
    .bind(order.total)
    .bind(order.payment_method.as_str())
    .bind(order.customer_notes.as_deref())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if super::is_unique_violation(&e, "orders_order_number_key") {
            return RepositoryError::Conflict("order number exists".to_string());
        }
        RepositoryError::Database(e)
    })?;

    row.into_order(Vec::new())
}

/// Insert the snapshot lines inside the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
pub async fn insert_items(
    conn: &mut PgConnection,
    order_id: OrderId,
    items: &[NewOrderItem],
) -> Result<Vec<OrderItem>, RepositoryError> {
    let mut inserted = Vec::with_capacity(items.len());
    for item in items {
        let row = sqlx::query_as::<_, OrderItemRow>(&format!(
            r"
            INSERT INTO order_items (
                order_id, product_id, seller_id, variant_id,
                product_name_en, product_name_ar, sku, size, colors,
                quantity, unit_price, discount, subtotal
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {ORDER_ITEM_COLUMNS}
            "
        ))
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.seller_id)
        .bind(item.variant_id)
        .bind(&item.product_name_en)
        .bind(item.product_name_ar.as_deref())
        .bind(&item.sku)
        .bind(item.size.as_deref())
        .bind(&item.colors)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.discount)
        .bind(item.subtotal)
        .fetch_one(&mut *conn)
        .await?;
        inserted.push(row.into());
    }
    Ok(inserted)
}

/// Get and lock an order header with its items for a status transition.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails, or
/// `RepositoryError::DataCorruption` if a stored status is invalid.
pub async fn get_for_update(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, OrderItemRow>(&format!(
        "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(
        row.into_order(items.into_iter().map(Into::into).collect())?,
    ))
}

/// Write the status-bearing columns inside the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order does not exist.
pub async fn apply_status_write(
    conn: &mut PgConnection,
    id: OrderId,
    write: &OrderStatusWrite,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE orders
        SET status = $2, payment_status = $3, paid_at = $4,
            confirmed_at = $5, shipped_at = $6, delivered_at = $7,
            cancelled_at = $8, cancellation_reason = $9,
            tracking_number = $10, admin_notes = $11,
            updated_at = now()
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(write.status.as_str())
    .bind(write.payment_status.as_str())
    .bind(write.paid_at)
    .bind(write.confirmed_at)
    .bind(write.shipped_at)
    .bind(write.delivered_at)
    .bind(write.cancelled_at)
    .bind(write.cancellation_reason.as_deref())
    .bind(write.tracking_number.as_deref())
    .bind(write.admin_notes.as_deref())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Delete an order (line items cascade) inside the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order does not exist.
pub async fn delete_order(conn: &mut PgConnection, id: OrderId) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
