//! Database operations for carts and cart items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::{CartId, CartItemId, CouponId, ProductId, UserId, VariantId};

use super::RepositoryError;
use crate::models::cart::{Cart, CartItem};

/// Internal row type for cart queries.
#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i32,
    user_id: i32,
    coupon_id: Option<i32>,
    subtotal: Decimal,
    discount_amount: Decimal,
    shipping_cost: Decimal,
    tax: Decimal,
    total: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CartRow {
    fn into_cart(self, items: Vec<CartItem>) -> Cart {
        Cart {
            id: CartId::new(self.id),
            user_id: UserId::new(self.user_id),
            coupon_id: self.coupon_id.map(CouponId::new),
            items,
            subtotal: self.subtotal,
            discount_amount: self.discount_amount,
            shipping_cost: self.shipping_cost,
            tax: self.tax,
            total: self.total,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Internal row type for cart item queries.
#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: i32,
    cart_id: i32,
    product_id: i32,
    variant_id: Option<i32>,
    quantity: i32,
    size: Option<String>,
    colors: Vec<String>,
    unit_price: Decimal,
    subtotal: Decimal,
    position: i32,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: CartItemId::new(row.id),
            cart_id: CartId::new(row.cart_id),
            product_id: ProductId::new(row.product_id),
            variant_id: row.variant_id.map(VariantId::new),
            quantity: row.quantity,
            size: row.size,
            colors: row.colors,
            unit_price: row.unit_price,
            subtotal: row.subtotal,
            position: row.position,
        }
    }
}

const CART_COLUMNS: &str = r"
    id, user_id, coupon_id, subtotal, discount_amount,
    shipping_cost, tax, total, created_at, updated_at
";

const CART_ITEM_COLUMNS: &str = r"
    id, cart_id, product_id, variant_id, quantity, size, colors,
    unit_price, subtotal, position
";

/// Fields for inserting a new cart line (snapshot already priced).
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i32,
    pub size: Option<String>,
    pub colors: Vec<String>,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user's cart with items, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.items(CartId::new(row.id)).await?;
                Ok(Some(row.into_cart(items)))
            }
            None => Ok(None),
        }
    }

    /// Get a user's cart, creating an empty one lazily on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        if let Some(cart) = self.get_by_user(user_id).await? {
            return Ok(cart);
        }

        let row = sqlx::query_as::<_, CartRow>(&format!(
            r"
            INSERT INTO carts (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = now()
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        let items = self.items(CartId::new(row.id)).await?;
        Ok(row.into_cart(items))
    }

    /// The items of a cart, in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items
             WHERE cart_id = $1 ORDER BY position, id"
        ))
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Append a new line at the end of the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_item(
        &self,
        cart_id: CartId,
        item: &NewCartItem,
    ) -> Result<CartItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            r"
            INSERT INTO cart_items (
                cart_id, product_id, variant_id, quantity, size, colors,
                unit_price, subtotal, position
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                    (SELECT COALESCE(MAX(position), -1) + 1 FROM cart_items
                     WHERE cart_id = $1))
            RETURNING {CART_ITEM_COLUMNS}
            "
        ))
        .bind(cart_id)
        .bind(item.product_id)
        .bind(item.variant_id)
        .bind(item.quantity)
        .bind(&item.size)
        .bind(&item.colors)
        .bind(item.unit_price)
        .bind(item.subtotal)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Overwrite a line's quantity and subtotal (unit price stays frozen).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist.
    pub async fn update_item_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: i32,
        subtotal: Decimal,
    ) -> Result<CartItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            r"
            UPDATE cart_items
            SET quantity = $3, subtotal = $4
            WHERE id = $2 AND cart_id = $1
            RETURNING {CART_ITEM_COLUMNS}
            "
        ))
        .bind(cart_id)
        .bind(item_id)
        .bind(quantity)
        .bind(subtotal)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Remove a line.
    ///
    /// # Returns
    ///
    /// `true` if the line existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $2 AND cart_id = $1")
            .bind(cart_id)
            .bind(item_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_items(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Set or clear the applied coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_coupon(
        &self,
        cart_id: CartId,
        coupon_id: Option<CouponId>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE carts SET coupon_id = $2, updated_at = now() WHERE id = $1")
            .bind(cart_id)
            .bind(coupon_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Write the re-derived aggregate totals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_totals(
        &self,
        cart_id: CartId,
        subtotal: Decimal,
        discount_amount: Decimal,
        shipping_cost: Decimal,
        tax: Decimal,
        total: Decimal,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE carts
            SET subtotal = $2, discount_amount = $3, shipping_cost = $4,
                tax = $5, total = $6, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(cart_id)
        .bind(subtotal)
        .bind(discount_amount)
        .bind(shipping_cost)
        .bind(tax)
        .bind(total)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
