//! Database operations for product catalog records.
//!
//! The order engine takes row locks on products (`SELECT ... FOR UPDATE`)
//! for the duration of validate+decrement, so two concurrent orders for the
//! same product serialize instead of both passing the availability check.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use bazaar_core::{CategoryId, ProductId, UserId};

use super::RepositoryError;
use crate::models::product::Product;

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    seller_id: i32,
    category_id: Option<i32>,
    name_en: String,
    name_ar: Option<String>,
    sku: String,
    original_price: Decimal,
    sale_price: Option<Decimal>,
    sale_starts_at: Option<DateTime<Utc>>,
    sale_ends_at: Option<DateTime<Utc>>,
    stock_quantity: i32,
    sizes: Vec<String>,
    colors: Vec<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            seller_id: UserId::new(row.seller_id),
            category_id: row.category_id.map(CategoryId::new),
            name_en: row.name_en,
            name_ar: row.name_ar,
            sku: row.sku,
            original_price: row.original_price,
            sale_price: row.sale_price,
            sale_starts_at: row.sale_starts_at,
            sale_ends_at: row.sale_ends_at,
            stock_quantity: row.stock_quantity,
            sizes: row.sizes,
            colors: row.colors,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str = r"
    id, seller_id, category_id, name_en, name_ar, sku,
    original_price, sale_price, sale_starts_at, sale_ends_at,
    stock_quantity, sizes, colors, active, created_at, updated_at
";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

/// Load a product and lock its row until the enclosing transaction ends.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_for_update(
    conn: &mut PgConnection,
    id: ProductId,
) -> Result<Option<Product>, RepositoryError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Adjust a product's flat stock counter by `delta` (negative to reserve,
/// positive to restore).
///
/// The caller must hold the row lock and have verified availability; the
/// `stock_quantity >= 0` CHECK is the last line of defense.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product does not exist.
pub async fn adjust_stock(
    conn: &mut PgConnection,
    id: ProductId,
    delta: i32,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE products
        SET stock_quantity = stock_quantity + $2, updated_at = now()
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(delta)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
