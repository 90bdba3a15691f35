//! Database operations for the two-level inventory ledger.
//!
//! Variant color lists are stored in canonical (sorted, de-duplicated) form,
//! so the unique index on `(inventory_id, size, colors)` enforces the
//! no-duplicate-combination rule and set equality reduces to array equality.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use bazaar_core::{InventoryId, ProductId, VariantId};

use super::RepositoryError;
use crate::models::inventory::{Inventory, Variant, VariantInput, VariantOverrides};

/// Internal row type for ledger queries.
#[derive(Debug, sqlx::FromRow)]
struct InventoryRow {
    id: i32,
    product_id: i32,
    total_quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InventoryRow {
    fn into_inventory(self, variants: Vec<Variant>) -> Inventory {
        Inventory {
            id: InventoryId::new(self.id),
            product_id: ProductId::new(self.product_id),
            total_quantity: self.total_quantity,
            variants,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Internal row type for variant queries.
#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: i32,
    inventory_id: i32,
    size: String,
    colors: Vec<String>,
    quantity: i32,
    image_url: Option<String>,
    price_override: Option<Decimal>,
    weight_override: Option<Decimal>,
    sku_override: Option<String>,
    attributes: serde_json::Value,
}

impl TryFrom<VariantRow> for Variant {
    type Error = RepositoryError;

    fn try_from(row: VariantRow) -> Result<Self, Self::Error> {
        let attributes = match row.attributes {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(RepositoryError::DataCorruption(format!(
                    "variant {} attributes is not an object: {other}",
                    row.id
                )));
            }
        };
        Ok(Self {
            id: VariantId::new(row.id),
            inventory_id: InventoryId::new(row.inventory_id),
            size: row.size,
            colors: row.colors,
            quantity: row.quantity,
            image_url: row.image_url,
            overrides: VariantOverrides {
                price_override: row.price_override,
                weight_override: row.weight_override,
                sku_override: row.sku_override,
            },
            attributes,
        })
    }
}

const VARIANT_COLUMNS: &str = r"
    id, inventory_id, size, colors, quantity, image_url,
    price_override, weight_override, sku_override, attributes
";

/// Repository for inventory ledger database operations.
pub struct InventoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InventoryRepository<'a> {
    /// Create a new inventory repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a ledger with its variants by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: InventoryId) -> Result<Option<Inventory>, RepositoryError> {
        let row = sqlx::query_as::<_, InventoryRow>(
            "SELECT id, product_id, total_quantity, created_at, updated_at
             FROM inventories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => {
                let variants = self.variants_for(InventoryId::new(row.id)).await?;
                Ok(Some(row.into_inventory(variants)))
            }
            None => Ok(None),
        }
    }

    /// Get a ledger with its variants by product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<Inventory>, RepositoryError> {
        let row = sqlx::query_as::<_, InventoryRow>(
            "SELECT id, product_id, total_quantity, created_at, updated_at
             FROM inventories WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => {
                let variants = self.variants_for(InventoryId::new(row.id)).await?;
                Ok(Some(row.into_inventory(variants)))
            }
            None => Ok(None),
        }
    }

    async fn variants_for(&self, id: InventoryId) -> Result<Vec<Variant>, RepositoryError> {
        let rows = sqlx::query_as::<_, VariantRow>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM inventory_variants
             WHERE inventory_id = $1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Create a ledger with its variants.
    ///
    /// The caller has already validated the variant set (sizes, colors,
    /// duplicates, stock ceiling) and canonicalized color lists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product already has a
    /// ledger or two variants collide on the unique combination index.
    pub async fn create(
        &self,
        product_id: ProductId,
        variants: &[VariantInput],
    ) -> Result<Inventory, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let total: i64 = variants.iter().map(|v| i64::from(v.quantity)).sum();
        let row = sqlx::query_as::<_, InventoryRow>(
            r"
            INSERT INTO inventories (product_id, total_quantity)
            VALUES ($1, $2)
            RETURNING id, product_id, total_quantity, created_at, updated_at
            ",
        )
        .bind(product_id)
        .bind(i32::try_from(total).map_err(|_| {
            RepositoryError::DataCorruption("variant total overflows i32".to_string())
        })?)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if super::is_unique_violation(&e, "inventories_product_id_key") {
                return RepositoryError::Conflict(format!(
                    "inventory for product {product_id} already exists"
                ));
            }
            RepositoryError::Database(e)
        })?;

        let inventory_id = InventoryId::new(row.id);
        insert_variants(&mut tx, inventory_id, variants).await?;

        tx.commit().await?;
        self.get(inventory_id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Replace a ledger's variants wholesale and recompute `total_quantity`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ledger does not exist.
    pub async fn replace_variants(
        &self,
        id: InventoryId,
        variants: &[VariantInput],
    ) -> Result<Inventory, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM inventory_variants WHERE inventory_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_variants(&mut tx, id, variants).await?;
        recompute_total(&mut tx, id).await?;

        tx.commit().await?;
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Update a single variant by its stable ID and recompute the total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist.
    pub async fn update_variant(
        &self,
        id: InventoryId,
        variant_id: VariantId,
        input: &VariantInput,
    ) -> Result<Inventory, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r"
            UPDATE inventory_variants
            SET size = $3, colors = $4, quantity = $5, image_url = $6,
                price_override = $7, weight_override = $8, sku_override = $9,
                attributes = $10
            WHERE id = $2 AND inventory_id = $1
            ",
        )
        .bind(id)
        .bind(variant_id)
        .bind(&input.size)
        .bind(&input.colors)
        .bind(input.quantity)
        .bind(&input.image_url)
        .bind(input.overrides.price_override)
        .bind(input.overrides.weight_override)
        .bind(&input.overrides.sku_override)
        .bind(serde_json::Value::Object(input.attributes.clone()))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if super::is_unique_violation(&e, "idx_inventory_variants_combination") {
                return RepositoryError::Conflict("variant combination exists".to_string());
            }
            RepositoryError::Database(e)
        })?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        recompute_total(&mut tx, id).await?;
        tx.commit().await?;
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a ledger.
    ///
    /// # Returns
    ///
    /// `true` if the ledger was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: InventoryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM inventories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Find the variant matching a size/colors request, without locking.
    ///
    /// Used by the cart's advisory checks. `None` size matches any variant
    /// size; colors compare as canonical arrays.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_variant(
        &self,
        product_id: ProductId,
        size: Option<&str>,
        colors: &[String],
    ) -> Result<Option<Variant>, RepositoryError> {
        let row = sqlx::query_as::<_, VariantRow>(&format!(
            r"
            SELECT {VARIANT_COLUMNS} FROM inventory_variants v
            WHERE v.inventory_id = (SELECT id FROM inventories WHERE product_id = $1)
              AND ($2::text IS NULL OR v.size = $2)
              AND v.colors = $3
            ORDER BY v.id
            LIMIT 1
            "
        ))
        .bind(product_id)
        .bind(size)
        .bind(colors)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}

async fn insert_variants(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    inventory_id: InventoryId,
    variants: &[VariantInput],
) -> Result<(), RepositoryError> {
    for variant in variants {
        sqlx::query(
            r"
            INSERT INTO inventory_variants (
                inventory_id, size, colors, quantity, image_url,
                price_override, weight_override, sku_override, attributes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(inventory_id)
        .bind(&variant.size)
        .bind(&variant.colors)
        .bind(variant.quantity)
        .bind(&variant.image_url)
        .bind(variant.overrides.price_override)
        .bind(variant.overrides.weight_override)
        .bind(&variant.overrides.sku_override)
        .bind(serde_json::Value::Object(variant.attributes.clone()))
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if super::is_unique_violation(&e, "idx_inventory_variants_combination") {
                return RepositoryError::Conflict("variant combination exists".to_string());
            }
            RepositoryError::Database(e)
        })?;
    }
    Ok(())
}

async fn recompute_total(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: InventoryId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE inventories
        SET total_quantity = COALESCE((
                SELECT SUM(quantity)::int FROM inventory_variants
                WHERE inventory_id = $1
            ), 0),
            updated_at = now()
        WHERE id = $1
        ",
    )
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Find and lock the variant matching a size/colors request.
///
/// Same matching rule as [`InventoryRepository::find_variant`], but takes a
/// row lock for the enclosing order transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_variant_for_update(
    conn: &mut PgConnection,
    product_id: ProductId,
    size: Option<&str>,
    colors: &[String],
) -> Result<Option<Variant>, RepositoryError> {
    let row = sqlx::query_as::<_, VariantRow>(&format!(
        r"
        SELECT {VARIANT_COLUMNS} FROM inventory_variants v
        WHERE v.inventory_id = (SELECT id FROM inventories WHERE product_id = $1)
          AND ($2::text IS NULL OR v.size = $2)
          AND v.colors = $3
        ORDER BY v.id
        LIMIT 1
        FOR UPDATE
        "
    ))
    .bind(product_id)
    .bind(size)
    .bind(colors)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Adjust a variant's quantity and its ledger's cached total by `delta`.
///
/// # Returns
///
/// `true` if the variant exists and was adjusted; `false` if the variant is
/// gone (e.g. deleted after the order was placed), in which case only the
/// flat product counter can be restored.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn adjust_variant_quantity(
    conn: &mut PgConnection,
    variant_id: VariantId,
    delta: i32,
) -> Result<bool, RepositoryError> {
    let inventory_id: Option<i32> = sqlx::query_scalar(
        r"
        UPDATE inventory_variants
        SET quantity = quantity + $2
        WHERE id = $1
        RETURNING inventory_id
        ",
    )
    .bind(variant_id)
    .bind(delta)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(inventory_id) = inventory_id else {
        return Ok(false);
    };

    sqlx::query(
        r"
        UPDATE inventories
        SET total_quantity = total_quantity + $2, updated_at = now()
        WHERE id = $1
        ",
    )
    .bind(inventory_id)
    .bind(delta)
    .execute(&mut *conn)
    .await?;

    Ok(true)
}
