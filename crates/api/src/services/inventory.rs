//! Inventory ledger service.
//!
//! Validates proposed variant sets against the owning product (legal
//! sizes/colors, no duplicate combinations, stock ceiling) before any
//! write, and canonicalizes color lists so set equality holds at the
//! database level.

use std::collections::HashSet;

use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, instrument};

use bazaar_core::{InventoryId, ProductId, VariantId};

use crate::db::{InventoryRepository, ProductRepository, RepositoryError};
use crate::error::{AppError, DomainError};
use crate::models::auth::AuthScope;
use crate::models::inventory::{Inventory, VariantInput, canonical_colors};
use crate::models::product::Product;

/// Partial-success report for bulk ledger deletion.
#[derive(Debug, Serialize)]
pub struct BulkDeleteReport {
    /// How many ledgers were removed.
    pub deleted_count: usize,
    /// IDs that could not be removed (missing or not permitted).
    pub failed_ids: Vec<InventoryId>,
}

/// Inventory ledger service.
pub struct InventoryService {
    pool: PgPool,
}

impl InventoryService {
    /// Create a new inventory service.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a ledger by ID.
    ///
    /// # Errors
    ///
    /// Returns `InventoryNotFound` if it does not exist, or `AccessDenied`
    /// for a seller reading another seller's ledger.
    pub async fn get(&self, scope: &AuthScope, id: InventoryId) -> Result<Inventory, AppError> {
        let inventory = InventoryRepository::new(&self.pool)
            .get(id)
            .await?
            .ok_or(DomainError::InventoryNotFound)?;
        self.authorize(scope, inventory.product_id).await?;
        Ok(inventory)
    }

    /// Get the ledger for a product.
    ///
    /// # Errors
    ///
    /// Returns `InventoryNotFound` if the product has no ledger.
    pub async fn get_by_product(
        &self,
        scope: &AuthScope,
        product_id: ProductId,
    ) -> Result<Inventory, AppError> {
        self.authorize(scope, product_id).await?;
        InventoryRepository::new(&self.pool)
            .get_by_product(product_id)
            .await?
            .ok_or(DomainError::InventoryNotFound.into())
    }

    /// Create a ledger for a product.
    ///
    /// # Errors
    ///
    /// Returns `InventoryAlreadyExists` if the product already has one,
    /// plus the validation errors of [`validate_variants`].
    #[instrument(skip(self, scope, variants), fields(product_id = %product_id))]
    pub async fn create(
        &self,
        scope: &AuthScope,
        product_id: ProductId,
        mut variants: Vec<VariantInput>,
    ) -> Result<Inventory, AppError> {
        let product = self.authorize(scope, product_id).await?;
        validate_variants(&product, &mut variants)?;

        let inventory = InventoryRepository::new(&self.pool)
            .create(product_id, &variants)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    AppError::Domain(DomainError::InventoryAlreadyExists(product_id))
                }
                other => other.into(),
            })?;

        info!(inventory_id = %inventory.id, total = inventory.total_quantity, "inventory created");
        Ok(inventory)
    }

    /// Replace a ledger's variants wholesale.
    ///
    /// # Errors
    ///
    /// Returns `InventoryNotFound` if the ledger does not exist, plus the
    /// validation errors of [`validate_variants`].
    #[instrument(skip(self, scope, variants), fields(inventory_id = %id))]
    pub async fn update(
        &self,
        scope: &AuthScope,
        id: InventoryId,
        mut variants: Vec<VariantInput>,
    ) -> Result<Inventory, AppError> {
        let repo = InventoryRepository::new(&self.pool);
        let existing = repo.get(id).await?.ok_or(DomainError::InventoryNotFound)?;
        let product = self.authorize(scope, existing.product_id).await?;
        validate_variants(&product, &mut variants)?;

        let inventory = repo.replace_variants(id, &variants).await?;
        info!(total = inventory.total_quantity, "inventory replaced");
        Ok(inventory)
    }

    /// Update a single variant by its stable ID.
    ///
    /// The updated variant is validated against the product together with
    /// the ledger's other, untouched variants.
    ///
    /// # Errors
    ///
    /// Returns `InventoryNotFound` if the ledger or variant does not
    /// exist, `DuplicateVariantCombination` if the new size/colors collide
    /// with another variant, plus the other validation errors.
    #[instrument(skip(self, scope, input), fields(inventory_id = %id, variant_id = %variant_id))]
    pub async fn update_variant(
        &self,
        scope: &AuthScope,
        id: InventoryId,
        variant_id: VariantId,
        mut input: VariantInput,
    ) -> Result<Inventory, AppError> {
        let repo = InventoryRepository::new(&self.pool);
        let existing = repo.get(id).await?.ok_or(DomainError::InventoryNotFound)?;
        let product = self.authorize(scope, existing.product_id).await?;

        if input.quantity < 0 {
            return Err(DomainError::InvalidQuantity(input.quantity).into());
        }
        input.colors = canonical_colors(&input.colors);
        validate_sizes_and_colors(&product, std::slice::from_ref(&input))?;

        // Check the combination and the stock ceiling against the other
        // variants as they will be after the update.
        let mut seen = HashSet::new();
        let mut total = i64::from(input.quantity);
        seen.insert((input.size.clone(), input.colors.clone()));
        for variant in existing.variants.iter().filter(|v| v.id != variant_id) {
            total += i64::from(variant.quantity);
            if !seen.insert((variant.size.clone(), variant.colors.clone())) {
                return Err(DomainError::DuplicateVariantCombination {
                    size: input.size,
                    colors: input.colors,
                }
                .into());
            }
        }
        if total > i64::from(product.stock_quantity) {
            return Err(DomainError::ExceedsProductStock {
                product_id: product.id,
                variant_total: total,
                stock_quantity: product.stock_quantity,
            }
            .into());
        }

        let inventory = repo
            .update_variant(id, variant_id, &input)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AppError::Domain(DomainError::InventoryNotFound),
                RepositoryError::Conflict(_) => {
                    AppError::Domain(DomainError::DuplicateVariantCombination {
                        size: input.size.clone(),
                        colors: input.colors.clone(),
                    })
                }
                other => other.into(),
            })?;
        Ok(inventory)
    }

    /// Delete a ledger.
    ///
    /// # Errors
    ///
    /// Returns `InventoryNotFound` if it does not exist.
    #[instrument(skip(self, scope), fields(inventory_id = %id))]
    pub async fn delete(&self, scope: &AuthScope, id: InventoryId) -> Result<(), AppError> {
        let repo = InventoryRepository::new(&self.pool);
        let existing = repo.get(id).await?.ok_or(DomainError::InventoryNotFound)?;
        self.authorize(scope, existing.product_id).await?;

        if !repo.delete(id).await? {
            return Err(DomainError::InventoryNotFound.into());
        }
        info!("inventory deleted");
        Ok(())
    }

    /// Delete many ledgers, reporting partial success instead of aborting.
    ///
    /// Each ID is processed independently; failures (missing ledger,
    /// access denied) are collected into `failed_ids`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` only for infrastructure failures; a
    /// per-ID domain failure never aborts the batch.
    #[instrument(skip(self, scope, ids), fields(count = ids.len()))]
    pub async fn bulk_delete(
        &self,
        scope: &AuthScope,
        ids: &[InventoryId],
    ) -> Result<BulkDeleteReport, AppError> {
        let mut deleted_count = 0;
        let mut failed_ids = Vec::new();
        for &id in ids {
            match self.delete(scope, id).await {
                Ok(()) => deleted_count += 1,
                Err(AppError::Domain(_)) => failed_ids.push(id),
                Err(other) => return Err(other),
            }
        }
        info!(deleted_count, failed = failed_ids.len(), "bulk delete finished");
        Ok(BulkDeleteReport {
            deleted_count,
            failed_ids,
        })
    }

    /// Load the product and check the caller may manage its inventory.
    ///
    /// Admins manage everything; a seller only their own products.
    async fn authorize(
        &self,
        scope: &AuthScope,
        product_id: ProductId,
    ) -> Result<Product, AppError> {
        let product = ProductRepository::new(&self.pool)
            .get(product_id)
            .await?
            .ok_or(DomainError::ProductNotFound(product_id))?;
        if !scope.is_admin() && product.seller_id != scope.user_id {
            return Err(DomainError::AccessDenied.into());
        }
        Ok(product)
    }
}

/// Validate a full proposed variant set against its product.
///
/// Canonicalizes each variant's color list in place, then checks legal
/// sizes/colors, duplicate `(size, colors)` combinations, negative
/// quantities, and the product stock ceiling.
///
/// # Errors
///
/// Returns the first failing rule as a `DomainError`.
pub fn validate_variants(
    product: &Product,
    variants: &mut [VariantInput],
) -> Result<(), DomainError> {
    for variant in variants.iter_mut() {
        variant.colors = canonical_colors(&variant.colors);
    }
    validate_sizes_and_colors(product, variants)?;

    let mut seen = HashSet::new();
    let mut total: i64 = 0;
    for variant in variants.iter() {
        if variant.quantity < 0 {
            return Err(DomainError::InvalidQuantity(variant.quantity));
        }
        total += i64::from(variant.quantity);
        if !seen.insert((variant.size.clone(), variant.colors.clone())) {
            return Err(DomainError::DuplicateVariantCombination {
                size: variant.size.clone(),
                colors: variant.colors.clone(),
            });
        }
    }

    if total > i64::from(product.stock_quantity) {
        return Err(DomainError::ExceedsProductStock {
            product_id: product.id,
            variant_total: total,
            stock_quantity: product.stock_quantity,
        });
    }
    Ok(())
}

fn validate_sizes_and_colors(
    product: &Product,
    variants: &[VariantInput],
) -> Result<(), DomainError> {
    for variant in variants {
        if !product.offers_size(&variant.size) {
            return Err(DomainError::InvalidSize {
                product_id: product.id,
                size: variant.size.clone(),
            });
        }
        for color in &variant.colors {
            if !product.offers_color(color) {
                return Err(DomainError::InvalidColor {
                    product_id: product.id,
                    color: color.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use bazaar_core::UserId;
    use crate::models::inventory::VariantOverrides;

    fn product(stock: i32) -> Product {
        Product {
            id: ProductId::new(1),
            seller_id: UserId::new(1),
            category_id: None,
            name_en: "Tee".to_string(),
            name_ar: None,
            sku: "TEE-001".to_string(),
            original_price: Decimal::new(2500, 2),
            sale_price: None,
            sale_starts_at: None,
            sale_ends_at: None,
            stock_quantity: stock,
            sizes: vec!["S".to_string(), "M".to_string()],
            colors: vec!["Red".to_string(), "Blue".to_string()],
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn input(size: &str, colors: &[&str], quantity: i32) -> VariantInput {
        VariantInput {
            size: size.to_string(),
            colors: colors.iter().map(ToString::to_string).collect(),
            quantity,
            image_url: None,
            overrides: VariantOverrides::default(),
            attributes: serde_json::Map::new(),
        }
    }

    #[test]
    fn rejects_undeclared_size_and_color() {
        let p = product(10);
        let mut variants = vec![input("XL", &["Red"], 1)];
        assert!(matches!(
            validate_variants(&p, &mut variants),
            Err(DomainError::InvalidSize { .. })
        ));

        let mut variants = vec![input("M", &["Green"], 1)];
        assert!(matches!(
            validate_variants(&p, &mut variants),
            Err(DomainError::InvalidColor { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_combination_regardless_of_color_order() {
        let p = product(10);
        let mut variants = vec![
            input("M", &["Red", "Blue"], 2),
            input("M", &["Blue", "Red"], 3),
        ];
        assert!(matches!(
            validate_variants(&p, &mut variants),
            Err(DomainError::DuplicateVariantCombination { .. })
        ));
    }

    #[test]
    fn rejects_total_above_product_stock() {
        let p = product(5);
        let mut variants = vec![input("S", &["Red"], 3), input("M", &["Red"], 3)];
        assert!(matches!(
            validate_variants(&p, &mut variants),
            Err(DomainError::ExceedsProductStock { .. })
        ));
    }

    #[test]
    fn accepts_valid_set_and_canonicalizes() {
        let p = product(10);
        let mut variants = vec![input("S", &["Red", "Blue", "Red"], 4), input("M", &[], 2)];
        validate_variants(&p, &mut variants).expect("valid");
        assert_eq!(variants[0].colors, vec!["Blue".to_string(), "Red".to_string()]);
    }

    #[test]
    fn rejects_negative_quantity() {
        let p = product(10);
        let mut variants = vec![input("S", &["Red"], -1)];
        assert!(matches!(
            validate_variants(&p, &mut variants),
            Err(DomainError::InvalidQuantity(-1))
        ));
    }
}
