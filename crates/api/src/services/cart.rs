//! Cart engine.
//!
//! Every mutation re-derives the cart's aggregate totals from scratch;
//! there is no incremental bookkeeping that could drift. Stock checks are
//! advisory only (nothing is reserved), so checkout can still fail even
//! when every add succeeded.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument};

use bazaar_core::CartItemId;

use crate::db::carts::NewCartItem;
use crate::db::{CartRepository, CouponRepository, InventoryRepository, ProductRepository};
use crate::error::{AppError, DomainError};
use crate::models::auth::AuthScope;
use crate::models::cart::{AddCartItemInput, Cart, CartPatchInput, UpdateCartItemInput};
use crate::models::inventory::{Variant, canonical_colors};
use crate::models::product::Product;
use crate::services::{coupons, pricing};

/// Cart engine service.
pub struct CartService {
    pool: PgPool,
}

impl CartService {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the caller's cart, creating an empty one lazily.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn get(&self, scope: &AuthScope) -> Result<Cart, AppError> {
        Ok(CartRepository::new(&self.pool)
            .get_or_create(scope.user_id)
            .await?)
    }

    /// Add an item, merging into an existing line on exact identity.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound`/`ProductNotActive`, `InvalidSize`/
    /// `InvalidColor`, `VariantNotFound`, or an insufficient-stock error
    /// if the requested quantity exceeds availability right now.
    #[instrument(skip(self, scope, input), fields(user_id = %scope.user_id, product_id = %input.product_id))]
    pub async fn add_item(
        &self,
        scope: &AuthScope,
        input: AddCartItemInput,
    ) -> Result<Cart, AppError> {
        let repo = CartRepository::new(&self.pool);
        let cart = repo.get_or_create(scope.user_id).await?;
        self.add_line(&cart, &input).await?;
        self.recompute_totals(scope, cart.id).await
    }

    /// Change a line's quantity, keeping its add-time price snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CartItemNotFound` if the line does not exist, or an
    /// insufficient-stock error for the new quantity.
    #[instrument(skip(self, scope, input), fields(user_id = %scope.user_id, item_id = %item_id))]
    pub async fn update_item(
        &self,
        scope: &AuthScope,
        item_id: CartItemId,
        input: UpdateCartItemInput,
    ) -> Result<Cart, AppError> {
        if input.quantity < 1 {
            return Err(DomainError::InvalidQuantity(input.quantity).into());
        }

        let repo = CartRepository::new(&self.pool);
        let cart = repo
            .get_by_user(scope.user_id)
            .await?
            .ok_or(DomainError::CartNotFound)?;
        let item = cart
            .items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or(DomainError::CartItemNotFound(item_id))?;

        let product = self.load_active_product(item.product_id).await?;
        let variant = match item.variant_id {
            Some(_) => {
                InventoryRepository::new(&self.pool)
                    .find_variant(item.product_id, item.size.as_deref(), &item.colors)
                    .await?
            }
            None => None,
        };
        check_availability(&product, variant.as_ref(), input.quantity)?;

        repo.update_item_quantity(
            cart.id,
            item_id,
            input.quantity,
            item.unit_price * Decimal::from(input.quantity),
        )
        .await?;
        self.recompute_totals(scope, cart.id).await
    }

    /// Remove one line.
    ///
    /// # Errors
    ///
    /// Returns `CartItemNotFound` if the line does not exist.
    #[instrument(skip(self, scope), fields(user_id = %scope.user_id, item_id = %item_id))]
    pub async fn remove_item(
        &self,
        scope: &AuthScope,
        item_id: CartItemId,
    ) -> Result<Cart, AppError> {
        let repo = CartRepository::new(&self.pool);
        let cart = repo
            .get_by_user(scope.user_id)
            .await?
            .ok_or(DomainError::CartNotFound)?;

        if !repo.delete_item(cart.id, item_id).await? {
            return Err(DomainError::CartItemNotFound(item_id).into());
        }
        self.recompute_totals(scope, cart.id).await
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `CartNotFound` if the caller has no cart.
    #[instrument(skip(self, scope), fields(user_id = %scope.user_id))]
    pub async fn clear(&self, scope: &AuthScope) -> Result<Cart, AppError> {
        let repo = CartRepository::new(&self.pool);
        let cart = repo
            .get_by_user(scope.user_id)
            .await?
            .ok_or(DomainError::CartNotFound)?;

        repo.clear_items(cart.id).await?;
        self.recompute_totals(scope, cart.id).await
    }

    /// Apply/remove a coupon and optionally replace the item list.
    ///
    /// Replacement items are validated exactly like adds; the coupon code
    /// is validated against the cart as it stands after the replacement.
    ///
    /// # Errors
    ///
    /// Any add-time validation error, plus the coupon errors of
    /// [`coupons::validate`].
    #[instrument(skip(self, scope, input), fields(user_id = %scope.user_id))]
    pub async fn patch(&self, scope: &AuthScope, input: CartPatchInput) -> Result<Cart, AppError> {
        let repo = CartRepository::new(&self.pool);
        let cart = repo.get_or_create(scope.user_id).await?;

        if let Some(items) = &input.items {
            repo.clear_items(cart.id).await?;
            let empty = repo
                .get_by_user(scope.user_id)
                .await?
                .ok_or(DomainError::CartNotFound)?;
            let mut current = empty;
            for item in items {
                self.add_line(&current, item).await?;
                current = repo
                    .get_by_user(scope.user_id)
                    .await?
                    .ok_or(DomainError::CartNotFound)?;
            }
        }

        if input.remove_coupon {
            repo.set_coupon(cart.id, None).await?;
        } else if let Some(code) = &input.coupon_code {
            let coupon = CouponRepository::new(&self.pool)
                .get_active_by_code(code)
                .await?
                .ok_or_else(|| DomainError::CouponNotFound(code.clone()))?;

            let lines = self.coupon_lines(cart.id).await?;
            coupons::validate(&coupon, scope.user_id, &lines, chrono::Utc::now())?;
            repo.set_coupon(cart.id, Some(coupon.id)).await?;
        }

        self.recompute_totals(scope, cart.id).await
    }

    /// Validate and append/merge one line into the given cart snapshot.
    async fn add_line(&self, cart: &Cart, input: &AddCartItemInput) -> Result<(), AppError> {
        if input.quantity < 1 {
            return Err(DomainError::InvalidQuantity(input.quantity).into());
        }

        let product = self.load_active_product(input.product_id).await?;
        if let Some(size) = &input.size
            && !product.offers_size(size)
        {
            return Err(DomainError::InvalidSize {
                product_id: product.id,
                size: size.clone(),
            }
            .into());
        }
        for color in &input.colors {
            if !product.offers_color(color) {
                return Err(DomainError::InvalidColor {
                    product_id: product.id,
                    color: color.clone(),
                }
                .into());
            }
        }

        let colors = canonical_colors(&input.colors);
        let variant = if input.size.is_some() || !colors.is_empty() {
            let variant = InventoryRepository::new(&self.pool)
                .find_variant(input.product_id, input.size.as_deref(), &colors)
                .await?
                .ok_or(DomainError::VariantNotFound {
                    product_id: product.id,
                })?;
            Some(variant)
        } else {
            None
        };

        let repo = CartRepository::new(&self.pool);
        let merge_target = cart.items.iter().find(|line| {
            line.merges_with(
                input.product_id,
                variant.as_ref().map(|v| v.id),
                input.size.as_deref(),
                &colors,
            )
        });

        if let Some(line) = merge_target {
            let quantity = line.quantity + input.quantity;
            check_availability(&product, variant.as_ref(), quantity)?;
            repo.update_item_quantity(
                cart.id,
                line.id,
                quantity,
                line.unit_price * Decimal::from(quantity),
            )
            .await?;
            debug!(item_id = %line.id, quantity, "merged into existing line");
        } else {
            check_availability(&product, variant.as_ref(), input.quantity)?;
            let unit_price =
                pricing::resolve_unit_price(&product, variant.as_ref(), chrono::Utc::now());
            repo.insert_item(
                cart.id,
                &NewCartItem {
                    product_id: input.product_id,
                    variant_id: variant.as_ref().map(|v| v.id),
                    quantity: input.quantity,
                    size: input.size.clone(),
                    colors,
                    unit_price,
                    subtotal: unit_price * Decimal::from(input.quantity),
                },
            )
            .await?;
        }
        Ok(())
    }

    async fn load_active_product(
        &self,
        product_id: bazaar_core::ProductId,
    ) -> Result<Product, AppError> {
        let product = ProductRepository::new(&self.pool)
            .get(product_id)
            .await?
            .ok_or(DomainError::ProductNotFound(product_id))?;
        if !product.active {
            return Err(DomainError::ProductNotActive(product_id).into());
        }
        Ok(product)
    }

    async fn coupon_lines(
        &self,
        cart_id: bazaar_core::CartId,
    ) -> Result<Vec<coupons::CouponLine>, AppError> {
        let items = CartRepository::new(&self.pool).items(cart_id).await?;
        let products = ProductRepository::new(&self.pool);
        let mut lines = Vec::with_capacity(items.len());
        for item in &items {
            let product = products
                .get(item.product_id)
                .await?
                .ok_or(DomainError::ProductNotFound(item.product_id))?;
            lines.push(coupons::CouponLine {
                product_id: item.product_id,
                category_id: product.category_id,
            });
        }
        Ok(lines)
    }

    /// Re-derive subtotal, discount, and total from the stored lines.
    ///
    /// A coupon that no longer validates (expired, items replaced out of
    /// scope) is silently dropped rather than failing the mutation that
    /// exposed it.
    async fn recompute_totals(
        &self,
        scope: &AuthScope,
        cart_id: bazaar_core::CartId,
    ) -> Result<Cart, AppError> {
        let repo = CartRepository::new(&self.pool);
        let cart = repo
            .get_by_user(scope.user_id)
            .await?
            .ok_or(DomainError::CartNotFound)?;

        let subtotal: Decimal = cart.items.iter().map(|i| i.subtotal).sum();

        let mut discount = Decimal::ZERO;
        if let Some(coupon_id) = cart.coupon_id {
            let coupon = CouponRepository::new(&self.pool).get(coupon_id).await?;
            let applied = match coupon {
                Some(coupon) if coupon.active => {
                    let lines = self.coupon_lines(cart_id).await?;
                    match coupons::validate(&coupon, scope.user_id, &lines, chrono::Utc::now())
                        .and_then(|()| coupons::compute_discount(&coupon, subtotal))
                    {
                        Ok(amount) => Some(amount),
                        Err(err) => {
                            debug!(reason = err.reason_code(), "dropping stale coupon");
                            None
                        }
                    }
                }
                _ => None,
            };
            match applied {
                Some(amount) => discount = amount,
                None => repo.set_coupon(cart_id, None).await?,
            }
        }

        let shipping = Decimal::ZERO;
        let tax = Decimal::ZERO;
        let total = subtotal - discount + shipping + tax;
        repo.update_totals(cart_id, subtotal, discount, shipping, tax, total)
            .await?;

        repo.get_by_user(scope.user_id)
            .await?
            .ok_or(DomainError::CartNotFound.into())
    }
}

/// Advisory availability check against the flat counter or the matched
/// variant's quantity.
fn check_availability(
    product: &Product,
    variant: Option<&Variant>,
    requested: i32,
) -> Result<(), DomainError> {
    match variant {
        Some(variant) => {
            if requested > variant.quantity {
                return Err(DomainError::InsufficientVariantStock {
                    variant_id: variant.id,
                    requested,
                    available: variant.quantity,
                });
            }
        }
        None => {
            if requested > product.stock_quantity {
                return Err(DomainError::InsufficientStock {
                    product_id: product.id,
                    requested,
                    available: product.stock_quantity,
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

    use bazaar_core::{InventoryId, ProductId, UserId, VariantId};
    use crate::models::inventory::VariantOverrides;

    fn product(stock: i32) -> Product {
        Product {
            id: ProductId::new(1),
            seller_id: UserId::new(1),
            category_id: None,
            name_en: "Cap".to_string(),
            name_ar: None,
            sku: "CAP-001".to_string(),
            original_price: Decimal::new(1500, 2),
            sale_price: None,
            sale_starts_at: None,
            sale_ends_at: None,
            stock_quantity: stock,
            sizes: vec![],
            colors: vec![],
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn variant(quantity: i32) -> Variant {
        Variant {
            id: VariantId::new(9),
            inventory_id: InventoryId::new(1),
            size: "M".to_string(),
            colors: vec!["Red".to_string()],
            quantity,
            image_url: None,
            overrides: VariantOverrides::default(),
            attributes: serde_json::Map::new(),
        }
    }

    #[test]
    fn flat_counter_check_when_no_variant() {
        let p = product(3);
        assert!(check_availability(&p, None, 3).is_ok());
        assert!(matches!(
            check_availability(&p, None, 4),
            Err(DomainError::InsufficientStock {
                requested: 4,
                available: 3,
                ..
            })
        ));
    }

    #[test]
    fn variant_quantity_check_when_matched() {
        // The flat counter is larger; the variant's own quantity governs.
        let p = product(100);
        let v = variant(2);
        assert!(check_availability(&p, Some(&v), 2).is_ok());
        assert!(matches!(
            check_availability(&p, Some(&v), 3),
            Err(DomainError::InsufficientVariantStock {
                requested: 3,
                available: 2,
                ..
            })
        ));
    }
}
