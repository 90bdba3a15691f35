//! HTTP route handlers.
//!
//! # Route Structure
//!
//! All core routes live under `/api/v1` and require a bearer token.
//!
//! ```text
//! # Orders
//! POST   /api/v1/orders                  - Place an order
//! GET    /api/v1/orders                  - List visible orders
//! GET    /api/v1/orders/{id}             - Get one order
//! PATCH  /api/v1/orders/{id}             - Edit address/notes (pending only)
//! PATCH  /api/v1/orders/{id}/status      - Status/payment/shipping update
//! DELETE /api/v1/orders/{id}             - Delete (pending/cancelled only)
//!
//! # Cart
//! GET    /api/v1/cart                    - Get (or lazily create) the cart
//! POST   /api/v1/cart/items              - Add an item
//! PATCH  /api/v1/cart/items/{item_id}    - Change a line's quantity
//! DELETE /api/v1/cart/items/{item_id}    - Remove a line
//! DELETE /api/v1/cart/clear              - Remove every line
//! PATCH  /api/v1/cart                    - Coupon apply/remove, item replace
//!
//! # Inventory
//! POST   /api/v1/inventory                            - Create a ledger
//! GET    /api/v1/inventory/{id}                       - Get a ledger
//! PATCH  /api/v1/inventory/{id}                       - Replace variants
//! DELETE /api/v1/inventory/{id}                       - Delete a ledger
//! PATCH  /api/v1/inventory/{id}/variants/{variant_id} - Update one variant
//! POST   /api/v1/inventory/bulk-delete                - Partial-success batch delete
//!
//! # Catalog (read-only collaborator)
//! GET    /api/v1/products/{id}           - Get a product
//! ```

pub mod cart;
pub mod inventory;
pub mod orders;
pub mod products;

use axum::Router;

use crate::state::AppState;

/// Build the full application router.
pub fn routes() -> Router<AppState> {
    Router::new().nest(
        "/api/v1",
        Router::new()
            .merge(orders::routes())
            .merge(cart::routes())
            .merge(inventory::routes())
            .merge(products::routes()),
    )
}
