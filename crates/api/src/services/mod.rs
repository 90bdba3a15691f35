//! Business logic on top of the repositories.
//!
//! Services take an [`AuthScope`](crate::models::auth::AuthScope) where
//! access rules apply; repositories never see roles.

pub mod cart;
pub mod coupons;
pub mod inventory;
pub mod orders;
pub mod pricing;

pub use cart::CartService;
pub use inventory::InventoryService;
pub use orders::OrderService;
