//! Domain models for the API.

pub mod auth;
pub mod cart;
pub mod coupon;
pub mod inventory;
pub mod order;
pub mod product;
