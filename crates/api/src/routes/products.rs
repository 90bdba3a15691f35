//! Read-only product lookup.
//!
//! The catalog is maintained elsewhere; this endpoint exists for clients
//! (and the integration tests) to read the records the core validates
//! against.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use bazaar_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{AppError, DomainError};
use crate::models::auth::AuthScope;
use crate::models::product::Product;
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/products/{id}", get(get_one))
}

async fn get_one(
    State(state): State<AppState>,
    _scope: AuthScope,
    Path(id): Path<ProductId>,
) -> Result<Json<ApiResponse<Product>>, AppError> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or(DomainError::ProductNotFound(id))?;
    Ok(Json(ApiResponse::success(product)))
}
