//! Cart endpoints.

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use bazaar_core::CartItemId;

use crate::error::AppError;
use crate::models::auth::AuthScope;
use crate::models::cart::{AddCartItemInput, Cart, CartPatchInput, UpdateCartItemInput};
use crate::response::ApiResponse;
use crate::services::CartService;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart).patch(patch_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/{item_id}", delete(remove_item).patch(update_item))
        .route("/cart/clear", delete(clear))
}

async fn get_cart(
    State(state): State<AppState>,
    scope: AuthScope,
) -> Result<Json<ApiResponse<Cart>>, AppError> {
    let cart = CartService::new(state.pool().clone()).get(&scope).await?;
    Ok(Json(ApiResponse::success(cart)))
}

async fn add_item(
    State(state): State<AppState>,
    scope: AuthScope,
    Json(input): Json<AddCartItemInput>,
) -> Result<Json<ApiResponse<Cart>>, AppError> {
    let cart = CartService::new(state.pool().clone())
        .add_item(&scope, input)
        .await?;
    Ok(Json(ApiResponse::success(cart)))
}

async fn update_item(
    State(state): State<AppState>,
    scope: AuthScope,
    Path(item_id): Path<CartItemId>,
    Json(input): Json<UpdateCartItemInput>,
) -> Result<Json<ApiResponse<Cart>>, AppError> {
    let cart = CartService::new(state.pool().clone())
        .update_item(&scope, item_id, input)
        .await?;
    Ok(Json(ApiResponse::success(cart)))
}

async fn remove_item(
    State(state): State<AppState>,
    scope: AuthScope,
    Path(item_id): Path<CartItemId>,
) -> Result<Json<ApiResponse<Cart>>, AppError> {
    let cart = CartService::new(state.pool().clone())
        .remove_item(&scope, item_id)
        .await?;
    Ok(Json(ApiResponse::success(cart)))
}

async fn clear(
    State(state): State<AppState>,
    scope: AuthScope,
) -> Result<Json<ApiResponse<Cart>>, AppError> {
    let cart = CartService::new(state.pool().clone()).clear(&scope).await?;
    Ok(Json(ApiResponse::success_with_message(cart, "cart cleared")))
}

async fn patch_cart(
    State(state): State<AppState>,
    scope: AuthScope,
    Json(input): Json<CartPatchInput>,
) -> Result<Json<ApiResponse<Cart>>, AppError> {
    let cart = CartService::new(state.pool().clone())
        .patch(&scope, input)
        .await?;
    Ok(Json(ApiResponse::success(cart)))
}
