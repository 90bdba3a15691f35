//! Order endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};

use bazaar_core::OrderId;

use crate::error::AppError;
use crate::models::auth::AuthScope;
use crate::models::order::{CreateOrderInput, Order, UpdateOrderInput, UpdateOrderStatusInput};
use crate::response::ApiResponse;
use crate::services::OrderService;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list).post(create))
        .route("/orders/{id}", get(get_one).patch(update).delete(delete))
        .route("/orders/{id}/status", patch(update_status))
}

async fn create(
    State(state): State<AppState>,
    scope: AuthScope,
    Json(input): Json<CreateOrderInput>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>), AppError> {
    let order = OrderService::new(state.pool().clone())
        .create(&scope, input)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(order, "order placed")),
    ))
}

async fn list(
    State(state): State<AppState>,
    scope: AuthScope,
) -> Result<Json<ApiResponse<Vec<Order>>>, AppError> {
    let orders = OrderService::new(state.pool().clone()).list(&scope).await?;
    Ok(Json(ApiResponse::success(orders)))
}

async fn get_one(
    State(state): State<AppState>,
    scope: AuthScope,
    Path(id): Path<OrderId>,
) -> Result<Json<ApiResponse<Order>>, AppError> {
    let order = OrderService::new(state.pool().clone())
        .get(&scope, id)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn update(
    State(state): State<AppState>,
    scope: AuthScope,
    Path(id): Path<OrderId>,
    Json(input): Json<UpdateOrderInput>,
) -> Result<Json<ApiResponse<Order>>, AppError> {
    let order = OrderService::new(state.pool().clone())
        .update(&scope, id, input)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn update_status(
    State(state): State<AppState>,
    scope: AuthScope,
    Path(id): Path<OrderId>,
    Json(input): Json<UpdateOrderStatusInput>,
) -> Result<Json<ApiResponse<Order>>, AppError> {
    let order = OrderService::new(state.pool().clone())
        .update_status(&scope, id, input)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn delete(
    State(state): State<AppState>,
    scope: AuthScope,
    Path(id): Path<OrderId>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    OrderService::new(state.pool().clone())
        .delete(&scope, id)
        .await?;
    Ok(Json(ApiResponse::success_with_message((), "order deleted")))
}
