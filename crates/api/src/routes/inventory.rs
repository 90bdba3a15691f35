//! Inventory ledger endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use bazaar_core::{InventoryId, ProductId, VariantId};

use crate::error::AppError;
use crate::models::auth::AuthScope;
use crate::models::inventory::{Inventory, VariantInput};
use crate::response::ApiResponse;
use crate::services::InventoryService;
use crate::services::inventory::BulkDeleteReport;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inventory", post(create))
        .route("/inventory/bulk-delete", post(bulk_delete))
        .route(
            "/inventory/{id}",
            get(get_one).patch(update).delete(delete),
        )
        .route("/inventory/{id}/variants/{variant_id}", axum::routing::patch(update_variant))
}

#[derive(Debug, Deserialize)]
struct CreateInventoryRequest {
    product_id: ProductId,
    #[serde(default)]
    variants: Vec<VariantInput>,
}

#[derive(Debug, Deserialize)]
struct UpdateInventoryRequest {
    variants: Vec<VariantInput>,
}

#[derive(Debug, Deserialize)]
struct BulkDeleteRequest {
    ids: Vec<InventoryId>,
}

async fn create(
    State(state): State<AppState>,
    scope: AuthScope,
    Json(input): Json<CreateInventoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Inventory>>), AppError> {
    let inventory = InventoryService::new(state.pool().clone())
        .create(&scope, input.product_id, input.variants)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(inventory))))
}

async fn get_one(
    State(state): State<AppState>,
    scope: AuthScope,
    Path(id): Path<InventoryId>,
) -> Result<Json<ApiResponse<Inventory>>, AppError> {
    let inventory = InventoryService::new(state.pool().clone())
        .get(&scope, id)
        .await?;
    Ok(Json(ApiResponse::success(inventory)))
}

async fn update(
    State(state): State<AppState>,
    scope: AuthScope,
    Path(id): Path<InventoryId>,
    Json(input): Json<UpdateInventoryRequest>,
) -> Result<Json<ApiResponse<Inventory>>, AppError> {
    let inventory = InventoryService::new(state.pool().clone())
        .update(&scope, id, input.variants)
        .await?;
    Ok(Json(ApiResponse::success(inventory)))
}

async fn update_variant(
    State(state): State<AppState>,
    scope: AuthScope,
    Path((id, variant_id)): Path<(InventoryId, VariantId)>,
    Json(input): Json<VariantInput>,
) -> Result<Json<ApiResponse<Inventory>>, AppError> {
    let inventory = InventoryService::new(state.pool().clone())
        .update_variant(&scope, id, variant_id, input)
        .await?;
    Ok(Json(ApiResponse::success(inventory)))
}

async fn delete(
    State(state): State<AppState>,
    scope: AuthScope,
    Path(id): Path<InventoryId>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    InventoryService::new(state.pool().clone())
        .delete(&scope, id)
        .await?;
    Ok(Json(ApiResponse::success_with_message((), "inventory deleted")))
}

async fn bulk_delete(
    State(state): State<AppState>,
    scope: AuthScope,
    Json(input): Json<BulkDeleteRequest>,
) -> Result<Json<ApiResponse<BulkDeleteReport>>, AppError> {
    let report = InventoryService::new(state.pool().clone())
        .bulk_delete(&scope, &input.ids)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}
