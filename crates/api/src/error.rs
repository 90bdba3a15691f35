//! Unified error handling for the API.
//!
//! Domain failures carry a stable machine-readable reason code (e.g.
//! `INSUFFICIENT_STOCK`) that clients can branch on; the human-readable
//! message is advisory and may be localized client-side.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

use bazaar_core::{
    AddressId, CartItemId, OrderStatus, ParseStatusError, ProductId, VariantId,
};

use crate::db::RepositoryError;
use crate::response::ApiResponse;

/// A business-rule failure with a stable reason code.
///
/// Every variant maps to exactly one reason code and one 4xx status; the
/// carried fields surface in the response `data` so clients can retry with
/// corrected input (e.g. available vs requested quantity).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("product {0} is not active")]
    ProductNotActive(ProductId),

    #[error("product {product_id}: requested {requested} but only {available} in stock")]
    InsufficientStock {
        product_id: ProductId,
        requested: i32,
        available: i32,
    },

    #[error("product {product_id}: size {size:?} is not offered")]
    InvalidSize { product_id: ProductId, size: String },

    #[error("product {product_id}: color {color:?} is not offered")]
    InvalidColor {
        product_id: ProductId,
        color: String,
    },

    #[error("product {product_id}: no variant matches the requested size/colors")]
    VariantNotFound { product_id: ProductId },

    #[error("variant {variant_id}: requested {requested} but only {available} in stock")]
    InsufficientVariantStock {
        variant_id: VariantId,
        requested: i32,
        available: i32,
    },

    #[error("duplicate variant combination: size {size:?}, colors {colors:?}")]
    DuplicateVariantCombination { size: String, colors: Vec<String> },

    #[error("variant quantities sum to {variant_total}, exceeding product stock {stock_quantity}")]
    ExceedsProductStock {
        product_id: ProductId,
        variant_total: i64,
        stock_quantity: i32,
    },

    #[error("inventory not found")]
    InventoryNotFound,

    #[error("inventory for product {0} already exists")]
    InventoryAlreadyExists(ProductId),

    #[error("coupon {0:?} not found")]
    CouponNotFound(String),

    #[error("coupon {0:?} is not active yet")]
    CouponNotYetActive(String),

    #[error("coupon {0:?} has expired")]
    CouponExpired(String),

    #[error("coupon {0:?} is not available for this customer")]
    CouponNotEligible(String),

    #[error("coupon {0:?} does not apply to any item in this order")]
    CouponNotApplicable(String),

    #[error("percentage discount {0} is out of range (0-100)")]
    PercentageOutOfRange(Decimal),

    #[error("cart not found")]
    CartNotFound,

    #[error("cart item {0} not found")]
    CartItemNotFound(CartItemId),

    #[error("order not found")]
    OrderNotFound,

    #[error("shipping address {0} not found")]
    AddressNotFound(AddressId),

    #[error("illegal status transition: {from} -> {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("order in status {0} cannot be edited")]
    OrderNotEditable(OrderStatus),

    #[error("order in status {0} cannot be deleted")]
    OrderCannotBeDeleted(OrderStatus),

    #[error("a cancellation reason is required")]
    CancellationReasonRequired,

    #[error("quantity {0} is invalid")]
    InvalidQuantity(i32),

    #[error("access denied")]
    AccessDenied,
}

impl DomainError {
    /// Stable machine-readable reason code.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::ProductNotActive(_) => "PRODUCT_NOT_ACTIVE",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::InvalidSize { .. } => "INVALID_SIZE",
            Self::InvalidColor { .. } => "INVALID_COLOR",
            Self::VariantNotFound { .. } => "VARIANT_NOT_FOUND",
            Self::InsufficientVariantStock { .. } => "INSUFFICIENT_VARIANT_STOCK",
            Self::DuplicateVariantCombination { .. } => "DUPLICATE_VARIANT_COMBINATION",
            Self::ExceedsProductStock { .. } => "EXCEEDS_PRODUCT_STOCK",
            Self::InventoryNotFound => "INVENTORY_NOT_FOUND",
            Self::InventoryAlreadyExists(_) => "INVENTORY_ALREADY_EXISTS",
            Self::CouponNotFound(_) => "COUPON_NOT_FOUND",
            Self::CouponNotYetActive(_) => "COUPON_NOT_YET_ACTIVE",
            Self::CouponExpired(_) => "COUPON_EXPIRED",
            Self::CouponNotEligible(_) => "COUPON_NOT_ELIGIBLE",
            Self::CouponNotApplicable(_) => "COUPON_NOT_APPLICABLE_TO_PRODUCTS",
            Self::PercentageOutOfRange(_) => "PERCENTAGE_OUT_OF_RANGE",
            Self::CartNotFound => "CART_NOT_FOUND",
            Self::CartItemNotFound(_) => "CART_ITEM_NOT_FOUND",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::AddressNotFound(_) => "ADDRESS_NOT_FOUND",
            Self::InvalidStatusTransition { .. } => "ORDER_STATUS_INVALID",
            Self::OrderNotEditable(_) => "ORDER_NOT_EDITABLE",
            Self::OrderCannotBeDeleted(_) => "ORDER_CANNOT_BE_DELETED",
            Self::CancellationReasonRequired => "CANCELLATION_REASON_REQUIRED",
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::AccessDenied => "ACCESS_DENIED",
        }
    }

    /// HTTP status for this failure.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ProductNotFound(_)
            | Self::VariantNotFound { .. }
            | Self::InventoryNotFound
            | Self::CouponNotFound(_)
            | Self::CartNotFound
            | Self::CartItemNotFound(_)
            | Self::OrderNotFound
            | Self::AddressNotFound(_) => StatusCode::NOT_FOUND,

            Self::InsufficientStock { .. }
            | Self::InsufficientVariantStock { .. }
            | Self::ExceedsProductStock { .. }
            | Self::DuplicateVariantCombination { .. }
            | Self::InventoryAlreadyExists(_) => StatusCode::CONFLICT,

            Self::AccessDenied => StatusCode::FORBIDDEN,

            Self::InvalidStatusTransition { .. }
            | Self::OrderNotEditable(_)
            | Self::OrderCannotBeDeleted(_) => StatusCode::UNPROCESSABLE_ENTITY,

            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Structured detail payload for the response envelope.
    ///
    /// Availability failures name the specific entity and the available vs
    /// requested quantities so the client can retry with a corrected amount.
    #[must_use]
    pub fn details(&self) -> serde_json::Value {
        let mut details = match self {
            Self::ProductNotFound(id) | Self::ProductNotActive(id) => {
                json!({ "product_id": id })
            }
            Self::InsufficientStock {
                product_id,
                requested,
                available,
            } => json!({
                "product_id": product_id,
                "requested": requested,
                "available": available,
            }),
            Self::InvalidSize { product_id, size } => {
                json!({ "product_id": product_id, "size": size })
            }
            Self::InvalidColor { product_id, color } => {
                json!({ "product_id": product_id, "color": color })
            }
            Self::VariantNotFound { product_id } => json!({ "product_id": product_id }),
            Self::InsufficientVariantStock {
                variant_id,
                requested,
                available,
            } => json!({
                "variant_id": variant_id,
                "requested": requested,
                "available": available,
            }),
            Self::DuplicateVariantCombination { size, colors } => {
                json!({ "size": size, "colors": colors })
            }
            Self::ExceedsProductStock {
                product_id,
                variant_total,
                stock_quantity,
            } => json!({
                "product_id": product_id,
                "variant_total": variant_total,
                "stock_quantity": stock_quantity,
            }),
            Self::InvalidStatusTransition { from, to } => {
                json!({ "from": from, "to": to })
            }
            Self::OrderNotEditable(status) | Self::OrderCannotBeDeleted(status) => {
                json!({ "status": status })
            }
            _ => json!({}),
        };
        if let Some(map) = details.as_object_mut() {
            map.insert("reason".to_string(), json!(self.reason_code()));
        }
        details
    }
}

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// A business rule rejected the request.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Missing or invalid bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(RepositoryError::Database(err))
    }
}

impl From<ParseStatusError> for AppError {
    fn from(err: ParseStatusError) -> Self {
        Self::Database(RepositoryError::DataCorruption(err.to_string()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Domain(err) => {
                tracing::debug!(reason = err.reason_code(), "Request rejected");
                let body = ApiResponse::<serde_json::Value>::error_with_data(
                    err.to_string(),
                    err.details(),
                );
                (err.status_code(), Json(body)).into_response()
            }
            Self::Database(RepositoryError::NotFound) => {
                let body = ApiResponse::<serde_json::Value>::error("not found");
                (StatusCode::NOT_FOUND, Json(body)).into_response()
            }
            Self::Database(err) => {
                tracing::error!(error = %err, "Request failed");
                // Don't expose internal error details to clients
                let body = ApiResponse::<serde_json::Value>::error("Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            Self::Unauthorized(msg) => {
                let body = ApiResponse::<serde_json::Value>::error(msg);
                (StatusCode::UNAUTHORIZED, Json(body)).into_response()
            }
            Self::BadRequest(msg) => {
                let body = ApiResponse::<serde_json::Value>::error(msg);
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                let body = ApiResponse::<serde_json::Value>::error("Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_are_stable() {
        let err = DomainError::InsufficientStock {
            product_id: ProductId::new(3),
            requested: 5,
            available: 2,
        };
        assert_eq!(err.reason_code(), "INSUFFICIENT_STOCK");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn stock_details_name_quantities() {
        let err = DomainError::InsufficientStock {
            product_id: ProductId::new(3),
            requested: 5,
            available: 2,
        };
        let details = err.details();
        assert_eq!(details["reason"], "INSUFFICIENT_STOCK");
        assert_eq!(details["requested"], 5);
        assert_eq!(details["available"], 2);
        assert_eq!(details["product_id"], 3);
    }

    #[test]
    fn not_found_family_maps_to_404() {
        assert_eq!(
            DomainError::OrderNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DomainError::CouponNotFound("SAVE10".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DomainError::AccessDenied.status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn state_errors_map_to_422() {
        let err = DomainError::OrderCannotBeDeleted(OrderStatus::Shipped);
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.reason_code(), "ORDER_CANNOT_BE_DELETED");
    }
}
