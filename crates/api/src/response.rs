//! Uniform JSON response envelope.
//!
//! Every endpoint answers `{status, data, message}` where `status` is
//! `"success"` or `"error"`. Error responses put the stable reason code in
//! `data.reason` (see [`crate::error::DomainError::details`]).

use serde::Serialize;

/// The uniform response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// `"success"` or `"error"`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying `data`.
    #[must_use]
    pub const fn success(data: T) -> Self {
        Self {
            status: "success",
            data: Some(data),
            message: None,
        }
    }

    /// A successful response with both payload and message.
    #[must_use]
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            status: "success",
            data: Some(data),
            message: Some(message.into()),
        }
    }

    /// An error response with a message only.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            data: None,
            message: Some(message.into()),
        }
    }

    /// An error response carrying structured detail data.
    #[must_use]
    pub fn error_with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "error",
            data: Some(data),
            message: Some(message.into()),
        }
    }
}
