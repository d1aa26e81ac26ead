//! API error types and helpers.
//!
//! # Purpose
//! Centralizes HTTP error response construction so every handler maps the
//! same error kind to the same status and code string.
use crate::api::types::ErrorResponse;
use crate::relations::RelationError;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn api_bad_request(code: &str, message: &str) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

pub fn api_internal(code: &str, message: &str) -> ApiError {
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

/// Map a facade error onto the wire: structural and namespace problems are
/// the caller's fault (400), store failures are ours (500).
pub fn relation_error(context: &str, err: RelationError) -> ApiError {
    match err {
        RelationError::InvalidTuple(err) => api_bad_request("invalid_tuple", &err.to_string()),
        RelationError::InvalidAction(action) => {
            api_bad_request("invalid_action", &format!("unknown action {action:?}"))
        }
        RelationError::UnknownNamespace(namespace) => api_bad_request(
            "namespace_unknown",
            &format!("namespace {namespace:?} is not declared"),
        ),
        RelationError::Store(err) => store_error(context, err),
    }
}

pub fn store_error(context: &str, err: StoreError) -> ApiError {
    match err {
        StoreError::InvalidQuery(message) => api_bad_request("invalid_query", &message),
        StoreError::InvalidCursor(message) => api_bad_request("invalid_cursor", &message),
        StoreError::Unavailable(err) => {
            tracing::error!(error = ?err, context, "tuple store unavailable");
            api_internal("store_unavailable", context)
        }
        StoreError::Unexpected(err) => {
            tracing::error!(error = ?err, context, "tuple store error");
            api_internal("internal", context)
        }
    }
}
