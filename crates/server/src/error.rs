//! Unified error handling for the provisioning API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bespoke_shopify::ShopifyError;
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Upstream failures worth a Sentry event. Client-attributable errors
    /// (bad requests, user errors, not-found) are noise.
    const fn is_server_side(&self) -> bool {
        matches!(
            self,
            Self::Shopify(
                ShopifyError::Http(_)
                    | ShopifyError::GraphQL(_)
                    | ShopifyError::Parse(_)
                    | ShopifyError::UnexpectedShape(_)
                    | ShopifyError::RateLimited(_)
                    | ShopifyError::UnexpectedStatus(_)
                    | ShopifyError::Unauthorized
            )
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_side() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let (status, message) = match &self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            // The remote reached us and said no: pass its details through.
            Self::Shopify(ShopifyError::UserError(message)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, message.clone())
            }
            Self::Shopify(ShopifyError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, format!("Not found: {what}"))
            }
            Self::Shopify(_) => (
                StatusCode::BAD_GATEWAY,
                "External service error".to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_of(AppError::BadRequest("productId and price are required".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Shopify(ShopifyError::UserError(
                "id: Variant does not exist".to_string()
            ))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::Shopify(ShopifyError::NotFound(
                "product gid://shopify/Product/1".to_string()
            ))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Shopify(ShopifyError::UnexpectedStatus(500))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AppError::Shopify(ShopifyError::RateLimited(60))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_server_side_classification() {
        // Every 502-mapped upstream failure is reported; client-attributable
        // errors are not.
        assert!(AppError::Shopify(ShopifyError::GraphQL(Vec::new())).is_server_side());
        assert!(AppError::Shopify(ShopifyError::RateLimited(60)).is_server_side());
        assert!(AppError::Shopify(ShopifyError::UnexpectedStatus(503)).is_server_side());
        assert!(AppError::Shopify(ShopifyError::Unauthorized).is_server_side());

        assert!(!AppError::BadRequest("missing field".to_string()).is_server_side());
        assert!(!AppError::Shopify(ShopifyError::UserError("no".to_string())).is_server_side());
        assert!(
            !AppError::Shopify(ShopifyError::NotFound("product".to_string())).is_server_side()
        );
    }
}
