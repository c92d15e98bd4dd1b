//! Custom variant creation endpoint.

use axum::Json;
use axum::extract::State;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::provision::{self, ProvisionRequest};
use crate::state::AppState;

const DEFAULT_TITLE: &str = "Custom Size";

/// Request body for `POST /create-custom-variant`.
///
/// `productId` and `price` are required; everything else is optional.
/// Required fields are modeled as `Option` so their absence yields a 400
/// with a descriptive body rather than a deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVariantRequest {
    product_id: Option<u64>,
    price: Option<Decimal>,
    title: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    extras: Vec<ExtraCost>,
    /// Skips delivery-profile resolution when supplied.
    delivery_profile_id: Option<String>,
}

/// One extra cost line added on top of the area price.
#[derive(Debug, Deserialize)]
struct ExtraCost {
    price: Decimal,
}

/// Response body on success.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVariantResponse {
    message: &'static str,
    variant_id: String,
    sku: String,
    option: String,
    is_deletable: bool,
}

/// Create a custom variant on an existing product.
///
/// Missing required fields are rejected before any remote call, as is a
/// declared price that does not match the server-side recomputation.
pub async fn create_custom_variant(
    State(state): State<AppState>,
    Json(payload): Json<CreateVariantRequest>,
) -> Result<Json<CreateVariantResponse>, AppError> {
    let (Some(product_id), Some(price)) = (payload.product_id, payload.price) else {
        return Err(AppError::BadRequest(
            "productId and price are required".to_string(),
        ));
    };

    let request = ProvisionRequest {
        product_id,
        price,
        title: payload.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        width: payload.width,
        height: payload.height,
        extras: payload.extras.into_iter().map(|extra| extra.price).collect(),
        delivery_profile_id: payload.delivery_profile_id,
    };

    let outcome =
        provision::provision_variant(state.shopify(), state.config().base_price, request).await?;

    Ok(Json(CreateVariantResponse {
        message: "Custom variant created successfully",
        variant_id: outcome.variant_id,
        sku: outcome.sku,
        option: outcome.label,
        is_deletable: outcome.is_deletable,
    }))
}
