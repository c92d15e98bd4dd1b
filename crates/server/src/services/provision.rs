//! Custom variant provisioning flow.
//!
//! Steps, in order:
//!
//! 1. **Price verification** (when dimensions are supplied): recompute the
//!    price server-side and reject a mismatch before any remote call.
//! 2. **Creation** (fatal on failure): read the product's options, then
//!    create the variant with a generated label and SKU.
//! 3. **Tagging** (best effort): mark the variant cleanup-eligible.
//! 4. **Shipping assignment** (best effort): resolve the product's delivery
//!    profile (direct lookup, then a scan over all profiles) and associate
//!    the variant.
//!
//! Once the variant exists the flow never unwinds: a failed follow-up step
//! is logged and reflected in the `is_deletable` flag, not in the status.

use std::future::Future;

use bespoke_shopify::client::ShopifyClient;
use bespoke_shopify::{NewVariant, products, variants};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::pricing;

/// Validated input to the provisioning flow.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    /// Numeric product id (the REST creation path wants it unqualified).
    pub product_id: u64,
    /// Caller-declared price.
    pub price: Decimal,
    /// Human title for the generated option label.
    pub title: String,
    /// Width in centimeters; enables price verification together with height.
    pub width: Option<u32>,
    /// Height in centimeters.
    pub height: Option<u32>,
    /// Extra costs added on top of the area price.
    pub extras: Vec<Decimal>,
    /// Delivery profile to attach the variant to, skipping resolution.
    pub delivery_profile_id: Option<String>,
}

/// Outcome of a completed provisioning flow.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    /// GID of the created variant.
    pub variant_id: String,
    /// Generated SKU.
    pub sku: String,
    /// Generated option label, e.g. `Custom Size - 1234`.
    pub label: String,
    /// Whether every best-effort follow-up step succeeded. `false` still
    /// means the variant was created.
    pub is_deletable: bool,
}

/// Run the provisioning flow against one product.
///
/// # Errors
///
/// Fails on a price mismatch (before any remote call) and on any creation
/// path failure. Follow-up step failures are downgraded to warnings.
#[instrument(skip(client, request), fields(product_id = request.product_id))]
pub async fn provision_variant(
    client: &ShopifyClient,
    base_price: Decimal,
    request: ProvisionRequest,
) -> Result<ProvisionOutcome, AppError> {
    // Price verification runs strictly before the creation call.
    if let (Some(width), Some(height)) = (request.width, request.height) {
        let expected = pricing::expected_price(base_price, width, height, &request.extras);
        if !pricing::declared_price_matches(request.price, expected) {
            return Err(AppError::BadRequest(format!(
                "declared price {} does not match computed price {expected}",
                request.price
            )));
        }
    }

    let (label, sku) = generate_label_and_sku(&request.title);

    let product_gid = variants::product_gid(request.product_id);
    let options = products::product_options(client, &product_gid).await?;
    let mut rest_price = request.price.round_dp(2);
    rest_price.rescale(2);
    let new_variant = NewVariant {
        price: rest_price.to_string(),
        sku: sku.clone(),
        option_values: variants::option_values(&options, &label),
    };

    let variant_id = variants::create_variant(client, request.product_id, &new_variant).await?;
    info!(%variant_id, %sku, "variant created");

    let tagged = best_effort(
        "tag_deletable",
        variants::tag_variant_deletable(client, &variant_id),
    )
    .await;

    let shipping_assigned = assign_shipping(
        client,
        &product_gid,
        &variant_id,
        request.delivery_profile_id.as_deref(),
    )
    .await;

    Ok(ProvisionOutcome {
        variant_id,
        sku,
        label,
        is_deletable: tagged && shipping_assigned,
    })
}

/// Resolve the product's delivery profile and attach the variant. Both the
/// lookup and the assignment are best effort. A caller-supplied profile id
/// skips resolution entirely.
async fn assign_shipping(
    client: &ShopifyClient,
    product_gid: &str,
    variant_gid: &str,
    supplied_profile: Option<&str>,
) -> bool {
    let profile_gid = if let Some(gid) = supplied_profile {
        Some(gid.to_string())
    } else {
        match resolve_profile(client, product_gid).await {
            Ok(profile) => profile,
            Err(()) => return false,
        }
    };

    let Some(profile_gid) = profile_gid else {
        warn!(product_gid, "no delivery profile found for product");
        return false;
    };

    best_effort(
        "assign_profile",
        variants::assign_variant_to_profile(client, &profile_gid, variant_gid),
    )
    .await
}

/// Direct lookup first, then the scan over all profiles. `Err(())` means a
/// lookup call itself failed (already logged).
async fn resolve_profile(client: &ShopifyClient, product_gid: &str) -> Result<Option<String>, ()> {
    match variants::product_delivery_profile(client, product_gid).await {
        Ok(Some(gid)) => Ok(Some(gid)),
        Ok(None) => match variants::find_profile_for_product(client, product_gid).await {
            Ok(profile) => Ok(profile),
            Err(err) => {
                warn!(error = %err, step = "scan_profiles", "follow-up step failed");
                Err(())
            }
        },
        Err(err) => {
            warn!(error = %err, step = "resolve_profile", "follow-up step failed");
            Err(())
        }
    }
}

/// Fault boundary for an optional step: a failure becomes a warning.
async fn best_effort<F>(step: &'static str, call: F) -> bool
where
    F: Future<Output = Result<(), bespoke_shopify::ShopifyError>>,
{
    match call.await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, step, "follow-up step failed");
            false
        }
    }
}

/// Generate the option label and SKU from the current timestamp: the label
/// gets the last four digits as a disambiguator, the SKU the full
/// millisecond value.
fn generate_label_and_sku(title: &str) -> (String, String) {
    let millis = Utc::now().timestamp_millis();
    let suffix = millis.rem_euclid(10_000);
    (format!("{title} - {suffix:04}"), format!("custom-{millis}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bespoke_shopify::title_has_cleanup_suffix;

    #[test]
    fn generated_label_matches_cleanup_pattern() {
        let (label, sku) = generate_label_and_sku("Custom Size");

        assert!(title_has_cleanup_suffix(&label));
        assert!(label.starts_with("Custom Size - "));
        assert!(sku.starts_with("custom-"));
    }
}
