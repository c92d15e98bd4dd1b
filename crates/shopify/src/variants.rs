//! Variant provisioning calls.
//!
//! Creation goes through the legacy REST Admin endpoint (the GraphQL
//! mutation requires an option-value restructure the REST path does not);
//! the follow-up steps are GraphQL: a boolean metafield marking the variant
//! eligible for cleanup, and delivery-profile resolution plus assignment.

use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::client::ShopifyClient;
use crate::pagination::{self, Connection};
use crate::products::ProductOption;
use crate::{ShopifyError, UserError, check_user_errors};

/// Metafield marking a variant as provisioned-and-disposable, so the cleanup
/// job may delete it later.
pub const DELETABLE_NAMESPACE: &str = "custom";
/// Key of the cleanup-eligibility metafield.
pub const DELETABLE_KEY: &str = "is_deletable";

/// Delivery profiles are scanned in small pages; each node carries a nested
/// product connection, so the platform's 250 cap does not apply cleanly.
const PROFILE_PAGE_SIZE: u32 = 10;
const PROFILE_ITEMS_PAGE_SIZE: u32 = 50;

const TAG_DELETABLE_MUTATION: &str = "\
mutation TagDeletable($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    metafields { id }
    userErrors { field message }
  }
}";

const PRODUCT_DELIVERY_PROFILE_QUERY: &str = "\
query ProductDeliveryProfile($id: ID!) {
  product(id: $id) {
    variants(first: 1) {
      edges { node { deliveryProfile { id } } }
    }
  }
}";

const DELIVERY_PROFILES_QUERY: &str = "\
query DeliveryProfiles($first: Int!, $itemsFirst: Int!, $after: String) {
  deliveryProfiles(first: $first, after: $after) {
    pageInfo { hasNextPage }
    edges {
      cursor
      node {
        id
        profileItems(first: $itemsFirst) {
          pageInfo { hasNextPage }
          edges { cursor node { product { id } } }
        }
      }
    }
  }
}";

const DELIVERY_PROFILE_ITEMS_QUERY: &str = "\
query DeliveryProfileItems($id: ID!, $first: Int!, $after: String) {
  deliveryProfile(id: $id) {
    profileItems(first: $first, after: $after) {
      pageInfo { hasNextPage }
      edges { cursor node { product { id } } }
    }
  }
}";

const ASSIGN_VARIANT_MUTATION: &str = "\
mutation AssignVariantToProfile($id: ID!, $profile: DeliveryProfileInput!) {
  deliveryProfileUpdate(id: $id, profile: $profile) {
    profile { id }
    userErrors { field message }
  }
}";

/// Input to variant creation. Option values are positional: slot 1 first.
#[derive(Debug, Clone)]
pub struct NewVariant {
    /// Price as a canonical 2-decimal string, e.g. `105.00`.
    pub price: String,
    /// Generated SKU.
    pub sku: String,
    /// Values for option slots 1..=3; extra entries are ignored.
    pub option_values: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RestVariantEnvelope {
    variant: Option<RestVariant>,
}

#[derive(Debug, Deserialize)]
struct RestVariant {
    id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetafieldsSetData {
    metafields_set: Option<MetafieldsSetPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetafieldsSetPayload {
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
struct ProductProfileData {
    product: Option<ProductProfileNode>,
}

#[derive(Debug, Deserialize)]
struct ProductProfileNode {
    variants: BareConnection<ProfileRefNode>,
}

/// Connection consumed without cursors (single fixed-size page).
#[derive(Debug, Deserialize)]
struct BareConnection<T> {
    edges: Vec<BareEdge<T>>,
}

#[derive(Debug, Deserialize)]
struct BareEdge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRefNode {
    delivery_profile: Option<IdNode>,
}

#[derive(Debug, Deserialize)]
struct IdNode {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryProfilesData {
    delivery_profiles: Connection<DeliveryProfileNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryProfileNode {
    id: String,
    profile_items: Connection<ProfileItemNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryProfileItemsData {
    delivery_profile: Option<DeliveryProfileItemsNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryProfileItemsNode {
    profile_items: Connection<ProfileItemNode>,
}

#[derive(Debug, Deserialize)]
struct ProfileItemNode {
    product: IdNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdateData {
    delivery_profile_update: Option<ProfileUpdatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdatePayload {
    #[serde(default)]
    user_errors: Vec<UserError>,
}

/// Qualify a numeric product id into a GID.
#[must_use]
pub fn product_gid(numeric_id: u64) -> String {
    format!("gid://shopify/Product/{numeric_id}")
}

/// Qualify a numeric variant id into a GID.
#[must_use]
pub fn variant_gid(numeric_id: u64) -> String {
    format!("gid://shopify/ProductVariant/{numeric_id}")
}

/// Build REST option values for a new variant: the generated label goes in
/// slot 1, remaining slots keep the product's first configured value (or
/// `Default Title` when a slot has none). A product with no options gets the
/// label alone.
#[must_use]
pub fn option_values(options: &[ProductOption], label: &str) -> Vec<String> {
    if options.is_empty() {
        return vec![label.to_string()];
    }
    options
        .iter()
        .take(3)
        .enumerate()
        .map(|(slot, option)| {
            if slot == 0 {
                label.to_string()
            } else {
                option
                    .values
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "Default Title".to_string())
            }
        })
        .collect()
}

/// Create a variant via the REST Admin endpoint. Returns the new variant's
/// GID.
///
/// `inventory_policy` is set to `continue` so the variant is sellable at
/// zero stock. Attempted exactly once.
///
/// # Errors
///
/// Returns `UserError` on a 422 rejection and `UnexpectedShape` when the
/// response carries no variant id.
#[instrument(skip(client, new_variant), fields(sku = %new_variant.sku))]
pub async fn create_variant(
    client: &ShopifyClient,
    product_id: u64,
    new_variant: &NewVariant,
) -> Result<String, ShopifyError> {
    let mut variant = serde_json::Map::new();
    variant.insert("price".to_string(), json!(new_variant.price));
    variant.insert("sku".to_string(), json!(new_variant.sku));
    variant.insert("inventory_policy".to_string(), json!("continue"));
    for (slot, value) in new_variant.option_values.iter().take(3).enumerate() {
        variant.insert(format!("option{}", slot + 1), json!(value));
    }

    let envelope: RestVariantEnvelope = client
        .rest_post(
            &format!("products/{product_id}/variants.json"),
            &json!({ "variant": variant }),
        )
        .await?;

    let created = envelope.variant.ok_or_else(|| {
        ShopifyError::UnexpectedShape("variant missing from REST response".to_string())
    })?;
    Ok(variant_gid(created.id))
}

/// Set the boolean cleanup-eligibility metafield on a variant.
///
/// # Errors
///
/// Returns `UserError` when the API rejects the write. Never retried.
#[instrument(skip(client))]
pub async fn tag_variant_deletable(
    client: &ShopifyClient,
    variant_gid: &str,
) -> Result<(), ShopifyError> {
    let data: MetafieldsSetData = client
        .execute(
            TAG_DELETABLE_MUTATION,
            json!({
                "metafields": [{
                    "ownerId": variant_gid,
                    "namespace": DELETABLE_NAMESPACE,
                    "key": DELETABLE_KEY,
                    "type": "boolean",
                    "value": "true",
                }],
            }),
        )
        .await?;

    let payload = data.metafields_set.ok_or_else(|| {
        ShopifyError::UnexpectedShape("metafieldsSet missing from response".to_string())
    })?;
    check_user_errors(payload.user_errors)
}

/// Look up a product's delivery profile through its first existing variant.
///
/// Returns `Ok(None)` when the product has no variants or no profile; the
/// caller falls back to [`find_profile_for_product`].
///
/// # Errors
///
/// Transport and GraphQL errors only; absence is not an error.
#[instrument(skip(client))]
pub async fn product_delivery_profile(
    client: &ShopifyClient,
    product_gid: &str,
) -> Result<Option<String>, ShopifyError> {
    let data: ProductProfileData = client
        .execute_read(PRODUCT_DELIVERY_PROFILE_QUERY, json!({ "id": product_gid }))
        .await?;

    Ok(data
        .product
        .and_then(|node| node.variants.edges.into_iter().next())
        .and_then(|edge| edge.node.delivery_profile)
        .map(|profile| profile.id))
}

/// Linear scan over all delivery profiles for one whose assigned products
/// include `product_gid`.
///
/// Each profile's item connection is walked to exhaustion: the inline page
/// is checked first, and a profile reporting more items gets its own nested
/// cursor walk before the scan moves on.
///
/// Fallback path when the direct lookup yields nothing.
///
/// # Errors
///
/// Page errors fail the whole scan.
#[instrument(skip(client))]
pub async fn find_profile_for_product(
    client: &ShopifyClient,
    product_gid: &str,
) -> Result<Option<String>, ShopifyError> {
    let profiles = pagination::fetch_all(|after| async move {
        let data: DeliveryProfilesData = client
            .execute_read(
                DELIVERY_PROFILES_QUERY,
                json!({
                    "first": PROFILE_PAGE_SIZE,
                    "itemsFirst": PROFILE_ITEMS_PAGE_SIZE,
                    "after": after,
                }),
            )
            .await?;
        Ok(data.delivery_profiles.into())
    })
    .await?;

    for profile in profiles {
        let inline_match = profile
            .profile_items
            .edges
            .iter()
            .any(|edge| edge.node.product.id == product_gid);
        if inline_match {
            return Ok(Some(profile.id));
        }
        // More items than the inline page carries: restart a full cursor
        // walk over this profile's item connection.
        if profile.profile_items.page_info.has_next_page
            && profile_items_include(client, &profile.id, product_gid).await?
        {
            return Ok(Some(profile.id));
        }
    }
    Ok(None)
}

/// Walk one profile's full item connection looking for `product_gid`.
async fn profile_items_include(
    client: &ShopifyClient,
    profile_gid: &str,
    product_gid: &str,
) -> Result<bool, ShopifyError> {
    let matches = pagination::fetch_all_matching(
        |after| async move {
            let data: DeliveryProfileItemsData = client
                .execute_read(
                    DELIVERY_PROFILE_ITEMS_QUERY,
                    json!({
                        "id": profile_gid,
                        "first": PROFILE_ITEMS_PAGE_SIZE,
                        "after": after,
                    }),
                )
                .await?;
            let profile = data.delivery_profile.ok_or_else(|| {
                ShopifyError::NotFound(format!("delivery profile {profile_gid}"))
            })?;
            Ok(profile.profile_items.into())
        },
        |item: &ProfileItemNode| item.product.id == product_gid,
    )
    .await?;
    Ok(!matches.is_empty())
}

/// Associate a variant with a delivery profile.
///
/// # Errors
///
/// Returns `UserError` when the API rejects the association. Never retried.
#[instrument(skip(client))]
pub async fn assign_variant_to_profile(
    client: &ShopifyClient,
    profile_gid: &str,
    variant_gid: &str,
) -> Result<(), ShopifyError> {
    let data: ProfileUpdateData = client
        .execute(
            ASSIGN_VARIANT_MUTATION,
            json!({
                "id": profile_gid,
                "profile": { "variantsToAssociate": [variant_gid] },
            }),
        )
        .await?;

    let payload = data.delivery_profile_update.ok_or_else(|| {
        ShopifyError::UnexpectedShape("deliveryProfileUpdate missing from response".to_string())
    })?;
    check_user_errors(payload.user_errors)
}
