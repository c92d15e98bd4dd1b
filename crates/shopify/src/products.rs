//! Product reads and the variant cleanup delete.
//!
//! Covers the cleanup job's data needs: every product id in the shop, every
//! variant of a product with its title, the cleanup-suffix match, and the
//! delete mutation. Plus the product option read the provisioning flow uses
//! to build REST option values.

use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::client::ShopifyClient;
use crate::pagination::{self, Connection, PAGE_SIZE};
use crate::{ShopifyError, UserError, check_user_errors};

const PRODUCT_IDS_QUERY: &str = "\
query ProductIds($first: Int!, $after: String) {
  products(first: $first, after: $after) {
    pageInfo { hasNextPage }
    edges { cursor node { id } }
  }
}";

const PRODUCT_VARIANTS_QUERY: &str = "\
query ProductVariants($id: ID!, $first: Int!, $after: String) {
  node(id: $id) {
    ... on Product {
      variants(first: $first, after: $after) {
        pageInfo { hasNextPage }
        edges { cursor node { id title } }
      }
    }
  }
}";

const PRODUCT_OPTIONS_QUERY: &str = "\
query ProductOptions($id: ID!) {
  product(id: $id) {
    id
    options { name values }
  }
}";

const DELETE_VARIANT_MUTATION: &str = "\
mutation DeleteVariant($id: ID!) {
  productVariantDelete(id: $id) {
    deletedProductVariantId
    userErrors { field message }
  }
}";

/// A variant as seen by the cleanup job: id plus the title the match runs on.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantSummary {
    /// Variant GID.
    pub id: String,
    /// Display title, e.g. `Custom Size - 1234`.
    pub title: String,
}

/// A product option with its configured values, in position order.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductOption {
    /// Option name, e.g. `Size`.
    pub name: String,
    /// Configured values; first value is the product's default for the slot.
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProductsData {
    products: Connection<ProductIdNode>,
}

#[derive(Debug, Deserialize)]
struct ProductIdNode {
    id: String,
}

#[derive(Debug, Deserialize)]
struct VariantsNodeData {
    node: Option<VariantsNode>,
}

#[derive(Debug, Deserialize)]
struct VariantsNode {
    variants: Connection<VariantSummary>,
}

#[derive(Debug, Deserialize)]
struct ProductOptionsData {
    product: Option<ProductOptionsNode>,
}

#[derive(Debug, Deserialize)]
struct ProductOptionsNode {
    #[serde(default)]
    options: Vec<ProductOption>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteVariantData {
    product_variant_delete: Option<DeleteVariantPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteVariantPayload {
    deleted_product_variant_id: Option<String>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

/// Whether a variant title ends with the cleanup suffix: a literal
/// space-hyphen-space followed by exactly four ASCII digits.
///
/// `"Foo - 1234"` matches; `"Foo - 123"`, `"Foo 1234"` and
/// `"Foo - 12345"` do not.
#[must_use]
pub fn title_has_cleanup_suffix(title: &str) -> bool {
    let bytes = title.as_bytes();
    if bytes.len() < 7 {
        return false;
    }
    let (head, digits) = bytes.split_at(bytes.len() - 4);
    digits.iter().all(u8::is_ascii_digit) && head.ends_with(b" - ")
}

/// Fetch every product GID in the shop, walking all pages.
///
/// # Errors
///
/// Fails the whole walk on any page error; no partial list is returned.
#[instrument(skip(client))]
pub async fn product_ids(client: &ShopifyClient) -> Result<Vec<String>, ShopifyError> {
    let nodes = pagination::fetch_all(|after| async move {
        let data: ProductsData = client
            .execute_read(
                PRODUCT_IDS_QUERY,
                json!({ "first": PAGE_SIZE, "after": after }),
            )
            .await?;
        Ok(data.products.into())
    })
    .await?;

    Ok(nodes.into_iter().map(|node| node.id).collect())
}

/// Fetch every variant of one product, walking all pages of its variant
/// connection.
///
/// # Errors
///
/// Returns `NotFound` when the product does not exist; page errors fail the
/// whole walk.
#[instrument(skip(client))]
pub async fn product_variants(
    client: &ShopifyClient,
    product_gid: &str,
) -> Result<Vec<VariantSummary>, ShopifyError> {
    fetch_variants_matching(client, product_gid, |_| true).await
}

/// Fetch the variants of one product whose titles carry the cleanup suffix.
///
/// # Errors
///
/// Same as [`product_variants`].
#[instrument(skip(client))]
pub async fn cleanup_candidates(
    client: &ShopifyClient,
    product_gid: &str,
) -> Result<Vec<VariantSummary>, ShopifyError> {
    fetch_variants_matching(client, product_gid, |variant| {
        title_has_cleanup_suffix(&variant.title)
    })
    .await
}

async fn fetch_variants_matching<P>(
    client: &ShopifyClient,
    product_gid: &str,
    matches: P,
) -> Result<Vec<VariantSummary>, ShopifyError>
where
    P: FnMut(&VariantSummary) -> bool,
{
    pagination::fetch_all_matching(
        |after| async move {
            let data: VariantsNodeData = client
                .execute_read(
                    PRODUCT_VARIANTS_QUERY,
                    json!({ "id": product_gid, "first": PAGE_SIZE, "after": after }),
                )
                .await?;
            let node = data
                .node
                .ok_or_else(|| ShopifyError::NotFound(format!("product {product_gid}")))?;
            Ok(node.variants.into())
        },
        matches,
    )
    .await
}

/// Read a product's options (name + configured values).
///
/// # Errors
///
/// Returns `NotFound` when the product does not exist.
#[instrument(skip(client))]
pub async fn product_options(
    client: &ShopifyClient,
    product_gid: &str,
) -> Result<Vec<ProductOption>, ShopifyError> {
    let data: ProductOptionsData = client
        .execute_read(PRODUCT_OPTIONS_QUERY, json!({ "id": product_gid }))
        .await?;

    data.product
        .map(|node| node.options)
        .ok_or_else(|| ShopifyError::NotFound(format!("product {product_gid}")))
}

/// Delete one variant by GID. Returns the deleted variant's id as echoed by
/// the API.
///
/// # Errors
///
/// Returns `UserError` when the API rejects the delete (e.g. the variant no
/// longer exists), `UnexpectedShape` when the payload is missing. Never
/// retried.
#[instrument(skip(client))]
pub async fn delete_variant(
    client: &ShopifyClient,
    variant_gid: &str,
) -> Result<String, ShopifyError> {
    let data: DeleteVariantData = client
        .execute(DELETE_VARIANT_MUTATION, json!({ "id": variant_gid }))
        .await?;

    let payload = data.product_variant_delete.ok_or_else(|| {
        ShopifyError::UnexpectedShape("productVariantDelete missing from response".to_string())
    })?;
    check_user_errors(payload.user_errors)?;
    payload.deleted_product_variant_id.ok_or_else(|| {
        ShopifyError::UnexpectedShape("deletedProductVariantId missing from response".to_string())
    })
}
