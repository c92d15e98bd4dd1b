//! Bulk variant cleanup.
//!
//! Walks every product in the shop, collects variants whose titles end with
//! the ` - NNNN` suffix the provisioning flow generates, and deletes them
//! one at a time. One product's failed variant walk is logged and skipped;
//! one variant's failed delete never stops the rest.

use bespoke_server::config::ServerConfig;
use bespoke_shopify::{ShopifyClient, ShopifyError, products, run_bulk};
use tracing::{info, warn};

/// Totals across the whole shop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    /// Variants whose titles carried the cleanup suffix.
    pub matched: usize,
    /// Deletes the API applied.
    pub applied: usize,
    /// Deletes the API rejected.
    pub rejected: usize,
    /// Deletes that failed in transport.
    pub failed: usize,
}

/// Run the cleanup over the whole shop, with config and client from the
/// environment.
///
/// With `dry_run` set, matching variants are listed but nothing is deleted.
pub async fn run(dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let client = ShopifyClient::new(
        config.shopify.shop.clone(),
        config.shopify.access_token.clone(),
        config.shopify.api_version.clone(),
    );

    info!(dry_run, shop = %config.shopify.shop, "starting variant cleanup");
    let report = run_cleanup(&client, dry_run).await?;
    info!(
        matched = report.matched,
        applied = report.applied,
        rejected = report.rejected,
        failed = report.failed,
        "variant cleanup complete"
    );
    Ok(())
}

/// The cleanup walk itself, against an already-built client.
async fn run_cleanup(client: &ShopifyClient, dry_run: bool) -> Result<CleanupReport, ShopifyError> {
    let product_ids = products::product_ids(client).await?;
    info!(products = product_ids.len(), "fetched product ids");

    let mut report = CleanupReport::default();

    for product_gid in product_ids {
        let candidates = match products::cleanup_candidates(client, &product_gid).await {
            Ok(candidates) => candidates,
            Err(err) => {
                // One product's variant walk failing must not stop the rest.
                warn!(product = %product_gid, error = %err, "skipping product");
                continue;
            }
        };
        if candidates.is_empty() {
            continue;
        }
        report.matched += candidates.len();

        if dry_run {
            for variant in &candidates {
                info!(id = %variant.id, title = %variant.title, "would delete");
            }
            continue;
        }

        let ids: Vec<String> = candidates.into_iter().map(|variant| variant.id).collect();
        let (_, summary) = run_bulk(ids, |id| {
            let client = client.clone();
            async move { products::delete_variant(&client, &id).await }
        })
        .await;

        info!(product = %product_gid, %summary, "product cleanup finished");
        report.applied += summary.applied;
        report.rejected += summary.rejected;
        report.failed += summary.failed;
    }

    Ok(report)
}
