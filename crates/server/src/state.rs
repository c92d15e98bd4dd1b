//! Application state shared across handlers.

use std::sync::Arc;

use bespoke_shopify::ShopifyClient;

use crate::config::ServerConfig;

/// Application state shared across all handlers. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    config: ServerConfig,
    shopify: ShopifyClient,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig, shopify: ShopifyClient) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, shopify }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn shopify(&self) -> &ShopifyClient {
        &self.inner.shopify
    }
}
