//! Shopify Admin API transport.
//!
//! One client, two request paths: GraphQL (`{query, variables}` POSTs) and
//! the legacy REST Admin endpoint used by variant creation. Every caller
//! value travels through the variables map or a serialized body, never
//! spliced into query text.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{instrument, warn};

use super::{GraphQLError, GraphQLErrorLocation, ShopifyError};

/// Default per-call timeout. The upstream had none; a hung remote call must
/// not hang the whole flow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of retries for read/list calls.
const DEFAULT_READ_RETRIES: u32 = 2;

/// Shopify Admin API client.
///
/// Holds the shop domain, API version, and the access token. Cheap to clone;
/// all state is behind an `Arc`.
///
/// # Retry policy
///
/// Read/list calls ([`Self::execute_read`]) retry transient failures
/// (network errors, 429, 5xx) with linear backoff. Mutations
/// ([`Self::execute`], [`Self::rest_post`]) are attempted exactly once:
/// creation calls are not idempotent and a retry could duplicate a variant.
#[derive(Clone)]
pub struct ShopifyClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    client: reqwest::Client,
    shop: String,
    /// Scheme + host requests are sent to. Defaults to `https://{shop}`;
    /// overridable so tests can target a local mock server.
    base_url: String,
    api_version: String,
    access_token: SecretString,
    max_read_retries: u32,
    backoff_base_secs: u64,
}

impl std::fmt::Debug for ShopifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyClient")
            .field("shop", &self.inner.shop)
            .field("api_version", &self.inner.api_version)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    locations: Vec<GraphQLErrorLocationResponse>,
    #[serde(default)]
    path: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorLocationResponse {
    line: i64,
    column: i64,
}

impl ShopifyClient {
    /// Create a new client for a shop.
    ///
    /// # Arguments
    ///
    /// * `shop` - Shop domain (e.g., `your-store.myshopify.com`)
    /// * `access_token` - Admin API access token
    /// * `api_version` - API version (e.g., `2024-07`)
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(
        shop: impl Into<String>,
        access_token: SecretString,
        api_version: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        let shop = shop.into();
        let base_url = format!("https://{shop}");

        Self {
            inner: Arc::new(ClientInner {
                client,
                shop,
                base_url,
                api_version: api_version.into(),
                access_token,
                max_read_retries: DEFAULT_READ_RETRIES,
                backoff_base_secs: 1,
            }),
        }
    }

    /// Override the read retry policy.
    ///
    /// `max_retries = 0` disables retries; `backoff_base_secs = 0` retries
    /// without sleeping (used by tests).
    #[must_use]
    pub fn with_retry_policy(self, max_retries: u32, backoff_base_secs: u64) -> Self {
        let inner = &self.inner;
        Self {
            inner: Arc::new(ClientInner {
                client: inner.client.clone(),
                shop: inner.shop.clone(),
                base_url: inner.base_url.clone(),
                api_version: inner.api_version.clone(),
                access_token: inner.access_token.clone(),
                max_read_retries: max_retries,
                backoff_base_secs,
            }),
        }
    }

    /// Send requests to a different base URL (scheme + host) instead of
    /// `https://{shop}`. Intended for tests against a local mock server.
    #[must_use]
    pub fn with_base_url(self, base_url: impl Into<String>) -> Self {
        let inner = &self.inner;
        Self {
            inner: Arc::new(ClientInner {
                client: inner.client.clone(),
                shop: inner.shop.clone(),
                base_url: base_url.into(),
                api_version: inner.api_version.clone(),
                access_token: inner.access_token.clone(),
                max_read_retries: inner.max_read_retries,
                backoff_base_secs: inner.backoff_base_secs,
            }),
        }
    }

    /// Get the shop domain.
    #[must_use]
    pub fn shop(&self) -> &str {
        &self.inner.shop
    }

    fn graphql_url(&self) -> String {
        format!(
            "{}/admin/api/{}/graphql.json",
            self.inner.base_url, self.inner.api_version
        )
    }

    fn rest_url(&self, path: &str) -> String {
        format!(
            "{}/admin/api/{}/{}",
            self.inner.base_url, self.inner.api_version, path
        )
    }

    // =========================================================================
    // GraphQL execution
    // =========================================================================

    /// Execute a GraphQL mutation (or any single-attempt call).
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::RateLimited` on 429, `ShopifyError::Unauthorized`
    /// on 401, `ShopifyError::GraphQL` when the response carries top-level
    /// errors, `ShopifyError::UnexpectedShape` when `data` is absent, and
    /// `ShopifyError::Http` on network failures.
    #[instrument(skip(self, query, variables))]
    pub async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, ShopifyError> {
        self.request_graphql(query, &variables).await
    }

    /// Execute a GraphQL read/list query with bounded retry.
    ///
    /// Transient failures (network errors, 429, 5xx) are retried up to the
    /// configured limit with linear backoff. Application-level failures
    /// (GraphQL errors, user errors, auth) are never retried.
    ///
    /// # Errors
    ///
    /// Same as [`Self::execute`]; the final attempt's error is returned when
    /// retries are exhausted.
    #[instrument(skip(self, query, variables))]
    pub async fn execute_read<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, ShopifyError> {
        let mut attempt: u32 = 0;
        loop {
            match self.request_graphql(query, &variables).await {
                Ok(data) => return Ok(data),
                Err(err) if attempt < self.inner.max_read_retries && is_transient(&err) => {
                    attempt += 1;
                    let wait = self.inner.backoff_base_secs * u64::from(attempt);
                    warn!(
                        error = %err,
                        attempt,
                        wait_secs = wait,
                        "Transient Shopify error, retrying read"
                    );
                    if wait > 0 {
                        tokio::time::sleep(Duration::from_secs(wait)).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn request_graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: &serde_json::Value,
    ) -> Result<T, ShopifyError> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        let response = self
            .inner
            .client
            .post(self.graphql_url())
            .header(
                "X-Shopify-Access-Token",
                self.inner.access_token.expose_secret(),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let graphql_response: GraphQLResponse<T> = Self::check_status(response)?.json().await?;

        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            let converted_errors: Vec<GraphQLError> = errors
                .into_iter()
                .map(|e| GraphQLError {
                    message: e.message,
                    locations: e
                        .locations
                        .into_iter()
                        .map(|l| GraphQLErrorLocation {
                            line: l.line,
                            column: l.column,
                        })
                        .collect(),
                    path: e.path,
                })
                .collect();
            return Err(ShopifyError::GraphQL(converted_errors));
        }

        graphql_response
            .data
            .ok_or_else(|| ShopifyError::UnexpectedShape("no data in response".to_string()))
    }

    // =========================================================================
    // REST execution
    // =========================================================================

    /// POST a JSON body to a legacy REST Admin path (e.g.,
    /// `products/123/variants.json`) and decode the response.
    ///
    /// Attempted exactly once; REST writes here are creations and must not
    /// be retried.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::UserError` when Shopify rejects the payload
    /// with a 422, plus the same transport errors as [`Self::execute`].
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn rest_post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ShopifyError> {
        let response = self
            .inner
            .client
            .post(self.rest_url(path))
            .header(
                "X-Shopify-Access-Token",
                self.inner.access_token.expose_secret(),
            )
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            let text = response.text().await.unwrap_or_default();
            return Err(ShopifyError::UserError(text));
        }

        Ok(Self::check_status(response)?.json().await?)
    }

    /// Map non-success statuses to classified errors before decoding.
    fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ShopifyError> {
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ShopifyError::Unauthorized);
        }

        if !response.status().is_success() {
            return Err(ShopifyError::UnexpectedStatus(response.status().as_u16()));
        }

        Ok(response)
    }
}

/// Whether an error is worth retrying on a read call.
const fn is_transient(err: &ShopifyError) -> bool {
    match err {
        ShopifyError::Http(_) | ShopifyError::RateLimited(_) => true,
        ShopifyError::UnexpectedStatus(status) => *status >= 500,
        _ => false,
    }
}
