//! Shopify Admin API client.
//!
//! Provides a thin, explicit client for the two flows this service needs:
//! walking cursor-paginated collections to exhaustion and running the
//! multi-step custom-variant provisioning calls.
//!
//! # Architecture
//!
//! - Hand-written GraphQL documents sent as `{query, variables}` bodies;
//!   caller values only ever travel through the variables map
//! - One explicit response-decoding step per call: raw bodies are mapped to
//!   typed payloads or a classified [`ShopifyError`] before any business
//!   logic sees them
//! - Read/list calls get bounded retry with backoff; mutations are attempted
//!   exactly once (a retried creation could duplicate a variant)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bulk;
pub mod client;
pub mod pagination;
pub mod products;
pub mod variants;

pub use bulk::{BulkSummary, MutationOutcome, run_bulk};
pub use client::ShopifyClient;
pub use pagination::{Page, PageEdge, fetch_all, fetch_all_matching};
pub use products::{ProductOption, VariantSummary, title_has_cleanup_suffix};
pub use variants::NewVariant;

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed (network, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned top-level errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// The mutation reached Shopify but was rejected with `userErrors`.
    #[error("Shopify user error: {0}")]
    UserError(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response decoded but the expected field was absent.
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Non-success HTTP status with no usable body.
    #[error("Unexpected HTTP status {0} from Shopify")]
    UnexpectedStatus(u16),

    /// Access token rejected.
    #[error("Unauthorized: invalid or expired access token")]
    Unauthorized,
}

/// A GraphQL error returned by the Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A `userErrors` entry attached to Admin API mutation payloads.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct UserError {
    /// Input path the error refers to, when the API supplies one.
    #[serde(default)]
    pub field: Option<Vec<String>>,
    /// Human-readable message.
    pub message: String,
}

/// Turn a mutation payload's `userErrors` into a classified error.
///
/// An empty list means the mutation was applied.
pub(crate) fn check_user_errors(errors: Vec<UserError>) -> Result<(), ShopifyError> {
    if errors.is_empty() {
        return Ok(());
    }
    let joined = errors
        .iter()
        .map(|e| match &e.field {
            Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), e.message),
            _ => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(ShopifyError::UserError(joined))
}
