//! Cursor pagination over Admin API connections.
//!
//! Shopify connections return edges (`cursor` + `node`) plus a
//! `pageInfo.hasNextPage` flag. The walker below drives any such connection
//! to exhaustion: the next request's `after` variable is always the cursor
//! of the **last** edge of the page just fetched.
//!
//! Pagination is all-or-nothing per collection: no durable cursor checkpoint
//! is kept, so a failed page fails the whole walk rather than returning a
//! partial set that cannot be safely resumed.

use std::future::Future;

use serde::Deserialize;

use crate::ShopifyError;

/// The platform's practical maximum page size.
pub const PAGE_SIZE: u32 = 250;

/// One edge of a paginated connection.
#[derive(Debug, Clone)]
pub struct PageEdge<T> {
    /// Opaque cursor marking this edge's position.
    pub cursor: String,
    /// The item itself.
    pub node: T,
}

/// One page of a paginated connection.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Edges in this page, in connection order.
    pub edges: Vec<PageEdge<T>>,
    /// Whether the connection reports more pages after this one.
    pub has_next_page: bool,
}

/// Wire shape of a GraphQL connection, as the Admin API returns it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Connection<T> {
    pub page_info: PageInfo,
    pub edges: Vec<ConnectionEdge<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    pub has_next_page: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConnectionEdge<T> {
    pub cursor: String,
    pub node: T,
}

impl<T> From<Connection<T>> for Page<T> {
    fn from(connection: Connection<T>) -> Self {
        Self {
            edges: connection
                .edges
                .into_iter()
                .map(|edge| PageEdge {
                    cursor: edge.cursor,
                    node: edge.node,
                })
                .collect(),
            has_next_page: connection.page_info.has_next_page,
        }
    }
}

/// Walk a paginated connection to exhaustion, keeping nodes that satisfy
/// `matches`.
///
/// `fetch_page` is called with `None` first, then with the last edge's
/// cursor while `has_next_page` is true. The walk also stops on an empty
/// page even if the flag claims otherwise, so a misbehaving boundary page
/// cannot loop forever.
///
/// # Errors
///
/// Any page fetch error fails the entire walk; no partial result is
/// returned.
pub async fn fetch_all_matching<T, F, Fut, P>(
    mut fetch_page: F,
    mut matches: P,
) -> Result<Vec<T>, ShopifyError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, ShopifyError>>,
    P: FnMut(&T) -> bool,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = fetch_page(cursor.take()).await?;

        // Defensive stop: an empty page cannot advance the cursor.
        if page.edges.is_empty() {
            break;
        }

        let next_cursor = page.edges.last().map(|edge| edge.cursor.clone());
        let has_next_page = page.has_next_page;

        for edge in page.edges {
            if matches(&edge.node) {
                items.push(edge.node);
            }
        }

        if !has_next_page {
            break;
        }
        cursor = next_cursor;
    }

    Ok(items)
}

/// Walk a paginated connection to exhaustion, keeping every node.
///
/// # Errors
///
/// Any page fetch error fails the entire walk.
pub async fn fetch_all<T, F, Fut>(fetch_page: F) -> Result<Vec<T>, ShopifyError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, ShopifyError>>,
{
    fetch_all_matching(fetch_page, |_| true).await
}
