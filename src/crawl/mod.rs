//! Paginated metadata harvest from the catalog search API.
//!
//! The search endpoint is POSTed with a fixed visibility filter. Each
//! response carries one page of `items` and a `pageDetail.next` cursor URL;
//! the crawler follows cursors until none is left and returns every item
//! untouched, so the written file mirrors exactly what the API returned.

mod error;

use std::collections::HashSet;
use std::path::Path;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use error::CrawlError;

use crate::catalog::write_raw_records;
use crate::download::path::https_url;

/// Composite search endpoint of the public catalog.
pub const DEFAULT_ENDPOINT: &str =
    "https://iris.fws.gov/APPS/ServCatServices/servcat/v4/rest/AdvancedSearch/Composite";

/// Records requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    page_detail: PageDetail,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageDetail {
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default)]
    next: Option<String>,
}

/// Follows search-result cursors and accumulates raw records.
#[derive(Debug, Clone)]
pub struct CatalogCrawler {
    client: Client,
    page_size: u32,
    upgrade_cursor_scheme: bool,
}

impl CatalogCrawler {
    /// Creates a crawler that requests `page_size` records per page.
    #[must_use]
    pub fn new(client: Client, page_size: u32) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
            upgrade_cursor_scheme: true,
        }
    }

    /// Controls whether `http://` cursors are rewritten to `https://` (on by default).
    #[must_use]
    pub fn with_cursor_upgrade(mut self, upgrade: bool) -> Self {
        self.upgrade_cursor_scheme = upgrade;
        self
    }

    /// Harvests every page starting at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] if any page request fails or a page cannot be decoded.
    #[instrument(skip(self), fields(page_size = self.page_size))]
    pub async fn crawl(&self, endpoint: &str) -> Result<Vec<Value>, CrawlError> {
        let mut url = self.first_page_url(endpoint)?;
        let mut visited = HashSet::new();
        let mut items = Vec::new();
        let mut page_number = 1u32;

        loop {
            info!(page = page_number, url = %url, "fetching page");
            visited.insert(url.clone());
            let page = self.fetch_page(&url).await?;

            if page_number == 1
                && let Some(total) = page.page_detail.total_count
            {
                info!(total, "catalog reports total records");
            }
            info!(page = page_number, items = page.items.len(), "page received");
            items.extend(page.items);

            let Some(next) = self.next_cursor(page.page_detail.next) else {
                break;
            };
            if visited.contains(&next) {
                warn!(url = %next, "cursor points to an already fetched page, stopping");
                break;
            }
            url = next;
            page_number += 1;
        }

        info!(total = items.len(), pages = page_number, "crawl complete");
        Ok(items)
    }

    /// Harvests every page and writes the records to `output`.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] if crawling or writing fails.
    pub async fn crawl_to_file(&self, endpoint: &str, output: &Path) -> Result<usize, CrawlError> {
        let items = self.crawl(endpoint).await?;
        write_raw_records(output, &items).await?;
        info!(path = %output.display(), records = items.len(), "catalog written");
        Ok(items.len())
    }

    fn first_page_url(&self, endpoint: &str) -> Result<String, CrawlError> {
        let mut url = Url::parse(endpoint).map_err(|_| CrawlError::InvalidUrl {
            url: endpoint.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("top", &self.page_size.to_string())
            .append_pair("page", "1");
        Ok(url.into())
    }

    fn next_cursor(&self, next: Option<String>) -> Option<String> {
        let next = next.filter(|n| !n.trim().is_empty())?;
        if self.upgrade_cursor_scheme {
            Some(https_url(&next))
        } else {
            Some(next)
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<SearchPage, CrawlError> {
        let response = self
            .client
            .post(url)
            .json(&json!({ "visibility": "public" }))
            .send()
            .await
            .map_err(|source| CrawlError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| CrawlError::Network {
            url: url.to_string(),
            source,
        })?;
        debug!(bytes = body.len(), "page body read");

        serde_json::from_slice(&body).map_err(|source| CrawlError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
