//! Error types for the catalog crawler.

use thiserror::Error;

use crate::catalog::CatalogError;

/// Errors that abort a crawl.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Network-level error talking to the search endpoint.
    #[error("network error requesting {url}: {source}")]
    Network {
        /// Page URL.
        url: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// Page URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Response body is not a search page.
    #[error("unexpected response body from {url}: {source}")]
    Decode {
        /// Page URL.
        url: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// Endpoint or cursor is not a valid URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The harvested records could not be written.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
