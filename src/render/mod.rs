//! Static HTML catalog page.
//!
//! The page is a single self-contained file: styles and the client-side
//! search script are inlined, one block per record, one nested block per
//! linked resource. Every interpolated value is escaped.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, instrument};

use crate::catalog::{AttachmentRef, CatalogError, CatalogRecord, load_records};
use crate::download::path::https_url;
use crate::size::humanize_bytes;

const PAGE_TITLE: &str = "US Fish and Wildlife Services ServCat References";
const CATALOG_HOME: &str = "https://iris.fws.gov/APPS/ServCat/";
const EDGI_HOME: &str = "https://envirodatagov.org/";
const PEDP_HOME: &str = "https://screening-tools.com";
const STYLE: &str = include_str!("style.css");
const SEARCH_SCRIPT: &str = include_str!("search.js");

/// Errors raised while producing the page.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Records could not be loaded.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The page could not be written.
    #[error("failed to write page to {path}: {source}")]
    Write {
        /// Output path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Escapes HTML special characters for safe interpolation into text and
/// double-quoted attributes.
#[must_use]
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Renders the full page for `records`, stamping `generated_on` in the footer.
#[must_use]
pub fn render_html(records: &[CatalogRecord], generated_on: NaiveDate) -> String {
    let mut page = String::with_capacity(4096 + records.len() * 1024);

    page.push_str("<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"UTF-8\">");
    page.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">",
    );
    page.push_str(&format!("<title>{PAGE_TITLE}</title>"));
    page.push_str(&format!("<style>\n{STYLE}</style>"));
    page.push_str(&format!("<script>\n{SEARCH_SCRIPT}</script>"));
    page.push_str("</head><body>");
    page.push_str(
        "<div id=\"pageLoadOverlay\" class=\"page-overlay\"><div class=\"page-spinner\"></div></div>",
    );
    page.push_str("<div class=\"container\">");
    page.push_str(&format!("<h1>{PAGE_TITLE}</h1>"));
    page.push_str(&format!(
        "<div class=\"made-by\"><p>Made with \u{2764}\u{fe0f} by <a href=\"{EDGI_HOME}\" class=\"source-link\">EDGI</a> \
         and <a href=\"{PEDP_HOME}\" class=\"source-link\">Public Environmental Data Partners</a>. \
         Providing data from <a href=\"{CATALOG_HOME}\" class=\"source-link\">ServCat</a>.</p></div>"
    ));
    page.push_str(concat!(
        "<div class=\"search-container\"><div class=\"search-bar\">",
        "<input type=\"text\" id=\"searchInput\" placeholder=\"Search catalog (exact match)...\"></div>",
        "<button class=\"button\" onclick=\"searchReferences()\">Search</button>",
        "<button class=\"button clear-button\" onclick=\"clearSearch()\">Clear</button>",
        "<div id=\"searchSpinner\" class=\"spinner\"></div>",
        "<div id=\"resultCount\"></div></div>",
    ));

    page.push_str("<div id=\"references-container\">");
    for record in records {
        render_record(&mut page, record);
    }
    page.push_str("</div>");

    page.push_str(&format!(
        "<div class=\"footer\"><p>Generated on {} | US Fish and Wildlife Services ServCat Data</p></div>",
        generated_on.format("%Y-%m-%d")
    ));
    page.push_str("</div></body></html>");
    page
}

fn render_record(page: &mut String, record: &CatalogRecord) {
    let title = html_escape(record.title.as_deref().unwrap_or("No title"));
    let reference_type = html_escape(record.reference_type.as_deref().unwrap_or("Unknown type"));
    let reference_id = record
        .reference_id
        .as_ref()
        .map_or_else(|| "Unknown ID".to_string(), |id| html_escape(&id.to_string()));
    let abstract_text = html_escape(
        record
            .abstract_text
            .as_deref()
            .unwrap_or("No abstract available"),
    );
    let publication_date = html_escape(record.publication_date.as_deref().unwrap_or("Unknown date"));

    page.push_str(&format!(
        "<div class=\"reference\" data-title=\"{title}\" data-type=\"{reference_type}\" data-abstract=\"{abstract_text}\">"
    ));
    page.push_str(&format!("<h2>{title}</h2><div class=\"reference-details\">"));
    page.push_str(&format!("<p><strong>Reference ID:</strong> {reference_id}</p>"));
    page.push_str(&format!("<p><strong>Type:</strong> {reference_type}</p>"));
    page.push_str(&format!("<p><strong>Publication Date:</strong> {publication_date}</p>"));
    page.push_str(&format!("<p><strong>Abstract:</strong> {abstract_text}</p></div>"));

    if !record.linked_resources.is_empty() {
        page.push_str("<div class=\"resources\"><h3>Linked Resources:</h3>");
        for resource in &record.linked_resources {
            render_resource(page, resource);
        }
        page.push_str("</div>");
    }
    page.push_str("</div>");
}

fn render_resource(page: &mut String, resource: &AttachmentRef) {
    let name = html_escape(resource.file_name.as_deref().unwrap_or("Unknown file"));
    let resource_type = html_escape(resource.resource_type.as_deref().unwrap_or("Unknown type"));
    let size = match resource.file_size {
        Some(bytes) if bytes > 0 => humanize_bytes(bytes),
        _ => "Unknown size".to_string(),
    };
    let href = resource
        .url
        .as_deref()
        .filter(|u| !u.is_empty())
        .map_or_else(|| "#".to_string(), |u| html_escape(&https_url(u)));

    page.push_str(&format!("<div class=\"resource\"><h3>{name}</h3>"));
    page.push_str(&format!("<p class=\"metadata\"><strong>Type:</strong> {resource_type}</p>"));
    page.push_str(&format!("<p class=\"metadata\"><strong>Size:</strong> {size}</p>"));
    page.push_str(&format!(
        "<a href=\"{href}\" class=\"resource-link\" target=\"_blank\">View Resource</a></div>"
    ));
}

/// Loads records from `input` and writes the page to `output`, dated today.
///
/// # Errors
///
/// Returns [`RenderError`] if the input cannot be loaded or the page cannot be written.
#[instrument(fields(input = %input.display(), output = %output.display()))]
pub async fn write_html(input: &Path, output: &Path) -> Result<usize, RenderError> {
    let records = load_records(input).await?;
    let page = render_html(&records, chrono::Local::now().date_naive());
    tokio::fs::write(output, page)
        .await
        .map_err(|source| RenderError::Write {
            path: output.to_path_buf(),
            source,
        })?;
    info!(records = records.len(), "page written");
    Ok(records.len())
}
