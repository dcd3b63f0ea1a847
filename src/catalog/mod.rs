//! Catalog record model shared by the crawler, downloader and renderer.
//!
//! Records come from a paginated search API that is loose about types: ids
//! may be numbers or strings, sizes may be missing, `null`, zero or quoted,
//! and some records omit `linkedResources` entirely. Decoding here is
//! therefore lenient field by field, and a record that still fails to decode
//! is logged and skipped rather than failing the whole file.

mod error;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, warn};

pub use error::CatalogError;

/// Identifier of a record within its reference type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceId {
    /// Numeric id, as most records carry.
    Integer(i64),
    /// Textual id.
    Text(String),
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for ReferenceId {
    fn from(id: i64) -> Self {
        Self::Integer(id)
    }
}

impl From<&str> for ReferenceId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

/// One metadata entry from the catalog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    /// Reference type, e.g. `"Published Report"`.
    #[serde(default, deserialize_with = "lenient_text")]
    pub reference_type: Option<String>,
    /// Record id within the reference type.
    #[serde(default, deserialize_with = "lenient_reference_id")]
    pub reference_id: Option<ReferenceId>,
    /// Display title.
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    /// Abstract text.
    #[serde(default, rename = "abstract", deserialize_with = "lenient_text")]
    pub abstract_text: Option<String>,
    /// Publication date as supplied by the API.
    #[serde(default, deserialize_with = "lenient_text")]
    pub publication_date: Option<String>,
    /// Attachments in catalog order. Absent or `null` decodes as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub linked_resources: Vec<AttachmentRef>,
}

/// A file (or web-service pointer) attached to a record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    /// Resource type, e.g. `"Digital Document"` or `"Web Service"`.
    #[serde(default, deserialize_with = "lenient_text")]
    pub resource_type: Option<String>,
    /// File name the attachment is stored under.
    #[serde(default, deserialize_with = "lenient_text")]
    pub file_name: Option<String>,
    /// Declared size in bytes. Unreliable upstream; `None` when unusable.
    #[serde(default, deserialize_with = "lenient_size")]
    pub file_size: Option<u64>,
    /// Download URL as supplied (may still be `http://`).
    #[serde(default, deserialize_with = "lenient_text")]
    pub url: Option<String>,
}

impl AttachmentRef {
    /// Declared size with missing values normalized to zero.
    #[must_use]
    pub fn declared_size(&self) -> u64 {
        self.file_size.unwrap_or(0)
    }

    /// Resource type, or the empty string when absent.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        self.resource_type.as_deref().unwrap_or("")
    }
}

/// Reads a declared byte size out of an arbitrary JSON value.
///
/// Integers are taken as-is, non-negative floats are truncated and numeric
/// strings are parsed. Everything else yields `None`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn declared_size(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn lenient_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(declared_size(&Value::deserialize(deserializer)?))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Integers that fit `i64` stay numeric. Any other scalar keeps its JSON
/// spelling as text, so an odd id never costs the record.
fn lenient_reference_id<'de, D>(deserializer: D) -> Result<Option<ReferenceId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => Some(
            n.as_i64()
                .map_or_else(|| ReferenceId::Text(n.to_string()), ReferenceId::Integer),
        ),
        Value::String(s) => Some(ReferenceId::Text(s)),
        Value::Bool(b) => Some(ReferenceId::Text(b.to_string())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parses a JSON array of records.
///
/// Records that fail to decode are logged with their index and skipped.
///
/// # Errors
///
/// Returns [`CatalogError::Json`] for invalid JSON and
/// [`CatalogError::NotAnArray`] when the top level is not an array.
pub fn parse_records(raw: &str) -> Result<Vec<CatalogRecord>, CatalogError> {
    let document: Value =
        serde_json::from_str(raw).map_err(|source| CatalogError::Json { source })?;
    let Value::Array(items) = document else {
        return Err(CatalogError::NotAnArray {
            found: value_kind(&document),
        });
    };

    let total = items.len();
    let records: Vec<CatalogRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(index, error = %error, "skipping malformed catalog record");
                None
            }
        })
        .collect();

    debug!(total, decoded = records.len(), "parsed catalog records");
    Ok(records)
}

/// Loads and parses a record file.
///
/// # Errors
///
/// Returns [`CatalogError::Read`] if the file cannot be read, otherwise the
/// errors of [`parse_records`].
pub async fn load_records(path: &Path) -> Result<Vec<CatalogRecord>, CatalogError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_records(&raw)
}

/// Serializes raw records as a pretty-printed JSON array with 4-space indent.
///
/// # Errors
///
/// Returns [`CatalogError::Json`] if serialization fails.
pub fn to_pretty_json(items: &[Value]) -> Result<String, CatalogError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    items
        .serialize(&mut serializer)
        .map_err(|source| CatalogError::Json { source })?;
    // serde_json only ever emits UTF-8.
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Writes raw records verbatim to `path`.
///
/// # Errors
///
/// Returns [`CatalogError::Write`] if the file cannot be written.
pub async fn write_raw_records(path: &Path, items: &[Value]) -> Result<(), CatalogError> {
    let json = to_pretty_json(items)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| CatalogError::Write {
            path: path.to_path_buf(),
            source,
        })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
