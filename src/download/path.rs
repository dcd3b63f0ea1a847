//! Deterministic on-disk layout for mirrored attachments.
//!
//! Layout: `base_dir/<reference type, spaces as underscores>/<reference id>/<file name>`.

use std::path::{Component, Path, PathBuf};

use super::policy::normalize_segment;
use crate::catalog::ReferenceId;

/// Returns the directory holding all attachments of one record.
#[must_use]
pub fn directory_for(base_dir: &Path, reference_type: &str, reference_id: &ReferenceId) -> PathBuf {
    base_dir
        .join(sanitize_segment(&normalize_segment(reference_type)))
        .join(sanitize_segment(&reference_id.to_string()))
}

/// Resolves the destination path of an attachment.
///
/// Returns `None` when the file name is missing or empty; callers skip such
/// attachments.
#[must_use]
pub fn resolve(
    base_dir: &Path,
    reference_type: &str,
    reference_id: &ReferenceId,
    file_name: Option<&str>,
) -> Option<PathBuf> {
    let file_name = file_name.filter(|name| !name.is_empty())?;
    Some(directory_for(base_dir, reference_type, reference_id).join(sanitize_segment(file_name)))
}

/// Rewrites a leading `http://` to `https://`. Other URLs pass through.
#[must_use]
pub fn https_url(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// Makes a value usable as exactly one path segment.
///
/// Separators and control characters become `_`, and a value that would
/// still be interpreted as `.`/`..` has its dots replaced as well.
fn sanitize_segment(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
