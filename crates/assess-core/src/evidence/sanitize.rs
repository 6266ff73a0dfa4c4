use chrono::{DateTime, Utc};

use super::store::EvidenceOwner;

fn sanitize_fragment(raw: &str) -> String {
    let mut sanitized = String::with_capacity(raw.len());
    let mut last_was_underscore = false;

    for c in raw.chars() {
        let mapped = if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') {
            c
        } else {
            '_'
        };
        if mapped == '_' {
            if last_was_underscore {
                continue;
            }
            last_was_underscore = true;
        } else {
            last_was_underscore = false;
        }
        sanitized.push(mapped);
    }

    sanitized.trim_matches('_').to_string()
}

/// Rewrite an uploaded file name into a storage-safe form: characters
/// outside alphanumeric/underscore/hyphen/dot become underscores, runs of
/// underscores collapse, and the original extension survives untouched.
pub fn sanitize_file_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let (stem, extension) = match trimmed.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (trimmed, None),
    };

    let mut stem = sanitize_fragment(stem);
    if stem.is_empty() {
        stem = "file".to_string();
    }

    match extension.map(|ext| sanitize_fragment(ext)) {
        Some(ext) if !ext.is_empty() => format!("{stem}.{ext}"),
        _ => stem,
    }
}

/// Extension of a sanitized name, if any.
pub fn extension_of(file_name: &str) -> Option<&str> {
    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension)
}

/// Storage path convention: `{assessment}/{item}/{timestamp}_{sanitized}`.
pub fn blob_path(owner: &EvidenceOwner, uploaded_at: DateTime<Utc>, file_name: &str) -> String {
    format!(
        "{}/{}/{}_{}",
        owner.assessment.0,
        owner.item,
        uploaded_at.timestamp(),
        sanitize_file_name(file_name)
    )
}
