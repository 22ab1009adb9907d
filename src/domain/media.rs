//! Media file naming: sanitization, safe joins and default names

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Local};

use crate::domain::error::PathError;

/// Extensions accepted for still images; the first one is the default
pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Longest accepted file name, in bytes
pub const MAX_NAME_LEN: usize = 200;

/// Replace every character outside `[A-Za-z0-9._-]` with `_`
fn replace_unsafe_chars(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Split off a trailing extension like `.mp4`; dot-only prefixes are not stems
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && stem.chars().any(|c| c != '.') =>
        {
            (stem, Some(ext))
        }
        _ => (name, None),
    }
}

fn check_stem(original: &str, stem: &str) -> Result<(), PathError> {
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        return Err(PathError::InvalidName(original.to_string()));
    }
    if stem.len() > MAX_NAME_LEN {
        return Err(PathError::TooLong(stem.len()));
    }
    Ok(())
}

/// Sanitize a recording basename. Any extension is dropped because the
/// backend decides the container.
pub fn sanitize_basename(name: &str) -> Result<String, PathError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PathError::Empty);
    }
    let safe = replace_unsafe_chars(trimmed);
    let (stem, _) = split_extension(&safe);
    check_stem(name, stem)?;
    Ok(stem.to_string())
}

/// Sanitize a photo file name, keeping an allowed image extension or
/// substituting `.jpg`
pub fn sanitize_photo_name(name: &str) -> Result<String, PathError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PathError::Empty);
    }
    let safe = replace_unsafe_chars(trimmed);
    let (stem, ext) = split_extension(&safe);
    check_stem(name, stem)?;

    let ext = ext
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| PHOTO_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or_else(|| PHOTO_EXTENSIONS[0].to_string());

    Ok(format!("{}.{}", stem, ext))
}

/// Join a relative name onto a media root, refusing anything that could
/// resolve outside of it
pub fn secure_join(root: &Path, name: &str) -> Result<PathBuf, PathError> {
    if name.trim().is_empty() {
        return Err(PathError::Empty);
    }

    let mut joined = root.to_path_buf();
    let mut pushed = false;
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => {
                joined.push(part);
                pushed = true;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(PathError::Traversal(name.to_string()));
            }
        }
    }

    if !pushed || !joined.starts_with(root) {
        return Err(PathError::Traversal(name.to_string()));
    }
    Ok(joined)
}

/// `<prefix>_YYYYmmdd_HHMMSS`
pub fn timestamped_basename(prefix: &str, now: DateTime<Local>) -> String {
    format!("{}_{}", prefix, now.format("%Y%m%d_%H%M%S"))
}
