//! Input resolution and sibling file naming

use chrono::NaiveDateTime;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::PatchError;

/// Extensions the naming suffix is inserted in front of
pub const KNOWN_CONTAINER_EXTENSIONS: &[&str] = &["unity3d", "bundle", "assets"];

pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub const MODIFIED_SUFFIX: &str = "_modified";

/// `name.ext` -> `name{suffix}.ext` for known extensions, else `name{suffix}`
fn with_suffix(original: &Path, suffix: &str) -> PathBuf {
    let known_ext = original.extension().filter(|ext| {
        ext.to_str()
            .map(|ext| {
                KNOWN_CONTAINER_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false)
    });

    let mut name = OsString::new();
    match (known_ext, original.file_stem()) {
        (Some(ext), Some(stem)) => {
            name.push(stem);
            name.push(suffix);
            name.push(".");
            name.push(ext);
        }
        _ => {
            name.push(original.file_name().unwrap_or_default());
            name.push(suffix);
        }
    }
    original.with_file_name(name)
}

/// `<original>_backup_<YYYYMMDD_HHMMSS>`
pub fn backup_path(original: &Path, timestamp: NaiveDateTime) -> PathBuf {
    let suffix = format!("_backup_{}", timestamp.format(BACKUP_TIMESTAMP_FORMAT));
    with_suffix(original, &suffix)
}

/// `<original>_modified`
pub fn modified_path(original: &Path) -> PathBuf {
    with_suffix(original, MODIFIED_SUFFIX)
}

/// Container file for `input`: the file itself, or `relative` below a root directory
pub fn resolve_container_path(
    input: &Path,
    relative: Option<&Path>,
) -> Result<PathBuf, PatchError> {
    if !input.is_dir() {
        return Ok(input.to_path_buf());
    }

    let relative = relative.ok_or_else(|| {
        PatchError::InvalidInput(format!(
            "{} is a directory but no container path inside it is configured",
            input.display()
        ))
    })?;
    let path = input.join(relative);
    if !path.is_file() {
        return Err(PatchError::InvalidInput(format!(
            "container not found at {}",
            path.display()
        )));
    }
    Ok(path)
}
