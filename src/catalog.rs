//! Replacement catalog
//!
//! Maps texture record names to replacement image paths. Two tiers feed it:
//! - Explicit: a fixed name -> file table resolved against the frame directory
//! - Directory scan: every image file in the mask directory, keyed by file stem
//!
//! Explicit entries always win over scanned ones. The catalog is built once
//! per run and never changes afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};

/// Image extensions picked up by the directory scan (compared case-insensitively)
pub const SCAN_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tga"];

/// Which source produced a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogTier {
    Explicit,
    DirectoryScan,
}

/// Resolved replacement for one texture name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub path: PathBuf,
    pub tier: CatalogTier,
}

/// Immutable name -> replacement lookup
#[derive(Debug, Clone, Default)]
pub struct ReplacementCatalog {
    explicit: HashMap<String, PathBuf>,
    scanned: HashMap<String, PathBuf>,
}

impl ReplacementCatalog {
    /// Build the catalog
    ///
    /// # Arguments
    /// * `explicit_table` - texture name -> file name, resolved against `frame_dir`
    /// * `frame_dir` - directory holding the explicit tier's files
    /// * `mask_dir` - optional directory to scan; skipped when it does not exist
    pub fn build(
        explicit_table: &BTreeMap<String, String>,
        frame_dir: &Path,
        mask_dir: Option<&Path>,
    ) -> io::Result<Self> {
        let explicit = explicit_table
            .iter()
            .map(|(name, file)| (name.clone(), frame_dir.join(file)))
            .collect();

        let scanned = match mask_dir {
            Some(dir) if dir.is_dir() => scan_directory(dir)?,
            Some(dir) => {
                tracing::debug!("Mask directory {:?} not found, skipping scan", dir);
                HashMap::new()
            }
            None => HashMap::new(),
        };

        let catalog = Self { explicit, scanned };
        tracing::info!(
            "Replacement catalog: {} explicit, {} scanned",
            catalog.explicit.len(),
            catalog.scanned.len()
        );
        Ok(catalog)
    }

    /// Look up `name`; explicit entries take precedence
    pub fn resolve(&self, name: &str) -> Option<CatalogEntry> {
        if let Some(path) = self.explicit.get(name) {
            return Some(CatalogEntry {
                path: path.clone(),
                tier: CatalogTier::Explicit,
            });
        }
        self.scanned.get(name).map(|path| CatalogEntry {
            path: path.clone(),
            tier: CatalogTier::DirectoryScan,
        })
    }

    /// Number of distinct names across both tiers
    pub fn len(&self) -> usize {
        self.explicit.len()
            + self
                .scanned
                .keys()
                .filter(|name| !self.explicit.contains_key(*name))
                .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn has_scan_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SCAN_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Non-recursive scan; files are visited in file name order so when two
/// files share a stem the lexicographically last one wins
fn scan_directory(dir: &Path) -> io::Result<HashMap<String, PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_scan_extension(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut scanned = HashMap::with_capacity(files.len());
    for path in files {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            tracing::warn!("Skipping mask file with non UTF-8 name: {:?}", path);
            continue;
        };
        if let Some(previous) = scanned.insert(stem.to_string(), path.clone()) {
            tracing::debug!("Mask file {:?} replaces {:?}", path, previous);
        }
    }

    Ok(scanned)
}
