//! Texture object matcher
//!
//! Decides which container records are texture replacement targets and which
//! catalog entry, if any, applies to each of them.

use serde::Serialize;
use std::path::PathBuf;

use crate::catalog::{CatalogTier, ReplacementCatalog};
use crate::container::{Record, TextureHeader};

/// Outcome of looking a texture up in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ReplacementDecision {
    /// Name is in neither tier
    NoCatalogEntry,
    /// Catalog names a file that is not on disk
    CatalogEntryMissingFile { path: PathBuf, tier: CatalogTier },
    /// Replacement file exists and can be applied
    Ready { path: PathBuf, tier: CatalogTier },
}

/// Texture view of a record, if the record has a usable texture shape
///
/// This is the one place record fields are validated: the class tag must be
/// a texture, the payload must parse, and the name must be non-empty.
pub fn eligible_texture(record: &Record) -> Option<TextureHeader> {
    if !record.class_id.is_texture() {
        return None;
    }
    match record.texture() {
        Ok(texture) if !texture.name.is_empty() => Some(texture),
        Ok(_) => {
            tracing::debug!("Texture record {} has no name", record.path_id);
            None
        }
        Err(e) => {
            tracing::debug!("Texture record {} is malformed: {}", record.path_id, e);
            None
        }
    }
}

pub fn is_eligible(record: &Record) -> bool {
    eligible_texture(record).is_some()
}

/// Matches texture records against a catalog
#[derive(Debug, Clone, Default)]
pub struct TextureMatcher {
    name_filter: Option<String>,
}

impl TextureMatcher {
    pub fn new(name_filter: Option<String>) -> Self {
        Self {
            name_filter: name_filter.filter(|f| !f.is_empty()),
        }
    }

    /// Eligible texture that also passes the optional name filter
    pub fn target(&self, record: &Record) -> Option<TextureHeader> {
        let texture = eligible_texture(record)?;
        match &self.name_filter {
            Some(filter) if !texture.name.contains(filter.as_str()) => None,
            _ => Some(texture),
        }
    }

    /// Exact-name lookup; a hit is only `Ready` when the file exists
    pub fn resolve(
        &self,
        texture: &TextureHeader,
        catalog: &ReplacementCatalog,
    ) -> ReplacementDecision {
        match catalog.resolve(&texture.name) {
            None => ReplacementDecision::NoCatalogEntry,
            Some(entry) if entry.path.is_file() => ReplacementDecision::Ready {
                path: entry.path,
                tier: entry.tier,
            },
            Some(entry) => ReplacementDecision::CatalogEntryMissingFile {
                path: entry.path,
                tier: entry.tier,
            },
        }
    }
}
