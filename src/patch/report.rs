//! Per-run replacement report

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::CatalogTier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum RecordStatus {
    /// Skipped: no replacement defined for the name
    NoCatalogEntry,
    /// Skipped: the catalog names a file that does not exist
    MissingFile {
        path: PathBuf,
    },
    Replaced {
        source: PathBuf,
        tier: CatalogTier,
        width: u32,
        height: u32,
        /// SHA-256 of the replacement file
        source_sha256: String,
    },
    Failed {
        error: String,
    },
}

/// Result for one target texture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    /// Position in container order
    pub index: usize,
    pub path_id: i64,
    pub name: String,
    pub status: RecordStatus,
}

/// Accumulated result of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchReport {
    pub replaced_count: usize,
    pub outcomes: Vec<RecordOutcome>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl PatchReport {
    /// Add an outcome, updating the count and message lists
    pub fn push(&mut self, outcome: RecordOutcome) {
        match &outcome.status {
            RecordStatus::Replaced { .. } => self.replaced_count += 1,
            RecordStatus::MissingFile { path } => self
                .warnings
                .push(format!("Replacement file not found: {}", path.display())),
            RecordStatus::NoCatalogEntry => {}
            RecordStatus::Failed { error } => {
                self.errors.push(format!("{}: {}", outcome.name, error))
            }
        }
        self.outcomes.push(outcome);
    }

    /// All outcomes for textures called `name`; container names need not be unique
    pub fn outcomes_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RecordOutcome> {
        self.outcomes.iter().filter(move |o| o.name == name)
    }
}
