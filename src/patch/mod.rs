//! Patch orchestrator
//!
//! Drives one run over one container:
//!
//! ```text
//! Idle -> Loaded -> Scanning -> Finalized -> BackedUpAndCommitted | SavedAsCopy
//!                            \-> Aborted (nothing replaced)
//! ```
//!
//! Load, serialize, backup and write failures end the run. Failures while
//! replacing a single texture are recorded in the [`PatchReport`] and the
//! scan moves on to the next record.
//!
//! # Example
//!
//! ```ignore
//! let catalog = build_catalog(&config)?;
//! let mut patcher = TexturePatcher::load(&path, TextureMatcher::default())?;
//! patcher.scan(&catalog)?;
//! let outcome = patcher.finish(CommitMode::BackupAndCommit)?;
//! ```

pub mod paths;
mod report;

pub use paths::{backup_path, modified_path, resolve_container_path};
pub use report::{PatchReport, RecordOutcome, RecordStatus};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::catalog::{CatalogTier, ReplacementCatalog};
use crate::codec;
use crate::config::PatchConfig;
use crate::container::{
    load_container, AssetContainer, RecordBundle, TextureFormat, TextureUpdate,
};
use crate::error::{PatchError, RecordError};
use crate::matcher::{ReplacementDecision, TextureMatcher};

/// Pixel format written into replaced records
pub const TARGET_FORMAT: TextureFormat = TextureFormat::Rgba32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatchState {
    Idle,
    Loaded,
    Scanning,
    Finalized,
    BackedUpAndCommitted,
    SavedAsCopy,
    Aborted,
}

/// How the patched container is written back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    /// Copy the original to a timestamped backup, then overwrite it
    BackupAndCommit,
    /// Write a `_modified` sibling; the original is never touched
    SaveAsCopy,
}

/// Final result of a run
#[derive(Debug, Clone)]
pub enum PatchOutcome {
    /// No texture was replaced, nothing was written
    NothingToDo { report: PatchReport },
    Committed {
        report: PatchReport,
        backup_path: PathBuf,
        output_path: PathBuf,
        serialized: Vec<u8>,
    },
    SavedAsCopy {
        report: PatchReport,
        output_path: PathBuf,
        serialized: Vec<u8>,
    },
}

impl PatchOutcome {
    pub fn report(&self) -> &PatchReport {
        match self {
            Self::NothingToDo { report }
            | Self::Committed { report, .. }
            | Self::SavedAsCopy { report, .. } => report,
        }
    }

    /// Terminal state reached by the run
    pub fn state(&self) -> PatchState {
        match self {
            Self::NothingToDo { .. } => PatchState::Aborted,
            Self::Committed { .. } => PatchState::BackedUpAndCommitted,
            Self::SavedAsCopy { .. } => PatchState::SavedAsCopy,
        }
    }
}

/// Dry-run view of one target texture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedReplacement {
    pub index: usize,
    pub path_id: i64,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub decision: ReplacementDecision,
}

struct AppliedReplacement {
    width: u32,
    height: u32,
    source_sha256: String,
}

/// Build the catalog described by `config`
pub fn build_catalog(config: &PatchConfig) -> Result<ReplacementCatalog, PatchError> {
    ReplacementCatalog::build(
        &config.explicit_table,
        &config.frame_dir,
        config.mask_dir.as_deref(),
    )
    .map_err(PatchError::Catalog)
}

/// One patch run over one container
pub struct TexturePatcher<C = RecordBundle> {
    source: PathBuf,
    container: C,
    matcher: TextureMatcher,
    state: PatchState,
    report: PatchReport,
}

impl TexturePatcher<RecordBundle> {
    /// Load the container at `path`
    pub fn load(path: &Path, matcher: TextureMatcher) -> Result<Self, PatchError> {
        let container = load_container(path).map_err(|e| {
            tracing::warn!("Run aborted: {}", e);
            PatchError::Load(e)
        })?;
        Ok(Self::with_container(path, container, matcher))
    }
}

impl<C: AssetContainer> TexturePatcher<C> {
    /// Wrap an already loaded container read from `source`
    pub fn with_container(
        source: impl Into<PathBuf>,
        container: C,
        matcher: TextureMatcher,
    ) -> Self {
        Self {
            source: source.into(),
            container,
            matcher,
            state: PatchState::Loaded,
            report: PatchReport::default(),
        }
    }

    pub fn state(&self) -> PatchState {
        self.state
    }

    pub fn report(&self) -> &PatchReport {
        &self.report
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Decisions for every target texture without touching the container
    pub fn plan(&self, catalog: &ReplacementCatalog) -> Vec<PlannedReplacement> {
        self.container
            .records()
            .filter_map(|(index, record)| {
                let texture = self.matcher.target(record)?;
                let decision = self.matcher.resolve(&texture, catalog);
                Some(PlannedReplacement {
                    index,
                    path_id: record.path_id,
                    name: texture.name,
                    width: texture.width,
                    height: texture.height,
                    format: texture.format,
                    decision,
                })
            })
            .collect()
    }

    /// Replace every target texture that has a catalog entry
    pub fn scan(&mut self, catalog: &ReplacementCatalog) -> Result<&PatchReport, PatchError> {
        self.scan_with(catalog, |_| {})
    }

    /// Like [`scan`](Self::scan), calling `on_record` after each target texture
    pub fn scan_with<F>(
        &mut self,
        catalog: &ReplacementCatalog,
        mut on_record: F,
    ) -> Result<&PatchReport, PatchError>
    where
        F: FnMut(&RecordOutcome),
    {
        if self.state != PatchState::Loaded {
            return Err(PatchError::InvalidState(format!(
                "scan requires a freshly loaded container, state is {:?}",
                self.state
            )));
        }
        self.state = PatchState::Scanning;

        for index in 0..self.container.len() {
            let Some(record) = self.container.record(index) else {
                break;
            };
            let Some(texture) = self.matcher.target(record) else {
                continue;
            };
            let path_id = record.path_id;
            tracing::info!("Found matching asset: {}", texture.name);

            let status = match self.matcher.resolve(&texture, catalog) {
                ReplacementDecision::NoCatalogEntry => {
                    tracing::debug!("No replacement defined for: {}", texture.name);
                    RecordStatus::NoCatalogEntry
                }
                ReplacementDecision::CatalogEntryMissingFile { path, .. } => {
                    tracing::warn!("{}", RecordError::CatalogPathMissing(path.clone()));
                    RecordStatus::MissingFile { path }
                }
                ReplacementDecision::Ready { path, tier } => {
                    self.replace(index, &texture.name, path, tier)
                }
            };

            let outcome = RecordOutcome {
                index,
                path_id,
                name: texture.name,
                status,
            };
            on_record(&outcome);
            self.report.push(outcome);
        }

        self.state = if self.report.replaced_count == 0 {
            tracing::info!("No assets were replaced");
            PatchState::Aborted
        } else {
            tracing::info!("Replaced {} assets", self.report.replaced_count);
            PatchState::Finalized
        };
        Ok(&self.report)
    }

    fn replace(
        &mut self,
        index: usize,
        name: &str,
        path: PathBuf,
        tier: CatalogTier,
    ) -> RecordStatus {
        tracing::info!("Replacing {} with {:?}", name, path);
        match self.apply_replacement(index, &path) {
            Ok(applied) => {
                tracing::info!(
                    "Successfully replaced {} ({}x{})",
                    name,
                    applied.width,
                    applied.height
                );
                RecordStatus::Replaced {
                    source: path,
                    tier,
                    width: applied.width,
                    height: applied.height,
                    source_sha256: applied.source_sha256,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to replace {}: {}", name, e);
                RecordStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    fn apply_replacement(
        &mut self,
        index: usize,
        path: &Path,
    ) -> Result<AppliedReplacement, RecordError> {
        let bytes = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                RecordError::CatalogPathMissing(path.to_path_buf())
            } else {
                RecordError::ReadReplacement {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let bitmap = codec::decode(&bytes).map_err(RecordError::Decode)?;
        let encoded = codec::encode(&bitmap, TARGET_FORMAT).map_err(RecordError::Encode)?;
        let (width, height) = (encoded.width, encoded.height);

        // Record dimensions follow the replacement image, not the original texture
        self.container
            .replace_texture(
                index,
                TextureUpdate {
                    width,
                    height,
                    format: encoded.format,
                    pixels: encoded.pixels,
                },
            )
            .map_err(RecordError::Mutation)?;

        Ok(AppliedReplacement {
            width,
            height,
            source_sha256: hex::encode(Sha256::digest(&bytes)),
        })
    }

    /// Write the result back, timestamping any backup with the local time
    pub fn finish(self, mode: CommitMode) -> Result<PatchOutcome, PatchError> {
        self.finish_at(mode, Local::now().naive_local())
    }

    /// Write the result back using `timestamp` for the backup name
    pub fn finish_at(
        self,
        mode: CommitMode,
        timestamp: NaiveDateTime,
    ) -> Result<PatchOutcome, PatchError> {
        match self.state {
            PatchState::Aborted => {
                return Ok(PatchOutcome::NothingToDo {
                    report: self.report,
                })
            }
            PatchState::Finalized => {}
            other => {
                return Err(PatchError::InvalidState(format!(
                    "cannot write back from state {:?}",
                    other
                )))
            }
        }

        let serialized = self.container.serialize().map_err(PatchError::Serialize)?;
        let Self { source, report, .. } = self;

        match mode {
            CommitMode::BackupAndCommit => {
                let backup_path = create_backup(&source, timestamp)?;
                tracing::info!("Replacing original file with modified version");
                write_output(&source, &serialized)?;
                tracing::info!(
                    "Original file updated: {:?}, backup saved as {:?}",
                    source,
                    backup_path
                );
                Ok(PatchOutcome::Committed {
                    report,
                    backup_path,
                    output_path: source,
                    serialized,
                })
            }
            CommitMode::SaveAsCopy => {
                let output_path = modified_path(&source);
                write_output(&output_path, &serialized)?;
                tracing::info!("Modified file saved as: {:?}", output_path);
                Ok(PatchOutcome::SavedAsCopy {
                    report,
                    output_path,
                    serialized,
                })
            }
        }
    }
}

/// Copy `original` next to itself; an existing backup is never overwritten
fn create_backup(original: &Path, timestamp: NaiveDateTime) -> Result<PathBuf, PatchError> {
    let path = backup_path(original, timestamp);
    let backup_error = |source| PatchError::Backup {
        path: path.clone(),
        source,
    };

    let mut reader = File::open(original).map_err(backup_error)?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(backup_error)?;
    if let Err(e) = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all()) {
        drop(writer);
        // The partial copy was created by this call
        if let Err(cleanup) = std::fs::remove_file(&path) {
            tracing::warn!("Failed to remove partial backup {:?}: {}", path, cleanup);
        }
        return Err(backup_error(e));
    }

    tracing::info!("Backup created: {:?}", path);
    Ok(path)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), PatchError> {
    std::fs::write(path, bytes).map_err(|source| PatchError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve `input`, build the catalog, scan, and write back with `mode`
pub fn run_patch(
    input: &Path,
    config: &PatchConfig,
    mode: CommitMode,
) -> Result<PatchOutcome, PatchError> {
    let path = resolve_container_path(input, config.container_relative_path.as_deref())?;
    let catalog = build_catalog(config)?;
    let mut patcher = TexturePatcher::load(&path, TextureMatcher::new(config.name_filter.clone()))?;
    patcher.scan(&catalog)?;
    patcher.finish(mode)
}

#[cfg(test)]
mod tests;
