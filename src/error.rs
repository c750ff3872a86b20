use std::path::PathBuf;
use thiserror::Error;

use crate::codec::CodecError;
use crate::container::ContainerError;

/// Errors that end a patch run
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("Failed to load container: {0}")]
    Load(#[source] ContainerError),

    #[error("Failed to build replacement catalog: {0}")]
    Catalog(#[source] std::io::Error),

    #[error("Failed to serialize container: {0}")]
    Serialize(#[source] ContainerError),

    #[error("Failed to create backup {path:?}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<PatchError> for String {
    fn from(err: PatchError) -> Self {
        err.to_string()
    }
}

/// Failure confined to a single record; the pass continues
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Replacement file not found: {0:?}")]
    CatalogPathMissing(PathBuf),

    #[error("Failed to read replacement {path:?}: {source}")]
    ReadReplacement {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode replacement: {0}")]
    Decode(#[source] CodecError),

    #[error("Failed to encode texture: {0}")]
    Encode(#[source] CodecError),

    #[error("Failed to update record: {0}")]
    Mutation(#[source] ContainerError),
}
