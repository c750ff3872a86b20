//! Container error types

use std::io;
use thiserror::Error;

use super::types::TextureFormat;

/// Errors raised by the container adapter
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid container: {0}")]
    InvalidFile(String),

    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(u32),

    #[error("Unexpected end of data")]
    UnexpectedEof,

    #[error("Record {0} is out of range")]
    RecordOutOfRange(usize),

    #[error("Record {0} is not a texture")]
    NotATexture(usize),

    #[error("Malformed texture record: {0}")]
    MalformedTexture(String),

    #[error("Cannot store pixels in format {0:?}")]
    UnsupportedFormat(TextureFormat),

    #[error("Payload size mismatch: expected {expected} bytes, got {actual}")]
    PayloadSize { expected: usize, actual: usize },

    #[error("Field too large to serialize: {0}")]
    Overflow(String),
}

impl ContainerError {
    /// Map truncated reads onto `UnexpectedEof` so callers see one variant
    pub(crate) fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof
        } else {
            Self::Io(err)
        }
    }
}
