//! Record and pixel format types shared by container backends

use serde::{Deserialize, Serialize};

use super::error::ContainerError;
use super::texture::TextureHeader;

/// Declared type tag of a record (Unity class id numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassId(pub i32);

impl ClassId {
    pub const TEXTURE_2D: ClassId = ClassId(28);
    pub const TEXT_ASSET: ClassId = ClassId(49);
    pub const SPRITE: ClassId = ClassId(213);

    pub fn is_texture(self) -> bool {
        self == Self::TEXTURE_2D
    }
}

/// Texture pixel formats
///
/// Numbering follows Unity's `TextureFormat`. Formats the patcher never
/// writes are kept as `Other` so their records survive untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    Alpha8,
    Rgb24,
    Rgba32,
    Argb32,
    Bgra32,
    Other(i32),
}

impl TextureFormat {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Self::Alpha8,
            3 => Self::Rgb24,
            4 => Self::Rgba32,
            5 => Self::Argb32,
            14 => Self::Bgra32,
            other => Self::Other(other),
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            Self::Alpha8 => 1,
            Self::Rgb24 => 3,
            Self::Rgba32 => 4,
            Self::Argb32 => 5,
            Self::Bgra32 => 14,
            Self::Other(raw) => raw,
        }
    }

    /// Bytes per pixel for uncompressed formats, `None` otherwise
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            Self::Alpha8 => Some(1),
            Self::Rgb24 => Some(3),
            Self::Rgba32 | Self::Argb32 | Self::Bgra32 => Some(4),
            Self::Other(_) => None,
        }
    }

    /// Expected payload length for a `width` x `height` image
    pub fn payload_len(self, width: u32, height: u32) -> Option<usize> {
        let bpp = self.bytes_per_pixel()?;
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(bpp)
    }
}

/// One typed entry of a container
///
/// The payload stays opaque until a typed view is requested, so records the
/// patcher never touches are re-emitted exactly as they were read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub path_id: i64,
    pub class_id: ClassId,
    pub payload: Vec<u8>,
}

impl Record {
    pub fn new(path_id: i64, class_id: ClassId, payload: Vec<u8>) -> Self {
        Self {
            path_id,
            class_id,
            payload,
        }
    }

    /// Parse the payload as a texture record
    pub fn texture(&self) -> Result<TextureHeader, ContainerError> {
        if !self.class_id.is_texture() {
            return Err(ContainerError::MalformedTexture(format!(
                "record {} has class {}",
                self.path_id, self.class_id.0
            )));
        }
        TextureHeader::parse(&self.payload)
    }
}

/// New field values for a texture record
#[derive(Debug, Clone)]
pub struct TextureUpdate {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub pixels: Vec<u8>,
}
