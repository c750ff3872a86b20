//! Texture record payload layout
//!
//! All values are Little-Endian.
//!
//! Structure:
//! - Name length: 4 bytes, followed by UTF-8 name bytes, zero-padded to 4-byte alignment
//! - Width: 4 bytes (i32, must be >= 0)
//! - Height: 4 bytes (i32, must be >= 0)
//! - Complete image size: 4 bytes
//! - Texture format: 4 bytes (Unity numbering)
//! - Mip count: 4 bytes
//! - Image data length: 4 bytes, followed by the image data
//! - Remaining bytes: texture settings the patcher does not interpret, kept verbatim

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

use super::error::ContainerError;
use super::types::{TextureFormat, TextureUpdate};

/// Parsed view of a texture record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureHeader {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub complete_image_size: u32,
    pub format: TextureFormat,
    pub mip_count: i32,
    pub image_data: Vec<u8>,
    pub trailing: Vec<u8>,
}

fn aligned_len(len: usize) -> usize {
    (len + 3) & !3
}

fn read_dimension(cursor: &mut Cursor<&[u8]>, field: &str) -> Result<u32, ContainerError> {
    let value = cursor
        .read_i32::<LittleEndian>()
        .map_err(ContainerError::from_read)?;
    u32::try_from(value)
        .map_err(|_| ContainerError::MalformedTexture(format!("negative {}: {}", field, value)))
}

fn to_u32(value: usize, field: &str) -> Result<u32, ContainerError> {
    u32::try_from(value).map_err(|_| ContainerError::Overflow(field.to_string()))
}

impl TextureHeader {
    /// Parse a texture payload
    pub fn parse(payload: &[u8]) -> Result<Self, ContainerError> {
        let mut cursor = Cursor::new(payload);

        let name_len = cursor
            .read_u32::<LittleEndian>()
            .map_err(ContainerError::from_read)? as usize;
        // 4 bytes of length prefix keep the alignment math relative to the payload start
        let padded = aligned_len(name_len);
        if payload.len() < 4 + padded {
            return Err(ContainerError::UnexpectedEof);
        }
        let mut name_bytes = vec![0u8; padded];
        cursor
            .read_exact(&mut name_bytes)
            .map_err(ContainerError::from_read)?;
        name_bytes.truncate(name_len);
        let name = String::from_utf8(name_bytes)
            .map_err(|e| ContainerError::MalformedTexture(format!("name is not UTF-8: {}", e)))?;

        let width = read_dimension(&mut cursor, "width")?;
        let height = read_dimension(&mut cursor, "height")?;
        let complete_image_size = cursor
            .read_u32::<LittleEndian>()
            .map_err(ContainerError::from_read)?;
        let format = TextureFormat::from_raw(
            cursor
                .read_i32::<LittleEndian>()
                .map_err(ContainerError::from_read)?,
        );
        let mip_count = cursor
            .read_i32::<LittleEndian>()
            .map_err(ContainerError::from_read)?;

        let data_len = cursor
            .read_u32::<LittleEndian>()
            .map_err(ContainerError::from_read)? as usize;
        let start = cursor.position() as usize;
        let end = start
            .checked_add(data_len)
            .filter(|end| *end <= payload.len())
            .ok_or(ContainerError::UnexpectedEof)?;

        Ok(Self {
            name,
            width,
            height,
            complete_image_size,
            format,
            mip_count,
            image_data: payload[start..end].to_vec(),
            trailing: payload[end..].to_vec(),
        })
    }

    /// Encode back into a payload
    pub fn to_payload(&self) -> Result<Vec<u8>, ContainerError> {
        let name = self.name.as_bytes();
        let padded = aligned_len(name.len());
        let mut out =
            Vec::with_capacity(4 + padded + 24 + self.image_data.len() + self.trailing.len());

        out.write_u32::<LittleEndian>(to_u32(name.len(), "name")?)?;
        out.extend_from_slice(name);
        out.resize(4 + padded, 0);

        out.write_i32::<LittleEndian>(
            i32::try_from(self.width).map_err(|_| ContainerError::Overflow("width".into()))?,
        )?;
        out.write_i32::<LittleEndian>(
            i32::try_from(self.height).map_err(|_| ContainerError::Overflow("height".into()))?,
        )?;
        out.write_u32::<LittleEndian>(self.complete_image_size)?;
        out.write_i32::<LittleEndian>(self.format.to_raw())?;
        out.write_i32::<LittleEndian>(self.mip_count)?;

        out.write_u32::<LittleEndian>(to_u32(self.image_data.len(), "image data")?)?;
        out.extend_from_slice(&self.image_data);
        out.extend_from_slice(&self.trailing);

        Ok(out)
    }

    /// Replace size, format and pixels, keeping the name and trailing settings
    pub fn apply(&mut self, update: TextureUpdate) -> Result<(), ContainerError> {
        let expected = update
            .format
            .payload_len(update.width, update.height)
            .ok_or(ContainerError::UnsupportedFormat(update.format))?;
        if update.pixels.len() != expected {
            return Err(ContainerError::PayloadSize {
                expected,
                actual: update.pixels.len(),
            });
        }

        self.complete_image_size = to_u32(update.pixels.len(), "image data")?;
        self.width = update.width;
        self.height = update.height;
        self.format = update.format;
        // Replacement textures carry a single level
        self.mip_count = 1;
        self.image_data = update.pixels;
        Ok(())
    }
}
