//! Image codec
//!
//! Decodes replacement raster files (PNG, JPEG, BMP, TGA, ...) into a
//! canonical RGBA8 bitmap and lays that bitmap out in a container's native
//! uncompressed texture format.
//!
//! Containers store texture rows bottom-up, so [`encode`] flips rows and
//! [`decode_texture`] flips them back.

use image::{imageops, RgbaImage};
use thiserror::Error;

use crate::container::TextureFormat;

/// Largest edge a texture record may declare
pub const MAX_TEXTURE_DIMENSION: u32 = 16384;

/// Errors raised while converting images
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Unsupported texture format: {0:?}")]
    UnsupportedFormat(TextureFormat),

    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Texture payload size mismatch: expected {expected} bytes, got {actual}")]
    PayloadSize { expected: usize, actual: usize },
}

/// Pixels laid out in a container texture format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTexture {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub pixels: Vec<u8>,
}

/// Decode an arbitrary raster file into RGBA8
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, CodecError> {
    let img = image::load_from_memory(bytes)?;
    tracing::debug!("Decoded replacement image: {}x{}", img.width(), img.height());
    Ok(img.to_rgba8())
}

/// Lay out `bitmap` in `format`
pub fn encode(bitmap: &RgbaImage, format: TextureFormat) -> Result<EncodedTexture, CodecError> {
    let (width, height) = bitmap.dimensions();
    if width == 0 || height == 0 || width > MAX_TEXTURE_DIMENSION || height > MAX_TEXTURE_DIMENSION
    {
        return Err(CodecError::InvalidDimensions { width, height });
    }

    let bpp = format
        .bytes_per_pixel()
        .ok_or(CodecError::UnsupportedFormat(format))?;

    let flipped = imageops::flip_vertical(bitmap);
    let pixels = match format {
        TextureFormat::Rgba32 => flipped.into_raw(),
        _ => {
            let mut out = Vec::with_capacity(width as usize * height as usize * bpp);
            for px in flipped.pixels() {
                let [r, g, b, a] = px.0;
                match format {
                    TextureFormat::Alpha8 => out.push(a),
                    TextureFormat::Rgb24 => out.extend_from_slice(&[r, g, b]),
                    TextureFormat::Argb32 => out.extend_from_slice(&[a, r, g, b]),
                    TextureFormat::Bgra32 => out.extend_from_slice(&[b, g, r, a]),
                    _ => return Err(CodecError::UnsupportedFormat(format)),
                }
            }
            out
        }
    };

    Ok(EncodedTexture {
        width,
        height,
        format,
        pixels,
    })
}

/// Convert an uncompressed texture payload back into RGBA8
pub fn decode_texture(
    data: &[u8],
    width: u32,
    height: u32,
    format: TextureFormat,
) -> Result<RgbaImage, CodecError> {
    let expected = format
        .payload_len(width, height)
        .ok_or(CodecError::UnsupportedFormat(format))?;
    if data.len() != expected {
        return Err(CodecError::PayloadSize {
            expected,
            actual: data.len(),
        });
    }

    let rgba: Vec<u8> = match format {
        TextureFormat::Rgba32 => data.to_vec(),
        TextureFormat::Alpha8 => data.iter().flat_map(|&a| [255, 255, 255, a]).collect(),
        TextureFormat::Rgb24 => data
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 255])
            .collect(),
        TextureFormat::Argb32 => data
            .chunks_exact(4)
            .flat_map(|c| [c[1], c[2], c[3], c[0]])
            .collect(),
        TextureFormat::Bgra32 => data
            .chunks_exact(4)
            .flat_map(|c| [c[2], c[1], c[0], c[3]])
            .collect(),
        TextureFormat::Other(_) => return Err(CodecError::UnsupportedFormat(format)),
    };

    let img = RgbaImage::from_raw(width, height, rgba).ok_or(CodecError::PayloadSize {
        expected,
        actual: data.len(),
    })?;
    Ok(imageops::flip_vertical(&img))
}
