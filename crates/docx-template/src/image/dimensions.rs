/*
 * dimensions.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Pixel dimensions read straight from image headers.

use std::path::Path;

/// Image formats that may be embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
}

impl ImageFormat {
    /// Format for a file extension, case-insensitively.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            _ => None,
        }
    }

    /// Format implied by the path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// MIME type recorded in the content types manifest.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
        }
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Decode the pixel dimensions of `bytes` as `format`.
///
/// Returns a message describing the problem when the header is truncated,
/// malformed, or declares a zero dimension.
pub fn decode(bytes: &[u8], format: ImageFormat) -> Result<Dimensions, String> {
    let dimensions = match format {
        ImageFormat::Png => decode_png(bytes)?,
        ImageFormat::Jpeg => decode_jpeg(bytes)?,
        ImageFormat::Gif => decode_gif(bytes)?,
    };
    if dimensions.width == 0 || dimensions.height == 0 {
        return Err(format!(
            "image declares zero size ({}x{})",
            dimensions.width, dimensions.height
        ));
    }
    Ok(dimensions)
}

fn decode_png(bytes: &[u8]) -> Result<Dimensions, String> {
    if bytes.len() < 24 || !bytes.starts_with(PNG_SIGNATURE) {
        return Err("missing PNG signature".to_string());
    }
    if &bytes[12..16] != b"IHDR" {
        return Err("first PNG chunk is not IHDR".to_string());
    }
    Ok(Dimensions {
        width: be_u32(&bytes[16..20]),
        height: be_u32(&bytes[20..24]),
    })
}

fn decode_gif(bytes: &[u8]) -> Result<Dimensions, String> {
    if bytes.len() < 10 || !(bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")) {
        return Err("missing GIF signature".to_string());
    }
    Ok(Dimensions {
        width: u16::from_le_bytes([bytes[6], bytes[7]]) as u32,
        height: u16::from_le_bytes([bytes[8], bytes[9]]) as u32,
    })
}

fn decode_jpeg(bytes: &[u8]) -> Result<Dimensions, String> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return Err("missing JPEG start-of-image marker".to_string());
    }

    let mut pos = 2;
    while pos + 1 < bytes.len() {
        if bytes[pos] != 0xFF {
            return Err(format!("expected JPEG marker at offset {}", pos));
        }
        let marker = bytes[pos + 1];
        // fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // markers without a length field
        if marker == 0x01 || (0xD0..=0xD9).contains(&marker) {
            pos += 2;
            continue;
        }

        if pos + 4 > bytes.len() {
            break;
        }
        let length = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if length < 2 {
            return Err(format!("invalid JPEG segment length at offset {}", pos));
        }

        if is_start_of_frame(marker) {
            // length(2) precision(1) height(2) width(2)
            if pos + 9 > bytes.len() {
                break;
            }
            return Ok(Dimensions {
                height: u16::from_be_bytes([bytes[pos + 5], bytes[pos + 6]]) as u32,
                width: u16::from_be_bytes([bytes[pos + 7], bytes[pos + 8]]) as u32,
            });
        }
        pos += 2 + length;
    }
    Err("no JPEG start-of-frame segment found".to_string())
}

/// SOF0 through SOF15, excluding DHT (C4), JPG (C8) and DAC (CC).
fn is_start_of_frame(marker: u8) -> bool {
    (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
