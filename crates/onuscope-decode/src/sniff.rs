// Image header sniffing
//
// Dispatches on magic-byte signatures to one of four structural decoders
// (PNG, JPEG, GIF, WebP) and extracts dimensions, color depth, and alpha
// presence straight from the header bytes. Only headers are touched --
// pixel data, chunk CRCs, and anything past the first frame descriptor
// are never read.
//
// Every decoder degrades per field: a buffer truncated mid-header yields
// the format with whatever fields fit before the end. This module never
// returns an error and never panics on untrusted input.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cursor::ByteCursor;

// ── Types ────────────────────────────────────────────────────────────

/// Recognized image container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Unknown,
}

impl ImageFormat {
    /// Lowercase wire name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Unknown => "unknown",
        }
    }

    /// MIME type for the format, if it has one.
    pub fn mime_type(self) -> Option<&'static str> {
        match self {
            Self::Png => Some("image/png"),
            Self::Jpeg => Some("image/jpeg"),
            Self::Gif => Some("image/gif"),
            Self::Webp => Some("image/webp"),
            Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural metadata extracted from an image header.
///
/// `format` is always populated; every other field is present only if the
/// decoder located it before the buffer ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub format: ImageFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_depth: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_alpha: Option<bool>,
}

impl ImageMetadata {
    /// Metadata with a known format and no structural fields.
    fn bare(format: ImageFormat) -> Self {
        Self {
            format,
            width: None,
            height: None,
            color_depth: None,
            has_alpha: None,
        }
    }
}

// ── Signatures ───────────────────────────────────────────────────────

const PNG_SIG: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIG: [u8; 2] = [0xFF, 0xD8];

/// SOF0-SOF3 and SOF5-SOF7 carry frame dimensions; 0xC4 (DHT) and the
/// arithmetic-coding markers past 0xC7 do not.
fn is_sof_marker(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7)
}

// ── Dispatch ─────────────────────────────────────────────────────────

/// Sniff structural metadata from raw image bytes.
///
/// Buffers shorter than 8 bytes or without a recognized signature yield
/// `ImageFormat::Unknown` with all other fields absent.
pub fn sniff_metadata(data: &[u8]) -> ImageMetadata {
    let cur = ByteCursor::new(data);

    if cur.len() < 8 {
        return ImageMetadata::bare(ImageFormat::Unknown);
    }

    let meta = if cur.starts_with(&PNG_SIG) {
        sniff_png(&cur)
    } else if cur.starts_with(&JPEG_SIG) {
        sniff_jpeg(&cur)
    } else if is_gif(&cur) {
        sniff_gif(&cur)
    } else if is_webp(&cur) {
        sniff_webp(&cur)
    } else {
        ImageMetadata::bare(ImageFormat::Unknown)
    };

    debug!(
        format = meta.format.as_str(),
        width = meta.width,
        height = meta.height,
        "sniffed image header"
    );
    meta
}

// ── PNG ──────────────────────────────────────────────────────────────

/// IHDR is mandatory and always the first chunk, so its fields sit at
/// fixed offsets: width @16, height @20 (both BE u32), bit depth @24,
/// color type @25. Alpha presence is bit 2 of the color type.
///
/// Width and height are gated as a pair: a buffer holding only the
/// width field (under 24 bytes) reports neither dimension.
fn sniff_png(cur: &ByteCursor<'_>) -> ImageMetadata {
    let mut meta = ImageMetadata::bare(ImageFormat::Png);
    if let (Some(width), Some(height)) = (cur.u32_be(16), cur.u32_be(20)) {
        meta.width = Some(width);
        meta.height = Some(height);
    }
    meta.color_depth = cur.u8(24);
    meta.has_alpha = cur.u8(25).map(|color_type| color_type & 0x04 != 0);
    meta
}

// ── JPEG ─────────────────────────────────────────────────────────────

/// Walk the segment chain from offset 2 looking for a Start-Of-Frame
/// marker, skipping every other segment by its big-endian length field.
///
/// The scan is cursor-bounded: a truncated or lying segment length runs
/// the position off the end of the buffer and the loop stops, leaving
/// the dimension fields absent.
fn sniff_jpeg(cur: &ByteCursor<'_>) -> ImageMetadata {
    let mut meta = ImageMetadata::bare(ImageFormat::Jpeg);

    let mut pos = 2usize;
    while let Some(byte) = cur.u8(pos) {
        if byte != 0xFF {
            pos += 1;
            continue;
        }
        let Some(marker) = cur.u8(pos + 1) else { break };
        if marker == 0xFF {
            // Fill byte before the real marker.
            pos += 1;
            continue;
        }

        if is_sof_marker(marker) {
            // SOF layout after the FF: marker, length (2), precision,
            // height (2), width (2), component count.
            meta.height = cur.u16_be(pos + 5).map(u32::from);
            meta.width = cur.u16_be(pos + 7).map(u32::from);
            meta.color_depth = cur.u8(pos + 9);
            break;
        }

        let Some(seg_len) = cur.u16_be(pos + 2) else { break };
        if seg_len < 2 {
            // Malformed length field; abort rather than loop in place.
            break;
        }
        pos += 2 + seg_len as usize;
    }

    meta
}

// ── GIF ──────────────────────────────────────────────────────────────

fn is_gif(cur: &ByteCursor<'_>) -> bool {
    cur.starts_with(b"GIF8") && matches!(cur.u8(4), Some(b'7' | b'9'))
}

/// Logical screen descriptor: width LE u16 @6, height LE u16 @8.
/// A complete descriptor needs 10 bytes; shorter buffers report
/// neither dimension.
fn sniff_gif(cur: &ByteCursor<'_>) -> ImageMetadata {
    let mut meta = ImageMetadata::bare(ImageFormat::Gif);
    if let (Some(width), Some(height)) = (cur.u16_le(6), cur.u16_le(8)) {
        meta.width = Some(u32::from(width));
        meta.height = Some(u32::from(height));
    }
    meta
}

// ── WebP ─────────────────────────────────────────────────────────────

fn is_webp(cur: &ByteCursor<'_>) -> bool {
    cur.starts_with(b"RIFF") && cur.bytes(8, 4) == Some(b"WEBP")
}

/// Dimensions depend on the bitstream variant named by the chunk tag at
/// offset 12. `VP8 ` (simple lossy) stores 14-bit LE dimensions in the
/// frame header; `VP8L` (lossless) packs both into one LE u32. Anything
/// else (VP8X extended files in particular) keeps dimensions absent.
fn sniff_webp(cur: &ByteCursor<'_>) -> ImageMetadata {
    let mut meta = ImageMetadata::bare(ImageFormat::Webp);

    match cur.bytes(12, 4) {
        Some(b"VP8 ") => {
            meta.width = cur.u16_le(26).map(|w| u32::from(w & 0x3FFF));
            meta.height = cur.u16_le(28).map(|h| u32::from(h & 0x3FFF));
        }
        Some(b"VP8L") => {
            if let Some(bits) = cur.u32_le(21) {
                meta.width = Some((bits & 0x3FFF) + 1);
                meta.height = Some(((bits >> 14) & 0x3FFF) + 1);
            }
        }
        _ => {}
    }

    meta
}

// ── Tests ────────────────────────────────────────────────────────────
