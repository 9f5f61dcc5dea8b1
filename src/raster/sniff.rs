//! Signature matching and header-only dimension parsing.

use super::{RasterFormat, RasterMetrics, mime_for_extension};

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// Detect format and pixel dimensions of `data`.
///
/// Never fails. When the dimensions cannot be parsed they are reported as 0×0; the
/// extension falls back to `.jpg` for unrecognized data.
pub fn detect(data: &[u8]) -> RasterMetrics {
    let format = detect_format(data);
    let (width, height) = png_dimensions(data)
        .or_else(|| gif_dimensions(data))
        .or_else(|| bmp_dimensions(data))
        .or_else(|| webp_dimensions(data))
        .or_else(|| jpeg_dimensions(data))
        .unwrap_or((0, 0));
    let extension = format.extension();

    RasterMetrics {
        size_bytes: data.len(),
        width,
        height,
        format,
        extension,
        mime_type: mime_for_extension(extension),
    }
}

/// Identify the container format from its leading bytes.
pub fn detect_format(data: &[u8]) -> RasterFormat {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        RasterFormat::Jpeg
    } else if data.starts_with(PNG_SIGNATURE) {
        RasterFormat::Png
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        RasterFormat::Gif
    } else if data.starts_with(b"BM") && data.len() >= 14 {
        RasterFormat::Bmp
    } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        RasterFormat::WebP
    } else if looks_like_svg(data) {
        RasterFormat::Svg
    } else {
        RasterFormat::Unknown
    }
}

/// Signature check used to pick image records out of a PDB record list.
pub fn is_image_data(data: &[u8]) -> bool {
    data.len() >= 8 && detect_format(data).is_raster()
}

fn looks_like_svg(data: &[u8]) -> bool {
    let head = &data[..data.len().min(512)];
    head.windows(4).any(|w| w == b"<svg")
}

fn be_u16(data: &[u8], at: usize) -> u32 {
    u16::from_be_bytes([data[at], data[at + 1]]) as u32
}

fn le_u24(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], 0])
}

fn png_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 24 || !data.starts_with(PNG_SIGNATURE) {
        return None;
    }
    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    Some((width, height))
}

fn gif_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 10 || !(data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a")) {
        return None;
    }
    let width = u16::from_le_bytes([data[6], data[7]]) as u32;
    let height = u16::from_le_bytes([data[8], data[9]]) as u32;
    Some((width, height))
}

fn bmp_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 26 || !data.starts_with(b"BM") {
        return None;
    }
    let width = u32::from_le_bytes([data[18], data[19], data[20], data[21]]);
    // Negative height marks a top-down bitmap.
    let height = i32::from_le_bytes([data[22], data[23], data[24], data[25]]).unsigned_abs();
    Some((width, height))
}

fn webp_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 30 || !data.starts_with(b"RIFF") || &data[8..12] != b"WEBP" {
        return None;
    }
    match &data[12..16] {
        b"VP8X" => Some((1 + le_u24(data, 24), 1 + le_u24(data, 27))),
        b"VP8L" => {
            let (b0, b1, b2, b3) = (
                data[21] as u32,
                data[22] as u32,
                data[23] as u32,
                data[24] as u32,
            );
            let width = 1 + (((b1 & 0x3F) << 8) | b0);
            let height = 1 + (((b3 & 0x0F) << 10) | (b2 << 2) | ((b1 & 0xC0) >> 6));
            Some((width, height))
        }
        // Lossy: 3-byte frame tag, start code 9D 01 2A, then 14-bit width/height.
        b"VP8 " if data[23..26] == [0x9D, 0x01, 0x2A] => {
            let width = u16::from_le_bytes([data[26], data[27]]) as u32 & 0x3FFF;
            let height = u16::from_le_bytes([data[28], data[29]]) as u32 & 0x3FFF;
            Some((width, height))
        }
        _ => None,
    }
}

fn is_start_of_frame(marker: u8) -> bool {
    matches!(
        marker,
        0xC0 | 0xC1
            | 0xC2
            | 0xC3
            | 0xC5
            | 0xC6
            | 0xC7
            | 0xC9
            | 0xCA
            | 0xCB
            | 0xCD
            | 0xCE
            | 0xCF
    )
}

fn jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 4 || !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut i = 2;
    while i + 9 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }
        let marker = data[i + 1];
        i += 2;

        if marker == 0xD8 || marker == 0xD9 {
            continue;
        }

        // `i` now points at the segment length, which counts itself.
        let length = be_u16(data, i) as usize;
        if length < 2 || i + length > data.len() {
            break;
        }

        if is_start_of_frame(marker) {
            // length(2) precision(1) height(2) width(2)
            if i + 7 <= data.len() {
                return Some((be_u16(data, i + 5), be_u16(data, i + 3)));
            }
            break;
        }

        i += length;
    }

    None
}
