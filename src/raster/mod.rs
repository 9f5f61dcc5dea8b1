//! Raster image sniffing and classification.
//!
//! Everything here works on raw byte buffers and never fails: unknown or truncated
//! data yields zero dimensions and a best-effort extension.

mod classify;
mod sniff;

pub use classify::{THUMBNAIL_MAX_EDGE, classify};
pub use sniff::{detect, detect_format, is_image_data};

/// Detected image container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    WebP,
    /// SVG markup (vector; no pixel dimensions).
    Svg,
    /// No known signature.
    Unknown,
}

impl RasterFormat {
    /// Canonical extension with leading dot. Unknown data is assumed to be JPEG.
    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Jpeg | RasterFormat::Unknown => ".jpg",
            RasterFormat::Png => ".png",
            RasterFormat::Gif => ".gif",
            RasterFormat::Bmp => ".bmp",
            RasterFormat::WebP => ".webp",
            RasterFormat::Svg => ".svg",
        }
    }

    /// Whether this is a pixel format (as opposed to SVG or unrecognized data).
    pub fn is_raster(self) -> bool {
        !matches!(self, RasterFormat::Svg | RasterFormat::Unknown)
    }
}

/// Map a canonical extension to its MIME type.
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        ".jpg" | ".jpeg" => "image/jpeg",
        ".png" => "image/png",
        ".gif" => "image/gif",
        ".bmp" => "image/bmp",
        ".webp" => "image/webp",
        ".svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Extensions of pixel formats found in ebook archives.
pub const RASTER_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp", ".gif", ".bmp"];

/// Whether `path` ends in one of [`RASTER_EXTENSIONS`] (case-insensitive).
pub fn has_raster_extension(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    RASTER_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Size, dimensions and type of an image payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterMetrics {
    pub size_bytes: usize,
    /// Pixel width, 0 when undetectable.
    pub width: u32,
    /// Pixel height, 0 when undetectable.
    pub height: u32,
    pub format: RasterFormat,
    pub extension: &'static str,
    pub mime_type: &'static str,
}

impl RasterMetrics {
    /// Width over height, or 0.0 when the height is unknown.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    /// Both dimensions were parsed.
    pub fn has_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_table() {
        assert_eq!(mime_for_extension(".jpg"), "image/jpeg");
        assert_eq!(mime_for_extension(".JPEG"), "image/jpeg");
        assert_eq!(mime_for_extension(".svg"), "image/svg+xml");
        assert_eq!(mime_for_extension(".tiff"), "application/octet-stream");
    }

    #[test]
    fn test_aspect_ratio_zero_height() {
        let metrics = detect(b"not an image at all");
        assert_eq!(metrics.height, 0);
        assert_eq!(metrics.aspect_ratio(), 0.0);
    }

    #[test]
    fn test_raster_extension() {
        assert!(has_raster_extension("img/A.JPG"));
        assert!(has_raster_extension("cover.webp"));
        assert!(!has_raster_extension("images/logo.svg"));
        assert!(!has_raster_extension("text/ch1.xhtml"));
    }
}
