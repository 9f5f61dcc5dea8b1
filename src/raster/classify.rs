use crate::book::ImageRole;

use super::RasterMetrics;

/// Images whose shorter known edge is at most this many pixels are thumbnails.
pub const THUMBNAIL_MAX_EDGE: u32 = 140;

const EXTREME_WIDE: f64 = 4.0;
const EXTREME_TALL: f64 = 0.25;
const DECORATION_MAX_BYTES: usize = 4096;

/// Assign a role to an image for naming.
///
/// Small, extreme-ratio and tiny images are almost always page furniture rather than
/// book pages. Ratio is checked before the thumbnail edge so a 120×800 strip is a
/// decoration, not a thumbnail.
pub fn classify(metrics: &RasterMetrics, is_cover: bool) -> ImageRole {
    if is_cover {
        return ImageRole::Cover;
    }
    if metrics.has_dimensions() {
        let ratio = metrics.aspect_ratio();
        if ratio >= EXTREME_WIDE || ratio <= EXTREME_TALL {
            return ImageRole::Decoration;
        }
        if metrics.width <= THUMBNAIL_MAX_EDGE || metrics.height <= THUMBNAIL_MAX_EDGE {
            return ImageRole::Thumbnail;
        }
    }
    if metrics.size_bytes < DECORATION_MAX_BYTES {
        return ImageRole::Decoration;
    }
    ImageRole::Page
}
