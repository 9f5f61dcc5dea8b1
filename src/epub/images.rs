//! `<img>` references in EPUB content documents.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::{debug, warn};

use super::archive::Archive;
use crate::raster::has_raster_extension;
use crate::util::{clean_href, decode_markup, parent_dir, resolve_path};

/// Captures the `src` value of an `<img>` tag, double-quoted, single-quoted or bare
static IMG_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\ssrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid regex")
});

/// Image paths referenced by a book's documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRefs {
    /// Archive paths in first-reference order.
    pub found: Vec<String>,
    /// Resolved paths that are not in the archive.
    pub missing: Vec<String>,
}

/// `src` values in document order, as written.
pub fn img_sources(markup: &str) -> Vec<&str> {
    IMG_SRC_RE
        .captures_iter(markup)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| m.as_str().trim())
        .collect()
}

/// Inline data and remote URLs never name an archive entry.
fn is_external(src: &str) -> bool {
    if src.is_empty() || src.starts_with("//") {
        return true;
    }
    match src.find(':') {
        Some(colon) => {
            let scheme = &src[..colon];
            !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
        }
        None => false,
    }
}

/// Resolve every `<img src>` of `documents` against the archive.
pub fn resolve_image_references(archive: &mut impl Archive, documents: &[String]) -> ImageRefs {
    let mut refs = ImageRefs::default();
    let mut seen = HashSet::new();
    let mut seen_missing = HashSet::new();

    for document in documents {
        let bytes = match archive.read_entry(document) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%document, %err, "skipping unreadable content document");
                continue;
            }
        };
        let markup = decode_markup(&bytes);
        let base_dir = parent_dir(document);

        for src in img_sources(&markup) {
            if is_external(src) {
                debug!(%document, src, "ignoring external image source");
                continue;
            }
            let href = clean_href(src);
            if href.is_empty() {
                continue;
            }
            let path = resolve_path(base_dir, &href);
            if archive.contains(&path) {
                if seen.insert(path.clone()) {
                    refs.found.push(path);
                }
            } else if seen_missing.insert(path.clone()) {
                warn!(%document, %path, "referenced image not in archive");
                refs.missing.push(path);
            }
        }
    }

    refs
}

/// Every entry with a raster image extension, in archive order.
pub fn raster_entries(archive: &impl Archive) -> Vec<String> {
    archive
        .list_entries()
        .iter()
        .filter(|name| has_raster_extension(name))
        .cloned()
        .collect()
}
