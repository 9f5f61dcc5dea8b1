//! Image references in decompressed MOBI markup.
//!
//! Uses LazyLock to compile patterns once on first use.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex_lite::Regex;

/// Matches a whole `<img ...>` tag
static IMG_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("valid regex"));

/// Matches image00012.jpg, cover00001.png, thumb3.gif style file names
static NAMED_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:image|cover|thumb)(\d+)\.[a-z0-9]{2,5}\b").expect("valid regex")
});

/// Matches kindle:embed:000A references; the index is base32 (0-9, A-V)
static KINDLE_EMBED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)kindle:embed:([0-9A-V]+)").expect("valid regex"));

/// Matches recindex="00004" attributes
static RECINDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)recindex\s*=\s*["']?(\d+)"#).expect("valid regex")
});

fn first_number(pattern: &Regex, tag: &str, radix: u32) -> Option<u32> {
    pattern
        .captures(tag)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| u32::from_str_radix(digits.as_str(), radix).ok())
}

/// Collect the image numbers referenced by `<img>` tags, in document order.
///
/// Within one tag, a named image path wins over `kindle:embed:`, which wins over
/// `recindex`. Repeated numbers keep their first position.
pub fn extract_references(text: &str) -> Vec<u32> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for tag in IMG_TAG_RE.find_iter(text) {
        let tag = tag.as_str();
        let number = first_number(&NAMED_IMAGE_RE, tag, 10)
            .or_else(|| first_number(&KINDLE_EMBED_RE, tag, 32))
            .or_else(|| first_number(&RECINDEX_RE, tag, 10));

        if let Some(number) = number
            && seen.insert(number)
        {
            references.push(number);
        }
    }

    references
}
