//! Text decoding and archive path helpers.

use std::borrow::Cow;

/// Get current time as seconds since Unix epoch.
pub fn time_now_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Decode bytes to a string, handling various encodings.
///
/// 1. UTF-8 first (a BOM is consumed by encoding_rs)
/// 2. If malformed, the hint encoding (from `<?xml encoding="..."?>` or the MOBI header)
/// 3. Windows-1252 otherwise, which covers most old ebooks
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract the encoding name from an XML declaration in the first ~100 bytes.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let quote = *after_enc.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = after_enc[1..].iter().position(|&b| b == quote)? + 1;
    std::str::from_utf8(&after_enc[1..value_end]).ok()
}

/// Decode an XML/XHTML document using its declared encoding as the fallback hint.
pub fn decode_markup(bytes: &[u8]) -> Cow<'_, str> {
    decode_text(bytes, extract_xml_encoding(bytes))
}

/// Directory part of an archive path, without trailing slash.
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// Join `href` onto `base_dir` and collapse `.`/`..` segments.
///
/// Archive paths always use `/`; a `..` that would climb above the root is dropped.
pub fn resolve_path(base_dir: &str, href: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let joined = if href.starts_with('/') || base_dir.is_empty() {
        Cow::Borrowed(href)
    } else {
        Cow::Owned(format!("{base_dir}/{href}"))
    };

    for segment in joined.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Strip a `#fragment` or `?query` suffix and percent-decode an href.
pub fn clean_href(href: &str) -> String {
    let end = href.find(['#', '?']).unwrap_or(href.len());
    let href = href[..end].trim();
    percent_encoding::percent_decode_str(href)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| href.to_string())
}
