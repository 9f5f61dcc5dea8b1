//! Document reading order from `container.xml` and the OPF package.

use std::collections::{HashMap, HashSet};

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use tracing::{debug, warn};

use super::archive::Archive;
use crate::book::BookMetadata;
use crate::error::{Error, Result};
use crate::util::{clean_href, decode_markup, parent_dir, resolve_path};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Parsed OPF package: metadata, manifest and spine.
#[derive(Debug, Clone, Default)]
pub struct OpfPackage {
    pub metadata: BookMetadata,
    /// manifest id -> href, as written in the OPF
    pub manifest: HashMap<String, String>,
    /// `itemref/@idref` in spine order
    pub spine: Vec<String>,
    /// href of the cover image, relative to the OPF
    pub cover_href: Option<String>,
}

/// Content documents in reading order, and the package they came from.
#[derive(Debug, Clone, Default)]
pub struct DocumentOrder {
    pub documents: Vec<String>,
    pub opf_path: Option<String>,
    pub package: Option<OpfPackage>,
}

impl DocumentOrder {
    /// Archive path of the cover image declared by the package.
    pub fn cover_path(&self) -> Option<String> {
        let opf_path = self.opf_path.as_deref()?;
        let href = self.package.as_ref()?.cover_href.as_deref()?;
        Some(resolve_path(parent_dir(opf_path), &clean_href(href)))
    }
}

/// Metadata elements we read; anything else in `<metadata>` is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpfField {
    Title,
    Creator,
    Publisher,
    Language,
}

impl OpfField {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(OpfField::Title),
            b"creator" => Some(OpfField::Creator),
            b"publisher" => Some(OpfField::Publisher),
            b"language" => Some(OpfField::Language),
            _ => None,
        }
    }
}

pub fn is_html_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".xhtml") || lower.ends_with(".html")
}

/// Locate the OPF: `rootfile/@full-path` from `container.xml`, else the first `.opf`
/// entry in the archive.
pub fn find_opf_path(archive: &mut impl Archive) -> Option<String> {
    if archive.contains(CONTAINER_PATH) {
        match archive
            .read_entry(CONTAINER_PATH)
            .and_then(|bytes| parse_container(&decode_markup(&bytes)))
        {
            Ok(Some(path)) if archive.contains(&path) => return Some(path),
            Ok(Some(path)) => warn!(%path, "container.xml points at a missing OPF"),
            Ok(None) => warn!("no rootfile in container.xml"),
            Err(err) => warn!(%err, "unreadable container.xml"),
        }
    }

    archive
        .list_entries()
        .iter()
        .find(|name| name.to_ascii_lowercase().ends_with(".opf"))
        .cloned()
}

fn parse_container(content: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                if let Some(path) = attribute(&e, b"full-path") {
                    return Ok(Some(path));
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }
}

/// Parse an OPF document.
pub fn parse_opf(content: &str) -> Result<OpfPackage> {
    let mut reader = Reader::from_str(content);

    let mut package = OpfPackage::default();
    let mut authors: Vec<String> = Vec::new();
    let mut epub3_cover: Option<String> = None;
    let mut epub2_cover_id: Option<String> = None;

    let mut in_metadata = false;
    let mut current: Option<OpfField> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"metadata" {
                    in_metadata = true;
                } else if in_metadata && let Some(field) = OpfField::from_local_name(local) {
                    current = Some(field);
                    buf_text.clear();
                }
                read_package_element(&e, &mut package, &mut epub3_cover, &mut epub2_cover_id);
            }
            Ok(Event::Empty(e)) => {
                read_package_element(&e, &mut package, &mut epub3_cover, &mut epub2_cover_id);
            }
            Ok(Event::Text(e)) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::CData(e)) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current.is_some() {
                    push_reference(&e, &mut buf_text);
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"metadata" {
                    in_metadata = false;
                }
                if let Some(field) = current
                    && OpfField::from_local_name(local) == Some(field)
                {
                    let value = buf_text.trim().to_string();
                    match field {
                        OpfField::Title if package.metadata.title.is_empty() => {
                            package.metadata.title = value
                        }
                        OpfField::Creator if !value.is_empty() => authors.push(value),
                        OpfField::Publisher if package.metadata.publisher.is_empty() => {
                            package.metadata.publisher = value
                        }
                        OpfField::Language if package.metadata.language.is_empty() => {
                            package.metadata.language = value
                        }
                        _ => {}
                    }
                    current = None;
                    buf_text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    package.metadata.author = authors.into_iter().next().unwrap_or_default();

    // EPUB3 cover-image property wins over the EPUB2 <meta name="cover">
    package.cover_href = epub3_cover.or_else(|| {
        epub2_cover_id.and_then(|id| package.manifest.get(&id).cloned())
    });

    Ok(package)
}

fn read_package_element(
    e: &BytesStart<'_>,
    package: &mut OpfPackage,
    epub3_cover: &mut Option<String>,
    epub2_cover_id: &mut Option<String>,
) {
    let name = e.name();
    match local_name(name.as_ref()) {
        b"item" => {
            let (Some(id), Some(href)) = (attribute(e, b"id"), attribute(e, b"href")) else {
                return;
            };
            let is_cover = attribute(e, b"properties").is_some_and(|props| {
                props
                    .split_ascii_whitespace()
                    .any(|prop| prop == "cover-image")
            });
            if is_cover && epub3_cover.is_none() {
                *epub3_cover = Some(href.clone());
            }
            package.manifest.insert(id, href);
        }
        b"itemref" => {
            if let Some(idref) = attribute(e, b"idref") {
                package.spine.push(idref);
            }
        }
        b"meta" => {
            if attribute(e, b"name").as_deref() == Some("cover")
                && let Some(content) = attribute(e, b"content")
            {
                *epub2_cover_id = Some(content);
            }
        }
        _ => {}
    }
}

/// Order the content documents of an EPUB.
///
/// Spine documents come first, then any HTML entry the spine missed, in archive order.
/// Without a usable OPF the HTML entries are sorted by name.
pub fn resolve_document_order(archive: &mut impl Archive) -> DocumentOrder {
    let html_entries: Vec<String> = archive
        .list_entries()
        .iter()
        .filter(|name| is_html_path(name))
        .cloned()
        .collect();

    let Some(opf_path) = find_opf_path(archive) else {
        debug!("no OPF found, ordering HTML entries by name");
        return sorted_fallback(html_entries);
    };

    let package = match archive
        .read_entry(&opf_path)
        .and_then(|bytes| parse_opf(&decode_markup(&bytes)))
    {
        Ok(package) => package,
        Err(err) => {
            warn!(%opf_path, %err, "unreadable OPF, ordering HTML entries by name");
            return DocumentOrder {
                opf_path: Some(opf_path),
                ..sorted_fallback(html_entries)
            };
        }
    };

    let opf_dir = parent_dir(&opf_path);
    let mut seen = HashSet::new();
    let mut documents = Vec::new();

    for idref in &package.spine {
        let Some(href) = package.manifest.get(idref) else {
            debug!(%idref, "spine item missing from manifest");
            continue;
        };
        let path = resolve_path(opf_dir, &clean_href(href));
        if is_html_path(&path) && archive.contains(&path) && seen.insert(path.clone()) {
            documents.push(path);
        }
    }

    let spine_len = documents.len();
    for entry in html_entries {
        if seen.insert(entry.clone()) {
            documents.push(entry);
        }
    }
    debug!(
        spine = spine_len,
        appended = documents.len() - spine_len,
        "resolved EPUB document order"
    );

    DocumentOrder {
        documents,
        opf_path: Some(opf_path),
        package: Some(package),
    }
}

fn sorted_fallback(mut html_entries: Vec<String>) -> DocumentOrder {
    html_entries.sort();
    DocumentOrder {
        documents: html_entries,
        ..DocumentOrder::default()
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == key)
        .map(|attr| match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
}

/// Append the text a character or predefined entity reference stands for.
fn push_reference(e: &BytesRef<'_>, out: &mut String) {
    match e.resolve_char_ref() {
        Ok(Some(c)) => out.push(c),
        Ok(None) => {
            if let Some(text) = e.decode().ok().as_deref().and_then(resolve_predefined_entity) {
                out.push_str(text);
            }
        }
        Err(_) => {}
    }
}

/// Extract local name from potentially namespaced XML name
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}
