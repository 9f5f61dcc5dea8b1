//! Synthetic books for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use pagelift::mobi::palmdoc;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const MOBI_HEADER_LEN: u32 = 0xE8;
const TEXT_RECORD_SIZE: usize = 4096;

/// A baseline JPEG header with the given SOF0 dimensions, padded to `size` bytes.
pub fn jpeg(width: u16, height: u16, size: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    data.extend_from_slice(b"JFIF\0");
    data.extend_from_slice(&[1, 1, 0, 0, 1, 0, 1, 0, 0]);
    data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&[3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
    if data.len() < size {
        data.resize(size, 0);
    }
    data
}

/// A PNG signature and IHDR chunk, padded to `size` bytes.
pub fn png(width: u32, height: u32, size: usize) -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[8, 6, 0, 0, 0]);
    if data.len() < size {
        data.resize(size, 0);
    }
    data
}

/// Builds a MOBI file record by record.
pub struct MobiBuilder {
    title: String,
    text: Vec<u8>,
    compress: bool,
    images: Vec<Vec<u8>>,
    /// Extra non-image records placed between the text and the images.
    resources: Vec<Vec<u8>>,
    exth: Vec<(u32, Vec<u8>)>,
    first_image: Option<u32>,
}

impl MobiBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            text: Vec::new(),
            compress: true,
            images: Vec::new(),
            resources: Vec::new(),
            exth: Vec::new(),
            first_image: None,
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.as_bytes().to_vec();
        self
    }

    pub fn uncompressed(mut self) -> Self {
        self.compress = false;
        self
    }

    pub fn image(mut self, data: Vec<u8>) -> Self {
        self.images.push(data);
        self
    }

    pub fn resource(mut self, data: &[u8]) -> Self {
        self.resources.push(data.to_vec());
        self
    }

    pub fn exth_text(mut self, record_type: u32, value: &str) -> Self {
        self.exth.push((record_type, value.as_bytes().to_vec()));
        self
    }

    pub fn exth_u32(mut self, record_type: u32, value: u32) -> Self {
        self.exth.push((record_type, value.to_be_bytes().to_vec()));
        self
    }

    /// Override the first-image field (`0xFFFFFFFF` for unset).
    pub fn first_image(mut self, index: u32) -> Self {
        self.first_image = Some(index);
        self
    }

    /// Index of the first image record in the built file.
    pub fn first_image_record(&self) -> usize {
        1 + self.text_records().len() + self.resources.len()
    }

    fn text_records(&self) -> Vec<Vec<u8>> {
        self.text
            .chunks(TEXT_RECORD_SIZE)
            .map(|chunk| {
                if self.compress {
                    palmdoc::compress(chunk)
                } else {
                    chunk.to_vec()
                }
            })
            .collect()
    }

    fn record0(&self, text_records: usize) -> Vec<u8> {
        let mut rec = vec![0u8; 16 + MOBI_HEADER_LEN as usize];
        let compression: u16 = if self.compress { 2 } else { 1 };
        rec[0..2].copy_from_slice(&compression.to_be_bytes());
        rec[4..8].copy_from_slice(&(self.text.len() as u32).to_be_bytes());
        rec[8..10].copy_from_slice(&(text_records as u16).to_be_bytes());
        rec[10..12].copy_from_slice(&(TEXT_RECORD_SIZE as u16).to_be_bytes());

        rec[16..20].copy_from_slice(b"MOBI");
        rec[20..24].copy_from_slice(&MOBI_HEADER_LEN.to_be_bytes());
        rec[24..28].copy_from_slice(&2u32.to_be_bytes());
        rec[28..32].copy_from_slice(&65001u32.to_be_bytes());

        let first_image = self
            .first_image
            .unwrap_or(self.first_image_record() as u32);
        rec[0x6C..0x70].copy_from_slice(&first_image.to_be_bytes());

        if !self.exth.is_empty() {
            rec[0x80..0x84].copy_from_slice(&0x40u32.to_be_bytes());

            let mut body = Vec::new();
            for (record_type, value) in &self.exth {
                body.extend_from_slice(&record_type.to_be_bytes());
                body.extend_from_slice(&(8 + value.len() as u32).to_be_bytes());
                body.extend_from_slice(value);
            }
            rec.extend_from_slice(b"EXTH");
            rec.extend_from_slice(&(12 + body.len() as u32).to_be_bytes());
            rec.extend_from_slice(&(self.exth.len() as u32).to_be_bytes());
            rec.extend_from_slice(&body);
            while rec.len() % 4 != 0 {
                rec.push(0);
            }
        }

        let name_offset = rec.len() as u32;
        rec.extend_from_slice(self.title.as_bytes());
        rec[0x54..0x58].copy_from_slice(&name_offset.to_be_bytes());
        rec[0x58..0x5C].copy_from_slice(&(self.title.len() as u32).to_be_bytes());
        rec.extend_from_slice(&[0, 0]);
        rec
    }

    pub fn build(&self) -> Vec<u8> {
        let text_records = self.text_records();
        let mut records = vec![self.record0(text_records.len())];
        records.extend(text_records);
        records.extend(self.resources.iter().cloned());
        records.extend(self.images.iter().cloned());

        let mut data = vec![0u8; 78];
        let name: Vec<u8> = self.title.bytes().filter(|b| *b != b' ').take(31).collect();
        data[..name.len()].copy_from_slice(&name);
        data[60..68].copy_from_slice(b"BOOKMOBI");
        data[76..78].copy_from_slice(&(records.len() as u16).to_be_bytes());

        let mut offset = 78 + records.len() * 8 + 2;
        for (i, record) in records.iter().enumerate() {
            data.extend_from_slice(&(offset as u32).to_be_bytes());
            data.extend_from_slice(&((2 * i) as u32).to_be_bytes());
            offset += record.len();
        }
        data.extend_from_slice(&[0, 0]);
        for record in &records {
            data.extend_from_slice(record);
        }
        data
    }
}

/// Standard `container.xml` pointing at `OEBPS/content.opf`.
pub const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// An OPF whose spine lists `chapters` (paths relative to OEBPS) in order.
pub fn opf(title: &str, chapters: &[&str], cover: Option<&str>) -> String {
    let mut manifest = String::new();
    let mut spine = String::new();
    for (i, href) in chapters.iter().enumerate() {
        manifest.push_str(&format!(
            "    <item id=\"c{i}\" href=\"{href}\" media-type=\"application/xhtml+xml\"/>\n"
        ));
        spine.push_str(&format!("    <itemref idref=\"c{i}\"/>\n"));
    }
    if let Some(cover) = cover {
        manifest.push_str(&format!(
            "    <item id=\"cover\" href=\"{cover}\" media-type=\"image/jpeg\" properties=\"cover-image\"/>\n"
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{title}</dc:title>
    <dc:creator>Test Author</dc:creator>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine>
{spine}  </spine>
</package>"#
    )
}

/// A ZIP archive with the given entries, in order.
pub fn zip(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// A minimal chapter with the given `<img src>` values.
pub fn chapter(srcs: &[&str]) -> Vec<u8> {
    let mut body = String::from("<html xmlns=\"http://www.w3.org/1999/xhtml\"><body>\n");
    for src in srcs {
        body.push_str(&format!("<p><img src=\"{src}\" alt=\"\"/></p>\n"));
    }
    body.push_str("</body></html>");
    body.into_bytes()
}
