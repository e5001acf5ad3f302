use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use anyhow::Context;
use zip::ZipArchive;

use crate::docx::xml::{find_attr, parse_xml_part, XmlEvent};
use crate::error::ConvertError;

const PACKAGE_RELS: &str = "_rels/.rels";
const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const DEFAULT_DOCUMENT_PART: &str = "word/document.xml";

pub struct DocxPackage {
    pub entries: Vec<DocxEntry>,
}

pub struct DocxEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl DocxPackage {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let f = File::open(path).with_context(|| format!("open docx: {}", path.display()))?;
        Self::from_reader(f).with_context(|| format!("read docx: {}", path.display()))
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> anyhow::Result<Self> {
        let mut zip = ZipArchive::new(reader).context("read zip")?;
        let mut entries = Vec::new();
        for i in 0..zip.len() {
            let mut file = zip.by_index(i).context("zip entry")?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).context("read zip entry")?;
            entries.push(DocxEntry {
                name: file.name().to_string(),
                data,
            });
        }
        Ok(Self { entries })
    }

    pub fn entry(&self, name: &str) -> Option<&DocxEntry> {
        let name = name.trim_start_matches('/');
        self.entries.iter().find(|e| e.name == name)
    }

    /// Locates the main document part through the package relationships, falling back
    /// to the conventional `word/document.xml` location.
    pub fn main_document(&self) -> anyhow::Result<&DocxEntry> {
        if let Some(target) = self.office_document_target()? {
            if let Some(ent) = self.entry(&target) {
                return Ok(ent);
            }
        }
        self.entry(DEFAULT_DOCUMENT_PART).ok_or_else(|| {
            ConvertError::source(format!("no main document part ({DEFAULT_DOCUMENT_PART})")).into()
        })
    }

    fn office_document_target(&self) -> anyhow::Result<Option<String>> {
        let Some(rels) = self.entry(PACKAGE_RELS) else {
            return Ok(None);
        };
        let part = parse_xml_part(&rels.name, &rels.data)
            .with_context(|| format!("parse xml: {}", rels.name))?;
        for ev in &part.events {
            let (XmlEvent::Empty { name, attrs } | XmlEvent::Start { name, attrs }) = ev else {
                continue;
            };
            if name != "Relationship" || find_attr(attrs, "Type") != Some(OFFICE_DOCUMENT_REL) {
                continue;
            }
            if let Some(target) = find_attr(attrs, "Target") {
                return Ok(Some(target.trim_start_matches('/').to_string()));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::DocxPackage;

    fn package(files: &[(&str, &str)]) -> DocxPackage {
        let mut zout = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in files {
            zout.start_file(*name, SimpleFileOptions::default())
                .expect("start file");
            zout.write_all(body.as_bytes()).expect("write file");
        }
        let cursor = zout.finish().expect("finish zip");
        DocxPackage::from_reader(Cursor::new(cursor.into_inner())).expect("read package")
    }

    #[test]
    fn follows_office_document_relationship() {
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="/word/main.xml"/></Relationships>"#;
        let pkg = package(&[("_rels/.rels", rels), ("word/main.xml", "<w:document/>")]);
        assert_eq!(pkg.main_document().expect("main part").name, "word/main.xml");
    }

    #[test]
    fn falls_back_to_word_document() {
        let pkg = package(&[("word/document.xml", "<w:document/>")]);
        assert_eq!(
            pkg.main_document().expect("main part").name,
            "word/document.xml"
        );
    }

    #[test]
    fn missing_document_part_is_a_source_error() {
        let pkg = package(&[("word/styles.xml", "<w:styles/>")]);
        let err = pkg.main_document().err().expect("error");
        assert!(err.to_string().contains("no main document part"));
    }
}
