//! In-memory XLSX package: every ZIP part held as raw bytes
//!
//! Parts the merger does not edit are written back exactly as they were read, which is
//! what keeps hand-made sheets, styles and formulas intact.

use super::relationships::{self, CONTENT_TYPES_PART, ROOT_RELS_PART};
use crate::error::{RegsheetError, RegsheetResult};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tracing::debug;

const EMPTY_CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const EMPTY_ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const EMPTY_WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView/></bookViews><sheets/></workbook>"#;

const EMPTY_WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const EMPTY_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// All parts of an XLSX package, keyed by ZIP entry name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XlsxPackage {
    parts: BTreeMap<String, Vec<u8>>,
}

impl XlsxPackage {
    /// A workbook with no sheets yet: workbook, styles, and the relationship plumbing
    pub fn empty() -> Self {
        let parts = [
            (CONTENT_TYPES_PART, EMPTY_CONTENT_TYPES),
            (ROOT_RELS_PART, EMPTY_ROOT_RELS),
            ("xl/workbook.xml", EMPTY_WORKBOOK),
            ("xl/_rels/workbook.xml.rels", EMPTY_WORKBOOK_RELS),
            ("xl/styles.xml", EMPTY_STYLES),
        ]
        .into_iter()
        .map(|(name, xml)| (name.to_string(), xml.as_bytes().to_vec()))
        .collect();
        Self { parts }
    }

    pub fn from_bytes(bytes: &[u8]) -> RegsheetResult<Self> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes))?;

        let mut parts = BTreeMap::new();
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if !file.is_file() {
                continue;
            }
            let name = file.name().to_string();
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            parts.insert(name, buf);
        }

        let package = Self { parts };
        if package.part(CONTENT_TYPES_PART).is_none() {
            return Err(RegsheetError::Workbook(format!(
                "missing {}",
                CONTENT_TYPES_PART
            )));
        }
        Ok(package)
    }

    pub fn write_to_bytes(&self) -> RegsheetResult<Vec<u8>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        for (name, bytes) in &self.parts {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    /// Look up a part; a leading `/` is ignored
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        let name = name.trim_start_matches('/');
        self.parts.get(name).map(Vec::as_slice)
    }

    /// A part decoded as UTF-8 XML
    pub fn part_str(&self, name: &str) -> RegsheetResult<Option<String>> {
        match self.part(name) {
            Some(bytes) => Ok(Some(String::from_utf8(bytes.to_vec())?)),
            None => Ok(None),
        }
    }

    /// Like [`XlsxPackage::part_str`] but a missing part is an error
    pub(crate) fn required_part_str(&self, name: &str) -> RegsheetResult<String> {
        self.part_str(name)?
            .ok_or_else(|| RegsheetError::Workbook(format!("missing part {}", name)))
    }

    pub fn set_part(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        let name = name.into();
        self.parts
            .insert(name.trim_start_matches('/').to_string(), bytes);
    }

    pub fn remove_part(&mut self, name: &str) -> Option<Vec<u8>> {
        self.parts.remove(name.trim_start_matches('/'))
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub fn parts(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.parts
    }

    /// The main workbook part, found through the package's officeDocument relationship
    pub fn workbook_part(&self) -> RegsheetResult<String> {
        let rels_xml = self.required_part_str(ROOT_RELS_PART)?;
        relationships::parse_relationships(&rels_xml)?
            .into_iter()
            .find(|r| r.rel_type == relationships::OFFICE_DOCUMENT_REL)
            .map(|r| relationships::resolve_target("", &r.target))
            .ok_or_else(|| RegsheetError::Workbook("no officeDocument relationship".to_string()))
    }
}

/// Result of opening the merge target
#[derive(Debug)]
pub enum LoadedWorkbook {
    /// Read in full from an existing file
    Loaded(XlsxPackage),
    /// No file yet; start from an empty workbook
    Fresh(XlsxPackage),
}

impl LoadedWorkbook {
    pub fn is_fresh(&self) -> bool {
        matches!(self, LoadedWorkbook::Fresh(_))
    }

    pub fn into_package(self) -> XlsxPackage {
        match self {
            LoadedWorkbook::Loaded(package) | LoadedWorkbook::Fresh(package) => package,
        }
    }
}

/// Load the workbook at `path`, or start an empty one if nothing is there.
///
/// An existing file that cannot be read or is not a valid package is a
/// [`RegsheetError::FileAccess`].
pub fn load_or_create(path: &Path) -> RegsheetResult<LoadedWorkbook> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no workbook yet, starting empty");
            return Ok(LoadedWorkbook::Fresh(XlsxPackage::empty()));
        }
        Err(e) => return Err(RegsheetError::from(e).into_file_access(path)),
    };

    let package = XlsxPackage::from_bytes(&bytes).map_err(|e| e.into_file_access(path))?;
    debug!(
        path = %path.display(),
        parts = package.parts.len(),
        "loaded workbook"
    );
    Ok(LoadedWorkbook::Loaded(package))
}
