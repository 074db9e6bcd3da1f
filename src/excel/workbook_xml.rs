//! Edits to the main workbook part (`xl/workbook.xml`)

use super::xml;
use crate::error::{RegsheetError, RegsheetResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Children of `<workbook>` that must come after `<calcPr>`
const AFTER_CALC_PR: &[&[u8]] = &[
    b"oleSize",
    b"customWorkbookViews",
    b"pivotCaches",
    b"smartTagPr",
    b"smartTagTypes",
    b"webPublishing",
    b"fileRecoveryPr",
    b"webPublishObjects",
    b"extLst",
];

/// A `<sheet>` entry of the workbook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    pub sheet_id: u32,
    pub rel_id: String,
}

pub(crate) fn parse_sheets(workbook_xml: &str) -> RegsheetResult<Vec<SheetEntry>> {
    xml::collect_elements(workbook_xml, b"sheet", |e| {
        let name = xml::attr(e, b"name")?
            .ok_or_else(|| RegsheetError::Workbook("<sheet> without name".to_string()))?;
        let sheet_id = xml::attr(e, b"sheetId")?
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| {
                RegsheetError::Workbook(format!("sheet '{}' has no valid sheetId", name))
            })?;
        let rel_id = xml::prefixed_attr(e, b"id")?.ok_or_else(|| {
            RegsheetError::Workbook(format!("sheet '{}' has no relationship id", name))
        })?;
        Ok(SheetEntry {
            name,
            sheet_id,
            rel_id,
        })
    })
}

/// Namespace prefix bound to the officeDocument relationships namespace (usually `r`)
fn relationships_prefix(workbook_xml: &str) -> RegsheetResult<String> {
    let mut reader = Reader::from_str(workbook_xml);
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) => {
                for attr in e.attributes().with_checks(false) {
                    let attr = attr?;
                    let key = attr.key.as_ref();
                    if let Some(prefix) = key.strip_prefix(b"xmlns:") {
                        if attr.unescape_value()? == RELATIONSHIPS_NS {
                            return Ok(String::from_utf8_lossy(prefix).into_owned());
                        }
                    }
                }
                // Only the root element is inspected
                break;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Err(RegsheetError::Workbook(
        "workbook root does not declare the relationships namespace".to_string(),
    ))
}

/// Append a sheet entry at the end of `<sheets>`
pub(crate) fn append_sheet(workbook_xml: &str, sheet: &SheetEntry) -> RegsheetResult<String> {
    let rel_attr = format!("{}:id", relationships_prefix(workbook_xml)?);
    let sheet_id = sheet.sheet_id.to_string();
    xml::append_child(
        workbook_xml,
        b"sheets",
        "sheet",
        &[
            ("name", sheet.name.as_str()),
            ("sheetId", sheet_id.as_str()),
            (rel_attr.as_str(), sheet.rel_id.as_str()),
        ],
    )
}

/// Rename the sheet bound to `rel_id`
pub(crate) fn rename_sheet(
    workbook_xml: &str,
    rel_id: &str,
    new_name: &str,
) -> RegsheetResult<String> {
    let (out, renamed) = xml::rewrite_elements(workbook_xml, b"sheet", |e| {
        if xml::prefixed_attr(e, b"id")?.as_deref() != Some(rel_id) {
            return Ok(None);
        }
        Ok(Some(xml::with_attr(e, "name", new_name)?))
    })?;
    if renamed == 0 {
        return Err(RegsheetError::Workbook(format!(
            "no sheet with relationship id {}",
            rel_id
        )));
    }
    Ok(out)
}

/// Ask spreadsheet applications to recalculate every formula when the file is opened.
///
/// Formulas in preserved sheets still carry cached values computed against the old data;
/// this makes them refresh against the sheets that were just rewritten.
pub(crate) fn ensure_full_calc_on_load(workbook_xml: &str) -> RegsheetResult<String> {
    let mut has_calc_pr = false;
    let (out, _) = xml::rewrite_elements(workbook_xml, b"calcPr", |e| {
        has_calc_pr = true;
        if xml::attr(e, b"fullCalcOnLoad")?.as_deref() == Some("1") {
            return Ok(None);
        }
        Ok(Some(xml::with_attr(e, "fullCalcOnLoad", "1")?))
    })?;
    if has_calc_pr {
        return Ok(out);
    }
    insert_calc_pr(workbook_xml)
}

fn insert_calc_pr(workbook_xml: &str) -> RegsheetResult<String> {
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::new());

    let mut depth = 0usize;
    let mut prefix = String::new();
    let mut inserted = false;

    loop {
        let event = reader.read_event()?;
        if !inserted && depth == 1 {
            let before_this = match &event {
                Event::Start(e) | Event::Empty(e) => {
                    AFTER_CALC_PR.contains(&xml::local_name(e.name().as_ref()))
                }
                Event::End(_) => true,
                _ => false,
            };
            if before_this {
                let mut calc_pr = BytesStart::new(format!("{}calcPr", prefix));
                calc_pr.push_attribute(("fullCalcOnLoad", "1"));
                writer.write_event(Event::Empty(calc_pr))?;
                inserted = true;
            }
        }
        match event {
            Event::Eof => break,
            Event::Start(ref e) => {
                if depth == 0 {
                    let name = e.name();
                    let full = name.as_ref();
                    let local = xml::local_name(full);
                    prefix = String::from_utf8_lossy(&full[..full.len() - local.len()]).into_owned();
                }
                depth += 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        writer.write_event(event.borrow())?;
    }

    if !inserted {
        return Err(RegsheetError::Workbook("workbook has no root element".to_string()));
    }
    Ok(String::from_utf8(writer.into_inner())?)
}
