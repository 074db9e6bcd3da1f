//! Render a tidy result as a standalone worksheet part

use crate::error::RegsheetResult;
use crate::types::{RegressionResult, TIDY_COLUMNS};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Convert a zero-based column index to letters
///
/// Examples:
/// - 0 → A
/// - 25 → Z
/// - 26 → AA
pub fn column_letter(index: usize) -> String {
    let mut result = String::new();
    let mut idx = index;

    loop {
        let remainder = idx % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }

    result
}

/// A1-style reference for zero-based `(row, col)`
pub fn cell_ref(row: usize, col: usize) -> String {
    format!("{}{}", column_letter(col), row + 1)
}

/// Worksheet XML with the tidy header in row 1 and one row per term below it.
///
/// Text goes in inline strings so the workbook's shared-string table is never touched.
/// Numbers that cannot be stored in a cell (NaN, ±∞) are written as `#NUM!`.
pub fn render_worksheet(result: &RegressionResult) -> RegsheetResult<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut root = BytesStart::new("worksheet");
    root.push_attribute(("xmlns", MAIN_NS));
    root.push_attribute(("xmlns:r", RELATIONSHIPS_NS));
    writer.write_event(Event::Start(root))?;

    let last = cell_ref(result.len(), TIDY_COLUMNS.len() - 1);
    let mut dimension = BytesStart::new("dimension");
    dimension.push_attribute(("ref", format!("A1:{}", last).as_str()));
    writer.write_event(Event::Empty(dimension))?;

    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;

    start_row(&mut writer, 0)?;
    for (col, header) in TIDY_COLUMNS.iter().enumerate() {
        write_text_cell(&mut writer, 0, col, header)?;
    }
    writer.write_event(Event::End(BytesEnd::new("row")))?;

    for (idx, row) in result.rows().iter().enumerate() {
        let r = idx + 1;
        start_row(&mut writer, r)?;
        write_text_cell(&mut writer, r, 0, &row.term)?;
        for (offset, value) in row.numbers().into_iter().enumerate() {
            write_number_cell(&mut writer, r, offset + 1, value)?;
        }
        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;

    Ok(writer.into_inner())
}

fn start_row(writer: &mut Writer<Vec<u8>>, row: usize) -> RegsheetResult<()> {
    let mut elem = BytesStart::new("row");
    elem.push_attribute(("r", (row + 1).to_string().as_str()));
    writer.write_event(Event::Start(elem))?;
    Ok(())
}

fn write_text_cell(
    writer: &mut Writer<Vec<u8>>,
    row: usize,
    col: usize,
    text: &str,
) -> RegsheetResult<()> {
    let mut cell = BytesStart::new("c");
    cell.push_attribute(("r", cell_ref(row, col).as_str()));
    cell.push_attribute(("t", "inlineStr"));
    writer.write_event(Event::Start(cell))?;
    writer.write_event(Event::Start(BytesStart::new("is")))?;

    let mut t = BytesStart::new("t");
    if text.trim() != text {
        t.push_attribute(("xml:space", "preserve"));
    }
    writer.write_event(Event::Start(t))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new("t")))?;

    writer.write_event(Event::End(BytesEnd::new("is")))?;
    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

fn write_number_cell(
    writer: &mut Writer<Vec<u8>>,
    row: usize,
    col: usize,
    value: f64,
) -> RegsheetResult<()> {
    let mut cell = BytesStart::new("c");
    cell.push_attribute(("r", cell_ref(row, col).as_str()));
    let text = if value.is_finite() {
        // shortest round-trip form, exponent notation for tiny p-values
        format!("{:?}", value)
    } else {
        cell.push_attribute(("t", "e"));
        "#NUM!".to_string()
    };
    writer.write_event(Event::Start(cell))?;
    writer.write_event(Event::Start(BytesStart::new("v")))?;
    writer.write_event(Event::Text(BytesText::new(&text)))?;
    writer.write_event(Event::End(BytesEnd::new("v")))?;
    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}
