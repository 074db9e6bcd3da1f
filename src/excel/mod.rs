//! XLSX workbook publishing
//!
//! - Merge: write tidy tables into named sheets, preserving every other sheet
//! - Import: read published tables back (calamine)

mod importer;
mod merger;
mod package;
mod relationships;
mod sheet_name;
mod sheet_writer;
mod workbook_xml;
mod xml;

pub use importer::ExcelImporter;
pub use merger::{merge, MergeReport};
pub use package::{load_or_create, LoadedWorkbook, XlsxPackage};
pub use sheet_name::{same_sheet_name, validate_sheet_name, MAX_SHEET_NAME_LEN};
pub use sheet_writer::{cell_ref, column_letter, render_worksheet};
