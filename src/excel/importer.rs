//! Read published coefficient tables back out of a workbook

use crate::error::{RegsheetError, RegsheetResult};
use crate::types::{NamedResultSet, RegressionResult, TidyRow, TIDY_COLUMNS};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use std::io::BufReader;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Reads sheets of an `.xlsx` file as tidy coefficient tables
pub struct ExcelImporter {
    path: PathBuf,
}

impl ExcelImporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn open(&self) -> RegsheetResult<Xlsx<BufReader<File>>> {
        open_workbook(&self.path).map_err(|e: calamine::XlsxError| self.access_error(e))
    }

    fn access_error(&self, e: impl std::fmt::Display) -> RegsheetError {
        RegsheetError::FileAccess {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }

    /// Sheet names in tab order
    pub fn sheet_names(&self) -> RegsheetResult<Vec<String>> {
        Ok(self.open()?.sheet_names().to_vec())
    }

    /// Read one sheet as a coefficient table.
    ///
    /// The sheet must start with the `term, estimate, std.error, statistic, p.value` header.
    /// Error cells such as `#NUM!` come back as NaN.
    pub fn read_result(&self, sheet: &str) -> RegsheetResult<RegressionResult> {
        let mut workbook = self.open()?;
        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| self.access_error(e))?;
        parse_table(sheet, &range)
    }

    /// Every sheet laid out as a coefficient table; other sheets are skipped
    pub fn read_tables(&self) -> RegsheetResult<NamedResultSet> {
        let mut workbook = self.open()?;
        let mut tables = NamedResultSet::new();

        for sheet in workbook.sheet_names().to_vec() {
            let Ok(range) = workbook.worksheet_range(&sheet) else {
                continue;
            };
            if has_tidy_header(&range) {
                tables.insert(sheet.clone(), parse_table(&sheet, &range)?);
            }
        }

        Ok(tables)
    }
}

fn has_tidy_header(range: &Range<Data>) -> bool {
    range.start() == Some((0, 0))
        && range.width() >= TIDY_COLUMNS.len()
        && TIDY_COLUMNS
            .iter()
            .enumerate()
            .all(|(col, name)| matches!(range.get((0, col)), Some(Data::String(s)) if s == name))
}

fn parse_table(sheet: &str, range: &Range<Data>) -> RegsheetResult<RegressionResult> {
    if !has_tidy_header(range) {
        return Err(RegsheetError::Workbook(format!(
            "sheet '{}' does not start with the header {}",
            sheet,
            TIDY_COLUMNS.join(", ")
        )));
    }

    let mut rows = Vec::new();
    for (idx, cells) in range.rows().enumerate().skip(1) {
        let term = match cells.first() {
            Some(Data::String(s)) => s.clone(),
            Some(Data::Empty) | None => continue,
            Some(other) => other.to_string(),
        };
        let number = |col: usize| cell_number(sheet, idx, col, cells.get(col));
        rows.push(TidyRow::new(term, number(1)?, number(2)?, number(3)?, number(4)?));
    }

    Ok(RegressionResult::new(rows))
}

fn cell_number(sheet: &str, row: usize, col: usize, cell: Option<&Data>) -> RegsheetResult<f64> {
    match cell {
        Some(Data::Float(f)) => Ok(*f),
        Some(Data::Int(i)) => Ok(*i as f64),
        Some(Data::Error(_)) => Ok(f64::NAN),
        other => Err(RegsheetError::Workbook(format!(
            "sheet '{}' cell {} is not a number: {:?}",
            sheet,
            super::sheet_writer::cell_ref(row, col),
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::merger::merge;
    use tempfile::TempDir;

    fn sample() -> RegressionResult {
        RegressionResult::new(vec![
            TidyRow::new("(Intercept)", 0.135, 0.096, 1.405, 0.163),
            TidyRow::new("x1", 1.867, 0.1, 18.67, 1e-30),
        ])
    }

    #[test]
    fn test_read_back_published_sheet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");
        let set: NamedResultSet = [("Regression1", sample())].into_iter().collect();
        merge(&set, &path).unwrap();

        let importer = ExcelImporter::new(&path);
        assert_eq!(importer.sheet_names().unwrap(), vec!["Regression1"]);
        assert_eq!(importer.read_result("Regression1").unwrap(), sample());
        assert_eq!(importer.read_tables().unwrap(), set);
    }

    #[test]
    fn test_error_cells_read_as_nan() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");
        let result = RegressionResult::new(vec![TidyRow::new("x1", 1.0, 0.0, f64::INFINITY, f64::NAN)]);
        let set: NamedResultSet = [("Regression1", result)].into_iter().collect();
        merge(&set, &path).unwrap();

        let back = ExcelImporter::new(&path).read_result("Regression1").unwrap();
        let row = back.term("x1").unwrap();
        assert_eq!(row.estimate, 1.0);
        assert!(row.statistic.is_nan());
        assert!(row.p_value.is_nan());
    }

    #[test]
    fn test_missing_file_is_file_access_error() {
        let dir = TempDir::new().unwrap();
        let importer = ExcelImporter::new(dir.path().join("absent.xlsx"));
        assert!(matches!(
            importer.sheet_names(),
            Err(RegsheetError::FileAccess { .. })
        ));
    }

    #[test]
    fn test_unknown_sheet_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");
        let set: NamedResultSet = [("Regression1", sample())].into_iter().collect();
        merge(&set, &path).unwrap();

        assert!(ExcelImporter::new(&path).read_result("Nope").is_err());
    }
}
