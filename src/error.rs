use std::path::{Path, PathBuf};
use thiserror::Error;

pub type RegsheetResult<T> = Result<T, RegsheetError>;

#[derive(Error, Debug)]
pub enum RegsheetError {
    #[error("Cannot access workbook '{}': {reason}", path.display())]
    FileAccess { path: PathBuf, reason: String },

    #[error("Invalid sheet name '{name}': {reason}")]
    InvalidSheetName { name: String, reason: String },

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Regression error: {0}")]
    Regression(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed workbook: {0}")]
    Workbook(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl RegsheetError {
    /// Fold low-level read/write failures on `path` into [`RegsheetError::FileAccess`].
    ///
    /// Errors that already carry caller-facing meaning (bad sheet names, bad models)
    /// pass through unchanged.
    pub fn into_file_access(self, path: &Path) -> Self {
        match self {
            RegsheetError::FileAccess { .. }
            | RegsheetError::InvalidSheetName { .. }
            | RegsheetError::InvalidModel(_)
            | RegsheetError::Regression(_)
            | RegsheetError::Validation(_) => self,
            other => RegsheetError::FileAccess {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_file_access_wraps_low_level_errors() {
        let err = RegsheetError::Workbook("missing xl/workbook.xml".to_string());
        match err.into_file_access(Path::new("out.xlsx")) {
            RegsheetError::FileAccess { path, reason } => {
                assert_eq!(path, PathBuf::from("out.xlsx"));
                assert!(reason.contains("missing xl/workbook.xml"));
            }
            other => panic!("expected FileAccess, got {other:?}"),
        }
    }

    #[test]
    fn test_into_file_access_keeps_sheet_name_errors() {
        let err = RegsheetError::InvalidSheetName {
            name: "a/b".to_string(),
            reason: "contains '/'".to_string(),
        };
        assert!(matches!(
            err.into_file_access(Path::new("out.xlsx")),
            RegsheetError::InvalidSheetName { .. }
        ));
    }
}
