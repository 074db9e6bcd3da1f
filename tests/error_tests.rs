//! Error handling tests

use royalbit_regsheet::core::{fit_ols, tidy, FittedModel};
use royalbit_regsheet::error::RegsheetError;
use royalbit_regsheet::excel::validate_sheet_name;
use royalbit_regsheet::parser::parse_job_str;
use royalbit_regsheet::types::{Dataset, Series};
use std::path::{Path, PathBuf};

#[test]
fn test_file_access_error_display() {
    let err = RegsheetError::FileAccess {
        path: PathBuf::from("report.xlsx"),
        reason: "permission denied".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Cannot access workbook 'report.xlsx': permission denied"
    );
}

#[test]
fn test_invalid_sheet_name_error_display() {
    let err = validate_sheet_name("a:b").unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("Invalid sheet name 'a:b'"), "{msg}");
    assert!(msg.contains("':'"), "{msg}");
}

#[test]
fn test_invalid_model_error_display() {
    let err = RegsheetError::InvalidModel("3 terms but 2 estimates".to_string());
    assert_eq!(err.to_string(), "Invalid model: 3 terms but 2 estimates");
}

#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: RegsheetError = io_err.into();
    assert!(matches!(err, RegsheetError::Io(_)));
    assert!(err.to_string().contains("file not found"));
}

#[test]
fn test_yaml_error_conversion() {
    let err = parse_job_str("regressions: [unclosed").unwrap_err();
    assert!(matches!(err, RegsheetError::Yaml(_)));
}

#[test]
fn test_into_file_access_keeps_semantic_errors() {
    let path = Path::new("out.xlsx");

    let err = RegsheetError::InvalidSheetName {
        name: String::new(),
        reason: "name is empty".to_string(),
    }
    .into_file_access(path);
    assert!(matches!(err, RegsheetError::InvalidSheetName { .. }));

    let err = RegsheetError::Io(std::io::Error::other("disk full")).into_file_access(path);
    match err {
        RegsheetError::FileAccess { path: p, reason } => {
            assert_eq!(p, PathBuf::from("out.xlsx"));
            assert!(reason.contains("disk full"));
        }
        other => panic!("expected FileAccess, got {other:?}"),
    }
}

#[test]
fn test_singular_design_is_a_regression_error() {
    let dataset = Dataset {
        name: "collinear".to_string(),
        predictors: vec![
            Series::new("x1", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            Series::new("x2", vec![2.0, 4.0, 6.0, 8.0, 10.0]),
        ],
        response: Series::new("y", vec![1.0, 2.0, 2.5, 4.0, 5.5]),
    };
    assert!(matches!(fit_ols(&dataset), Err(RegsheetError::Regression(_))));
}

#[test]
fn test_malformed_model_is_an_invalid_model_error() {
    let model = FittedModel {
        terms: vec!["(Intercept)".to_string(), "x1".to_string()],
        coefficients: vec![1.0],
        std_errors: vec![0.1, 0.2],
        t_values: vec![10.0, 5.0],
        p_values: vec![0.001, 0.01],
        df_residual: 8,
        r_squared: 0.9,
        sigma: 0.5,
        n_observations: 10,
    };
    assert!(matches!(tidy(&model), Err(RegsheetError::InvalidModel(_))));
}
