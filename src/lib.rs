//! Regsheet - OLS regressions published as tidy tables into XLSX workbooks
//!
//! This library simulates datasets, fits ordinary least squares models, reshapes the
//! coefficients into tidy tables, and merges those tables into named sheets of a workbook.
//!
//! # Features
//!
//! - Seedable synthetic data with a known linear model
//! - OLS with standard errors, t statistics and two-sided p-values
//! - Tidy tables: `term, estimate, std.error, statistic, p.value`
//! - Idempotent create-or-update of named sheets; other sheets and their formulas are
//!   left exactly as they were
//!
//! # Example
//!
//! ```no_run
//! use royalbit_regsheet::core::run_job;
//! use royalbit_regsheet::excel::merge;
//! use royalbit_regsheet::types::JobConfig;
//! use std::path::Path;
//!
//! let job = JobConfig::reference();
//! let results = run_job(&job)?;
//! let report = merge(&results, Path::new(&job.output))?;
//!
//! println!("Sheets written: {}", report.written());
//! # Ok::<(), royalbit_regsheet::error::RegsheetError>(())
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod excel;
pub mod parser;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use error::{RegsheetError, RegsheetResult};
pub use excel::{merge, MergeReport};
pub use types::{JobConfig, NamedResultSet, RegressionResult, TidyRow};
