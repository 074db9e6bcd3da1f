use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

//==============================================================================
// Tidy Regression Output
//==============================================================================

/// Column headers of a tidy coefficient table, in sheet order.
pub const TIDY_COLUMNS: [&str; 5] = ["term", "estimate", "std.error", "statistic", "p.value"];

/// Name of the intercept term
pub const INTERCEPT_TERM: &str = "(Intercept)";

/// One model term with its estimate and inference statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyRow {
    pub term: String,
    pub estimate: f64,
    #[serde(rename = "std.error")]
    pub std_error: f64,
    pub statistic: f64,
    #[serde(rename = "p.value")]
    pub p_value: f64,
}

impl TidyRow {
    pub fn new(
        term: impl Into<String>,
        estimate: f64,
        std_error: f64,
        statistic: f64,
        p_value: f64,
    ) -> Self {
        Self {
            term: term.into(),
            estimate,
            std_error,
            statistic,
            p_value,
        }
    }

    /// Numeric cells in [`TIDY_COLUMNS`] order (after `term`)
    pub fn numbers(&self) -> [f64; 4] {
        [self.estimate, self.std_error, self.statistic, self.p_value]
    }
}

/// Tidy coefficient table of one fitted model: one row per term,
/// intercept first, then predictors in fitting order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegressionResult {
    rows: Vec<TidyRow>,
}

impl RegressionResult {
    pub fn new(rows: Vec<TidyRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[TidyRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a row by term name
    pub fn term(&self, name: &str) -> Option<&TidyRow> {
        self.rows.iter().find(|row| row.term == name)
    }

    pub fn terms(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.term.as_str()).collect()
    }
}

/// Sheet name → tidy result. The unit of work handed to the workbook merger.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NamedResultSet {
    sheets: BTreeMap<String, RegressionResult>,
}

impl NamedResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the result for `sheet`
    pub fn insert(&mut self, sheet: impl Into<String>, result: RegressionResult) {
        self.sheets.insert(sheet.into(), result);
    }

    pub fn get(&self, sheet: &str) -> Option<&RegressionResult> {
        self.sheets.get(sheet)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegressionResult)> {
        self.sheets.iter().map(|(name, result)| (name.as_str(), result))
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.keys().map(|name| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, RegressionResult)> for NamedResultSet {
    fn from_iter<I: IntoIterator<Item = (S, RegressionResult)>>(iter: I) -> Self {
        let mut set = NamedResultSet::new();
        for (sheet, result) in iter {
            set.insert(sheet, result);
        }
        set
    }
}

//==============================================================================
// Synthetic Data
//==============================================================================

/// A named numeric column
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Generated dataset: predictors in declaration order plus the response `y`
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub predictors: Vec<Series>,
    pub response: Series,
}

impl Dataset {
    pub fn observations(&self) -> usize {
        self.response.values.len()
    }

    pub fn predictor(&self, name: &str) -> Option<&Series> {
        self.predictors.iter().find(|series| series.name == name)
    }
}

//==============================================================================
// Job Configuration
//==============================================================================

/// Default workbook written by `regsheet run`
pub const DEFAULT_OUTPUT: &str = "regressions.xlsx";

/// One predictor and its true coefficient in the generating model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorSpec {
    pub name: String,
    pub coefficient: f64,
}

impl PredictorSpec {
    pub fn new(name: impl Into<String>, coefficient: f64) -> Self {
        Self {
            name: name.into(),
            coefficient,
        }
    }
}

fn default_noise_sd() -> f64 {
    1.0
}

/// How to simulate one dataset and where its fit is published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionSpec {
    /// Target sheet name
    pub sheet: String,
    pub observations: usize,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default = "default_noise_sd")]
    pub noise_sd: f64,
    #[serde(default)]
    pub predictors: Vec<PredictorSpec>,
}

/// A `regsheet run` job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default = "default_output")]
    pub output: String,
    /// Base seed; dataset `i` is drawn with `seed + i`. Unset means fresh entropy per run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub regressions: Vec<RegressionSpec>,
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

impl JobConfig {
    /// The built-in two-model job publishing `Regression1` and `Regression2`
    pub fn reference() -> Self {
        Self {
            output: default_output(),
            seed: None,
            regressions: vec![
                RegressionSpec {
                    sheet: "Regression1".to_string(),
                    observations: 100,
                    intercept: 0.0,
                    noise_sd: 1.0,
                    predictors: vec![PredictorSpec::new("x1", 2.0)],
                },
                RegressionSpec {
                    sheet: "Regression2".to_string(),
                    observations: 100,
                    intercept: 1.0,
                    noise_sd: 1.0,
                    predictors: vec![
                        PredictorSpec::new("x1", 0.5),
                        PredictorSpec::new("x2", -1.5),
                    ],
                },
            ],
        }
    }

    /// Seed for the dataset at `index`, if the job is seeded
    pub fn dataset_seed(&self, index: usize) -> Option<u64> {
        self.seed.map(|seed| seed.wrapping_add(index as u64))
    }
}
