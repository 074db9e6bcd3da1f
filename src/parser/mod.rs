use crate::error::{RegsheetError, RegsheetResult};
use crate::types::{JobConfig, RegressionSpec, INTERCEPT_TERM};
use std::collections::HashSet;
use std::path::Path;

/// Parse a regsheet job file.
///
/// The job lists the datasets to simulate, the sheet each fit is published to, and the
/// output workbook. Parsing validates the job before returning it.
///
/// # Example
/// ```no_run
/// use royalbit_regsheet::parser::parse_job;
/// use std::path::Path;
///
/// let job = parse_job(Path::new("job.yaml"))?;
/// println!("Regressions: {}", job.regressions.len());
/// # Ok::<(), royalbit_regsheet::error::RegsheetError>(())
/// ```
pub fn parse_job(path: &Path) -> RegsheetResult<JobConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_job_str(&content)
}

/// Parse a job from YAML text
pub fn parse_job_str(content: &str) -> RegsheetResult<JobConfig> {
    let job: JobConfig = serde_yaml::from_str(content)?;
    validate_job(&job)?;
    Ok(job)
}

/// Serialize a job to YAML and write it to `path`
pub fn write_job(path: &Path, job: &JobConfig) -> RegsheetResult<()> {
    validate_job(job)?;
    let yaml = serde_yaml::to_string(job)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Check a job for problems the generator or solver would otherwise hit later.
///
/// Sheet names are checked by the workbook merger, not here.
pub fn validate_job(job: &JobConfig) -> RegsheetResult<()> {
    if job.regressions.is_empty() {
        return Err(RegsheetError::Validation(
            "Job must define at least one regression".to_string(),
        ));
    }
    if job.output.trim().is_empty() {
        return Err(RegsheetError::Validation(
            "Output path must not be empty".to_string(),
        ));
    }

    let mut sheets = HashSet::new();
    for spec in &job.regressions {
        if !sheets.insert(spec.sheet.to_lowercase()) {
            return Err(RegsheetError::Validation(format!(
                "Sheet '{}' is targeted by more than one regression",
                spec.sheet
            )));
        }
        validate_regression(spec)?;
    }

    Ok(())
}

fn validate_regression(spec: &RegressionSpec) -> RegsheetResult<()> {
    let terms = spec.predictors.len() + 1;
    if spec.observations <= terms {
        return Err(RegsheetError::Validation(format!(
            "Regression '{}' needs more than {} observations for {} terms, got {}",
            spec.sheet, terms, terms, spec.observations
        )));
    }

    if !spec.noise_sd.is_finite() || spec.noise_sd < 0.0 {
        return Err(RegsheetError::Validation(format!(
            "Regression '{}' has invalid noise_sd {}",
            spec.sheet, spec.noise_sd
        )));
    }
    if !spec.intercept.is_finite() {
        return Err(RegsheetError::Validation(format!(
            "Regression '{}' has a non-finite intercept",
            spec.sheet
        )));
    }

    let mut names = HashSet::new();
    for predictor in &spec.predictors {
        let name = predictor.name.trim();
        if name.is_empty() {
            return Err(RegsheetError::Validation(format!(
                "Regression '{}' has a predictor with an empty name",
                spec.sheet
            )));
        }
        if name == "y" || name == INTERCEPT_TERM {
            return Err(RegsheetError::Validation(format!(
                "Regression '{}': predictor name '{}' is reserved",
                spec.sheet, name
            )));
        }
        if !names.insert(name) {
            return Err(RegsheetError::Validation(format!(
                "Regression '{}': duplicate predictor '{}'",
                spec.sheet, name
            )));
        }
        if !predictor.coefficient.is_finite() {
            return Err(RegsheetError::Validation(format!(
                "Regression '{}': predictor '{}' has a non-finite coefficient",
                spec.sheet, name
            )));
        }
    }

    Ok(())
}
