//! Reshape a fitted model into a tidy coefficient table

use super::ols::FittedModel;
use crate::error::{RegsheetError, RegsheetResult};
use crate::types::{RegressionResult, TidyRow};
use std::collections::HashSet;

/// One row per term, in the model's term order. Values are copied as-is.
pub fn tidy(model: &FittedModel) -> RegsheetResult<RegressionResult> {
    let n_terms = model.terms.len();
    if n_terms == 0 {
        return Err(RegsheetError::InvalidModel("model has no terms".to_string()));
    }

    for (field, len) in [
        ("estimate", model.coefficients.len()),
        ("std.error", model.std_errors.len()),
        ("statistic", model.t_values.len()),
        ("p.value", model.p_values.len()),
    ] {
        if len != n_terms {
            return Err(RegsheetError::InvalidModel(format!(
                "{} terms but {} {} values",
                n_terms, len, field
            )));
        }
    }

    let mut seen = HashSet::new();
    for term in &model.terms {
        if term.trim().is_empty() {
            return Err(RegsheetError::InvalidModel("blank term name".to_string()));
        }
        if !seen.insert(term.as_str()) {
            return Err(RegsheetError::InvalidModel(format!(
                "duplicate term '{}'",
                term
            )));
        }
    }

    let rows = (0..n_terms)
        .map(|i| {
            TidyRow::new(
                model.terms[i].clone(),
                model.coefficients[i],
                model.std_errors[i],
                model.t_values[i],
                model.p_values[i],
            )
        })
        .collect();

    Ok(RegressionResult::new(rows))
}
