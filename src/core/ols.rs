//! Ordinary least squares with classical inference
//!
//! The normal equations `(XᵀX)β = Xᵀy` are factored once with faer's Cholesky. The same
//! factorization yields `(XᵀX)⁻¹`, hence the coefficient covariance `σ²(XᵀX)⁻¹`.
//! Two-sided p-values use the Student-t survival function with `n - p` degrees of freedom.

use crate::error::{RegsheetError, RegsheetResult};
use crate::types::{Dataset, INTERCEPT_TERM};
use faer::prelude::SolverCore;
use faer::{Col, Mat, Side};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Smallest share of a column's sum of squares left unexplained by the columns before it
const RANK_TOL: f64 = 1e-10;

/// A fitted linear model: one entry per term in every vector, intercept first
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    pub terms: Vec<String>,
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub t_values: Vec<f64>,
    pub p_values: Vec<f64>,
    pub df_residual: usize,
    pub r_squared: f64,
    /// Residual standard error
    pub sigma: f64,
    pub n_observations: usize,
}

/// Fit `y ~ 1 + x1 + ... + xk` on a dataset
pub fn fit_ols(dataset: &Dataset) -> RegsheetResult<FittedModel> {
    let y = &dataset.response.values;
    let n = y.len();
    let p = dataset.predictors.len() + 1;

    for column in &dataset.predictors {
        if column.values.len() != n {
            return Err(RegsheetError::Regression(format!(
                "predictor '{}' has {} values but the response has {}",
                column.name,
                column.values.len(),
                n
            )));
        }
        if column.values.iter().any(|v| !v.is_finite()) {
            return Err(RegsheetError::Regression(format!(
                "predictor '{}' contains non-finite values",
                column.name
            )));
        }
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(RegsheetError::Regression(
            "response contains non-finite values".to_string(),
        ));
    }
    if n <= p {
        return Err(RegsheetError::Regression(format!(
            "{} observations are not enough to estimate {} terms",
            n, p
        )));
    }

    // Design matrix: [1, x1, ..., xk]
    let x_mat = Mat::from_fn(n, p, |i, j| {
        if j == 0 {
            1.0
        } else {
            dataset.predictors[j - 1].values[i]
        }
    });
    let y_col = Col::from_fn(n, |i| y[i]);

    let xtx = x_mat.transpose() * x_mat.as_ref();
    let xty = x_mat.transpose() * y_col.as_ref();

    let singular = || {
        RegsheetError::Regression(
            "design matrix is singular (collinear or constant predictors)".to_string(),
        )
    };
    let cholesky = xtx.as_ref().cholesky(Side::Lower).map_err(|_| singular())?;
    let lower = cholesky.compute_l();
    for j in 0..p {
        let pivot = lower.read(j, j);
        if pivot * pivot <= RANK_TOL * xtx.read(j, j) {
            return Err(singular());
        }
    }

    let inverse = cholesky.inverse();
    let beta = inverse.as_ref() * xty.as_ref();
    let coefficients: Vec<f64> = (0..p).map(|j| beta.read(j)).collect();

    let fitted = x_mat.as_ref() * beta.as_ref();
    let mean_y = y.iter().sum::<f64>() / n as f64;
    let mut rss = 0.0;
    let mut tss = 0.0;
    for (i, &yi) in y.iter().enumerate() {
        rss += (yi - fitted.read(i)).powi(2);
        tss += (yi - mean_y).powi(2);
    }

    let df_residual = n - p;
    let sigma2 = rss / df_residual as f64;
    let t_dist = StudentsT::new(0.0, 1.0, df_residual as f64)
        .map_err(|e| RegsheetError::Regression(format!("t distribution: {}", e)))?;

    let std_errors: Vec<f64> = (0..p)
        .map(|j| (sigma2 * inverse.read(j, j)).max(0.0).sqrt())
        .collect();
    let t_values: Vec<f64> = coefficients
        .iter()
        .zip(&std_errors)
        .map(|(beta, se)| beta / se)
        .collect();
    // upper tail directly, 1 - cdf cancels to 0 for large |t|
    let p_values: Vec<f64> = t_values
        .iter()
        .map(|t| {
            if t.is_nan() {
                f64::NAN
            } else {
                (2.0 * t_dist.sf(t.abs())).clamp(0.0, 1.0)
            }
        })
        .collect();

    let terms = std::iter::once(INTERCEPT_TERM.to_string())
        .chain(dataset.predictors.iter().map(|c| c.name.clone()))
        .collect();

    Ok(FittedModel {
        terms,
        coefficients,
        std_errors,
        t_values,
        p_values,
        df_residual,
        r_squared: if tss > 0.0 { 1.0 - rss / tss } else { f64::NAN },
        sigma: sigma2.sqrt(),
        n_observations: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Series;

    fn dataset(x: Vec<Vec<f64>>, y: Vec<f64>) -> Dataset {
        Dataset {
            name: "test".to_string(),
            predictors: x
                .into_iter()
                .enumerate()
                .map(|(i, v)| Series::new(format!("x{}", i + 1), v))
                .collect(),
            response: Series::new("y", y),
        }
    }

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_simple_regression_textbook_values() {
        // y = 1 + 2x with residuals (0.1, -0.1, -0.1, 0.1, 0)
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![3.1, 4.9, 6.9, 9.1, 11.0];
        let model = fit_ols(&dataset(vec![x], y)).unwrap();

        assert_eq!(model.terms, vec!["(Intercept)", "x1"]);
        assert_eq!(model.df_residual, 3);
        assert!(close(model.coefficients[0], 1.0, 1e-9), "{:?}", model.coefficients);
        assert!(close(model.coefficients[1], 2.0, 1e-9), "{:?}", model.coefficients);

        // RSS = 0.04, sigma² = 0.04/3, Sxx = 10
        let sigma2: f64 = 0.04 / 3.0;
        assert!(close(model.std_errors[1], (sigma2 / 10.0).sqrt(), 1e-9));
        assert!(close(model.std_errors[0], (sigma2 * (0.2 + 9.0 / 10.0)).sqrt(), 1e-9));
        assert!(close(model.t_values[1], 2.0 / model.std_errors[1], 1e-9));
        assert!(model.p_values[1] < 1e-4);
        assert!(model.r_squared > 0.99);
    }

    #[test]
    fn test_recovers_coefficients_on_noiseless_data() {
        let x1: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let x2: Vec<f64> = (0..20).map(|i| ((i * 7) % 11) as f64).collect();
        let y: Vec<f64> = x1
            .iter()
            .zip(&x2)
            .map(|(a, b)| 0.5 + 1.5 * a - 2.0 * b)
            .collect();
        let model = fit_ols(&dataset(vec![x1, x2], y)).unwrap();

        assert!(close(model.coefficients[0], 0.5, 1e-8));
        assert!(close(model.coefficients[1], 1.5, 1e-8));
        assert!(close(model.coefficients[2], -2.0, 1e-8));
    }

    #[test]
    fn test_p_value_of_null_effect_is_large() {
        // x has no relation to y (y symmetric around x's center)
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = vec![1.0, 3.0, 2.0, 2.0, 3.0, 1.0];
        let model = fit_ols(&dataset(vec![x], y)).unwrap();
        assert!(close(model.coefficients[1], 0.0, 1e-9));
        assert!(model.p_values[1] > 0.9);
        assert!(model.p_values.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_intercept_only_model() {
        let model = fit_ols(&dataset(vec![], vec![1.0, 2.0, 3.0])).unwrap();
        assert_eq!(model.terms, vec!["(Intercept)"]);
        assert!(close(model.coefficients[0], 2.0, 1e-12));
        assert_eq!(model.df_residual, 2);
    }

    #[test]
    fn test_collinear_predictors_are_singular() {
        let x1 = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let x2: Vec<f64> = x1.iter().map(|v| v * 2.0).collect();
        let err = fit_ols(&dataset(vec![x1, x2], vec![1.0, 2.0, 2.5, 4.0, 5.5])).unwrap_err();
        assert!(err.to_string().contains("singular"));
    }

    #[test]
    fn test_too_few_observations() {
        let err = fit_ols(&dataset(vec![vec![1.0, 2.0]], vec![1.0, 2.0])).unwrap_err();
        assert!(matches!(err, RegsheetError::Regression(_)));
    }

    #[test]
    fn test_length_mismatch() {
        let err = fit_ols(&dataset(vec![vec![1.0, 2.0, 3.0]], vec![1.0, 2.0, 3.0, 4.0]))
            .unwrap_err();
        assert!(err.to_string().contains("x1"));
    }

    #[test]
    fn test_non_finite_input() {
        let err = fit_ols(&dataset(
            vec![vec![1.0, f64::NAN, 3.0, 4.0]],
            vec![1.0, 2.0, 3.0, 4.0],
        ))
        .unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn test_strong_effect_keeps_a_positive_p_value() {
        // slope 2 against noise in [-5, 5]: t lands near 20, where 1 - cdf is exactly 0
        let x: Vec<f64> = (0..100).map(|i| i as f64 / 10.0).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, xi)| 2.0 * xi + ((i * 37) % 11) as f64 - 5.0)
            .collect();
        let model = fit_ols(&dataset(vec![x], y)).unwrap();

        assert!(model.t_values[1] > 10.0 && model.t_values[1] < 40.0, "{:?}", model.t_values);
        assert!(model.p_values[1] > 0.0, "{:?}", model.p_values);
        assert!(model.p_values[1] < 1e-15, "{:?}", model.p_values);
    }

    #[test]
    fn test_small_magnitude_predictor_is_not_singular() {
        let x1: Vec<f64> = (0..20).map(|i| i as f64 * 1e-9).collect();
        let x2: Vec<f64> = (0..20).map(|i| ((i * 7) % 11) as f64 * 1e-9).collect();
        let y: Vec<f64> = x1
            .iter()
            .zip(&x2)
            .enumerate()
            .map(|(i, (a, b))| 3.0 + 2e9 * a - 1e9 * b + ((i * 5) % 3) as f64 * 0.01)
            .collect();
        let model = fit_ols(&dataset(vec![x1, x2], y)).unwrap();

        assert!(close(model.coefficients[1] / 1e9, 2.0, 1e-2), "{:?}", model.coefficients);
        assert!(close(model.coefficients[2] / 1e9, -1.0, 1e-2), "{:?}", model.coefficients);
    }

    #[test]
    fn test_constant_predictor_is_singular() {
        let x = vec![4.0; 6];
        let err = fit_ols(&dataset(vec![x], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])).unwrap_err();
        assert!(err.to_string().contains("singular"));
    }
}
