use serde::{Deserialize, Serialize};

use crate::analysis::{FitResult, FitStatus};
use crate::models::ParameterVector;

/// Goodness-of-fit statistics derived from a converged [`FitResult`].
///
/// AIC and BIC use the Gaussian log-likelihood of a least-squares fit and
/// count the residual variance as a parameter, so values are comparable
/// across the three growth models fitted to the same breed group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitMetrics {
    pub n: usize,
    /// Number of curve parameters (A, B, k)
    pub n_params: usize,
    pub rss: f64,
    /// `None` when the residual sum of squares is zero
    pub log_likelihood: Option<f64>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    /// `None` when the observed weights have no variance
    pub r_squared: Option<f64>,
}

/// Convergence diagnostics passed through from a [`FitResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceInfo {
    pub status: FitStatus,
    pub iterations: usize,
    pub tolerance: Option<f64>,
    pub stop_code: i32,
    pub stop_message: String,
}

/// Compute metrics for a fit; `None` if the fit did not converge.
pub fn evaluate(fit: &FitResult) -> Option<FitMetrics> {
    let rss = fit.rss()?;
    let n = fit.residuals.len();
    let n_params = ParameterVector::LEN;
    let log_likelihood = gaussian_log_likelihood(rss, n);

    Some(FitMetrics {
        n,
        n_params,
        rss,
        log_likelihood,
        aic: log_likelihood.map(|ll| aic(ll, n_params)),
        bic: log_likelihood.map(|ll| bic(ll, n, n_params)),
        r_squared: r_squared(&fit.fitted, &fit.residuals),
    })
}

/// Convergence status, iteration count, final tolerance and stop code.
pub fn convergence(fit: &FitResult) -> ConvergenceInfo {
    ConvergenceInfo {
        status: fit.status,
        iterations: fit.iterations,
        tolerance: fit.tolerance,
        stop_code: fit.stop_reason.code(),
        stop_message: fit.stop_message.clone(),
    }
}

/// Maximised Gaussian log-likelihood of a least-squares fit:
/// `-n/2 * (ln(2π) + 1 - ln(n) + ln(RSS))`.
pub fn gaussian_log_likelihood(rss: f64, n: usize) -> Option<f64> {
    if n == 0 || !rss.is_finite() || rss <= 0.0 {
        return None;
    }
    let n = n as f64;
    Some(-0.5 * n * ((2.0 * std::f64::consts::PI).ln() + 1.0 - n.ln() + rss.ln()))
}

/// `-2 logL + 2 (p + 1)`; the extra parameter is the residual variance.
pub fn aic(log_likelihood: f64, n_params: usize) -> f64 {
    -2.0 * log_likelihood + 2.0 * (n_params + 1) as f64
}

/// `-2 logL + ln(n) (p + 1)`.
pub fn bic(log_likelihood: f64, n: usize, n_params: usize) -> f64 {
    -2.0 * log_likelihood + (n as f64).ln() * (n_params + 1) as f64
}

/// `1 - RSS/TSS` with observed = fitted + residual.
pub fn r_squared(fitted: &[f64], residuals: &[f64]) -> Option<f64> {
    if fitted.is_empty() || fitted.len() != residuals.len() {
        return None;
    }
    let observed: Vec<f64> = fitted.iter().zip(residuals).map(|(f, r)| f + r).collect();
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    let tss: f64 = observed.iter().map(|y| (y - mean).powi(2)).sum();
    let scale: f64 = observed.iter().map(|y| y * y).sum();
    if !tss.is_finite() || tss <= f64::EPSILON * scale {
        return None;
    }
    let rss: f64 = residuals.iter().map(|r| r * r).sum();
    Some(1.0 - rss / tss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StopReason;
    use crate::models::{FittedParameters, GrowthModel, ParameterEstimate};
    use assert_approx_eq::assert_approx_eq;

    fn estimate(v: f64) -> ParameterEstimate {
        ParameterEstimate {
            estimate: v,
            std_error: Some(1.0),
            t_value: Some(v),
            p_value: Some(0.01),
        }
    }

    fn converged(fitted: Vec<f64>, residuals: Vec<f64>) -> FitResult {
        let ages = (0..fitted.len()).map(|i| i as f64).collect();
        FitResult {
            breed_group: "A".to_string(),
            model: GrowthModel::Logistic,
            status: FitStatus::Converged,
            start: ParameterVector::default(),
            parameters: Some(FittedParameters {
                a: estimate(500.0),
                b: estimate(5.0),
                k: estimate(0.1),
                residual_std_error: Some(1.0),
                degrees_of_freedom: fitted.len().saturating_sub(3),
            }),
            n_obs: fitted.len(),
            ages,
            fitted,
            residuals,
            iterations: 12,
            tolerance: Some(1e-9),
            stop_reason: StopReason::StepConverged,
            stop_message: "relative change in parameters within xtol".to_string(),
        }
    }

    fn failed() -> FitResult {
        FitResult {
            status: FitStatus::Failed,
            parameters: None,
            ages: vec![],
            fitted: vec![],
            residuals: vec![],
            iterations: 1000,
            tolerance: None,
            stop_reason: StopReason::IterationLimit,
            stop_message: "iteration limit of 1000 reached without convergence".to_string(),
            ..converged(vec![1.0], vec![0.0])
        }
    }

    #[test]
    fn test_failed_fit_has_no_metrics() {
        assert!(evaluate(&failed()).is_none());
    }

    #[test]
    fn test_perfect_fit_r_squared_is_one() {
        let fit = converged(vec![100.0, 200.0, 300.0, 400.0], vec![0.0; 4]);
        let metrics = evaluate(&fit).unwrap();
        assert_eq!(metrics.r_squared, Some(1.0));
        assert_eq!(metrics.rss, 0.0);
        // A zero residual sum of squares has no finite likelihood.
        assert!(metrics.aic.is_none());
        assert!(metrics.bic.is_none());
    }

    #[test]
    fn test_null_model_r_squared_is_zero() {
        let observed = [100.0, 180.0, 260.0, 300.0, 410.0];
        let mean = observed.iter().sum::<f64>() / observed.len() as f64;
        let fitted = vec![mean; observed.len()];
        let residuals = observed.iter().map(|y| y - mean).collect();
        let metrics = evaluate(&converged(fitted, residuals)).unwrap();
        assert_approx_eq!(metrics.r_squared.unwrap(), 0.0, 1e-12);
    }

    #[test]
    fn test_constant_weights_r_squared_absent() {
        let fit = converged(vec![250.0; 5], vec![0.0; 5]);
        let metrics = evaluate(&fit).unwrap();
        assert!(metrics.r_squared.is_none());
    }

    #[test]
    fn test_lower_rss_gives_lower_aic_and_bic() {
        let fitted = vec![100.0, 200.0, 300.0, 400.0, 500.0, 600.0];
        let small = converged(fitted.clone(), vec![1.0, -1.0, 0.5, -0.5, 1.0, -1.0]);
        let large = converged(fitted, vec![3.0, -3.0, 1.5, -1.5, 3.0, -3.0]);
        let m_small = evaluate(&small).unwrap();
        let m_large = evaluate(&large).unwrap();
        assert!(m_small.rss < m_large.rss);
        assert!(m_small.aic.unwrap() < m_large.aic.unwrap());
        assert!(m_small.bic.unwrap() < m_large.bic.unwrap());
    }

    #[test]
    fn test_aic_matches_rss_form() {
        // -2 logL + 2(p+1) == n ln(RSS/n) + n (ln 2π + 1) + 2(p+1)
        let rss = 125.0;
        let n = 20;
        let ll = gaussian_log_likelihood(rss, n).unwrap();
        let expected = n as f64 * (rss / n as f64).ln()
            + n as f64 * ((2.0 * std::f64::consts::PI).ln() + 1.0)
            + 2.0 * 4.0;
        assert_approx_eq!(aic(ll, 3), expected, 1e-9);
    }

    #[test]
    fn test_bic_penalty() {
        let ll = -50.0;
        assert_approx_eq!(bic(ll, 20, 3) - aic(ll, 3), 4.0 * ((20.0f64).ln() - 2.0));
    }

    #[test]
    fn test_log_likelihood_degenerate() {
        assert!(gaussian_log_likelihood(0.0, 10).is_none());
        assert!(gaussian_log_likelihood(1.0, 0).is_none());
        assert!(gaussian_log_likelihood(f64::NAN, 10).is_none());
    }

    #[test]
    fn test_convergence_passthrough() {
        let fit = failed();
        let info = convergence(&fit);
        assert_eq!(info.status, FitStatus::Failed);
        assert_eq!(info.iterations, 1000);
        assert_eq!(info.stop_code, 4);
        assert!(info.tolerance.is_none());
        assert_eq!(info.stop_message, fit.stop_message);

        let ok = converged(vec![1.0, 2.0, 4.0], vec![0.1, -0.1, 0.0]);
        let info = convergence(&ok);
        assert_eq!(info.status, FitStatus::Converged);
        assert_eq!(info.stop_code, 2);
        assert_eq!(info.tolerance, Some(1e-9));
    }

    #[test]
    fn test_metrics_counts() {
        let fit = converged(vec![1.0, 2.0, 4.0, 8.0], vec![0.1, -0.1, 0.2, -0.2]);
        let metrics = evaluate(&fit).unwrap();
        assert_eq!(metrics.n, 4);
        assert_eq!(metrics.n_params, 3);
        assert_approx_eq!(metrics.rss, 0.1);
    }
}
