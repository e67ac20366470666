//! Nonlinear least-squares fitting of one growth curve to one breed group.
//!
//! The optimizer is a Levenberg–Marquardt iteration with Marquardt's diagonal
//! scaling. At each iterate we solve
//!
//! ```text
//! (JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr
//! ```
//!
//! where `J` is the Jacobian of the curve with respect to (A, B, k) and `r`
//! the residual vector `y - f(t)`. A step that lowers the residual sum of
//! squares is accepted and λ shrinks; otherwise λ grows and the step is
//! retried from the same iterate.
//!
//! Every numerical failure is reported on the returned [`FitResult`]; `fit`
//! never returns an error.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::analysis::{FixedStart, StartingValues, StratumSummary};
use crate::models::{FittedParameters, GrowthModel, ParameterEstimate, ParameterVector, Stratum};

const LAMBDA_UP: f64 = 10.0;
const LAMBDA_DOWN: f64 = 10.0;
const MIN_LAMBDA: f64 = 1e-12;
const MAX_LAMBDA: f64 = 1e16;
/// Floor for the Marquardt scaling of a zero Jacobian column.
const DIAG_FLOOR: f64 = 1e-12;
/// Smallest admissible ratio of singular values of the column-scaled Jacobian.
const RANK_TOLERANCE: f64 = 1e-10;

/// Optimizer settings, the `[fit]` section of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Iteration cap; reaching it is reported as non-convergence
    pub max_iterations: usize,
    /// Relative reduction of the residual sum of squares treated as converged
    pub ftol: f64,
    /// Relative step size treated as converged
    pub xtol: f64,
    /// Starting damping factor
    pub initial_lambda: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            ftol: 1e-10,
            xtol: 1e-8,
            initial_lambda: 1e-3,
        }
    }
}

/// Lifecycle of a single (breed group, model) fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStatus {
    NotStarted,
    Fitting,
    Converged,
    Failed,
}

impl FitStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FitStatus::Converged | FitStatus::Failed)
    }

    pub fn is_converged(&self) -> bool {
        *self == FitStatus::Converged
    }
}

impl std::fmt::Display for FitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitStatus::NotStarted => write!(f, "NotStarted"),
            FitStatus::Fitting => write!(f, "Fitting"),
            FitStatus::Converged => write!(f, "Converged"),
            FitStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Why the optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Relative reduction of the sum of squares fell within `ftol`.
    SumOfSquaresConverged,
    /// Relative step size fell within `xtol`.
    StepConverged,
    IterationLimit,
    /// λ grew past its ceiling without finding a better point.
    DampingLimit,
    SingularGradient,
    NonFiniteResiduals,
    InsufficientData,
}

impl StopReason {
    pub fn code(&self) -> i32 {
        match self {
            StopReason::SumOfSquaresConverged => 1,
            StopReason::StepConverged => 2,
            StopReason::IterationLimit => 4,
            StopReason::DampingLimit => 5,
            StopReason::SingularGradient => 6,
            StopReason::NonFiniteResiduals => 7,
            StopReason::InsufficientData => 8,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            StopReason::SumOfSquaresConverged | StopReason::StepConverged
        )
    }
}

/// Outcome of fitting one growth model to one breed group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub breed_group: String,
    pub model: GrowthModel,
    pub status: FitStatus,
    /// Starting point handed to the optimizer
    pub start: ParameterVector,
    /// Present if and only if the fit converged
    pub parameters: Option<FittedParameters>,
    pub n_obs: usize,
    /// Ages of the fitted observations; empty when the fit failed
    pub ages: Vec<f64>,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    pub iterations: usize,
    /// Relative step size of the last iteration
    pub tolerance: Option<f64>,
    pub stop_reason: StopReason,
    pub stop_message: String,
}

impl FitResult {
    pub fn is_converged(&self) -> bool {
        self.status.is_converged()
    }

    /// Residual sum of squares; `None` unless the fit converged.
    pub fn rss(&self) -> Option<f64> {
        if !self.is_converged() || self.residuals.is_empty() {
            return None;
        }
        Some(self.residuals.iter().map(|r| r * r).sum())
    }

    /// Observed weights reconstructed as fitted + residual.
    pub fn observed(&self) -> Vec<f64> {
        self.fitted
            .iter()
            .zip(&self.residuals)
            .map(|(f, r)| f + r)
            .collect()
    }

    /// Predicted weight at `age`, if the fit converged.
    pub fn predict(&self, age: f64) -> Option<f64> {
        self.parameters
            .as_ref()
            .map(|p| self.model.predict(age, &p.vector()))
    }
}

/// Fits growth curves with a configurable initializer.
pub struct Fitter {
    options: FitOptions,
    initializer: Box<dyn StartingValues>,
}

impl Default for Fitter {
    fn default() -> Self {
        Self::new(FitOptions::default())
    }
}

impl Fitter {
    /// A fitter using the fixed starting point.
    pub fn new(options: FitOptions) -> Self {
        Self {
            options,
            initializer: Box::new(FixedStart::default()),
        }
    }

    pub fn with_initializer(mut self, initializer: Box<dyn StartingValues>) -> Self {
        self.initializer = initializer;
        self
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Fit `model` to every observation of `stratum`.
    pub fn fit(&self, model: GrowthModel, stratum: &Stratum) -> FitResult {
        let _span = tracing::debug_span!(
            "fit",
            breed_group = %stratum.breed_group,
            model = %model
        )
        .entered();

        let n_params = ParameterVector::LEN;
        let summary = StratumSummary::from_stratum(stratum);
        let start = self.initializer.initial(model, &summary);
        let failed = |reason: StopReason, message: String, iterations: usize| {
            tracing::warn!(
                breed_group = %stratum.breed_group,
                model = %model,
                code = reason.code(),
                "fit failed: {message}"
            );
            FitResult {
                breed_group: stratum.breed_group.clone(),
                model,
                status: FitStatus::Failed,
                start,
                parameters: None,
                n_obs: stratum.len(),
                ages: Vec::new(),
                fitted: Vec::new(),
                residuals: Vec::new(),
                iterations,
                tolerance: None,
                stop_reason: reason,
                stop_message: message,
            }
        };

        if stratum.len() < n_params {
            return failed(
                StopReason::InsufficientData,
                format!(
                    "insufficient data: need at least {n_params} observations, got {}",
                    stratum.len()
                ),
                0,
            );
        }

        tracing::debug!(state = %FitStatus::Fitting, ?start, "starting optimizer");

        let ages = stratum.ages();
        let weights = stratum.weights();
        let outcome = levenberg_marquardt(model, &ages, &weights, start, &self.options);

        if !outcome.reason.is_converged() {
            return failed(outcome.reason, outcome.message, outcome.iterations);
        }

        let parameters = match inference(model, &ages, &weights, &outcome.params) {
            Ok(p) => p,
            Err(message) => {
                return failed(StopReason::SingularGradient, message, outcome.iterations)
            }
        };

        let fitted = model.predict_many(&ages, &outcome.params);
        let residuals: Vec<f64> = weights.iter().zip(&fitted).map(|(y, f)| y - f).collect();

        tracing::info!(
            breed_group = %stratum.breed_group,
            model = %model,
            iterations = outcome.iterations,
            a = outcome.params.a,
            b = outcome.params.b,
            k = outcome.params.k,
            "fit converged"
        );

        FitResult {
            breed_group: stratum.breed_group.clone(),
            model,
            status: FitStatus::Converged,
            start,
            parameters: Some(parameters),
            n_obs: stratum.len(),
            ages,
            fitted,
            residuals,
            iterations: outcome.iterations,
            tolerance: outcome.tolerance,
            stop_reason: outcome.reason,
            stop_message: outcome.message,
        }
    }
}

/// Fit `model` to `stratum` from the fixed starting point.
pub fn fit(model: GrowthModel, stratum: &Stratum, options: &FitOptions) -> FitResult {
    Fitter::new(options.clone()).fit(model, stratum)
}

struct Outcome {
    params: ParameterVector,
    iterations: usize,
    tolerance: Option<f64>,
    reason: StopReason,
    message: String,
}

impl Outcome {
    fn stop(
        params: [f64; 3],
        iterations: usize,
        tolerance: Option<f64>,
        reason: StopReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            params: ParameterVector::from_array(params),
            iterations,
            tolerance,
            reason,
            message: message.into(),
        }
    }
}

fn levenberg_marquardt(
    model: GrowthModel,
    ages: &[f64],
    weights: &[f64],
    start: ParameterVector,
    options: &FitOptions,
) -> Outcome {
    let mut theta = start.to_array();

    let Some(mut residuals) = residual_vector(model, ages, weights, &theta) else {
        return Outcome::stop(
            theta,
            0,
            None,
            StopReason::NonFiniteResiduals,
            "non-finite residuals at the starting values",
        );
    };
    let mut sse = residuals.norm_squared();

    let jac = jacobian(model, ages, &theta);
    if is_rank_deficient(&jac) {
        return Outcome::stop(
            theta,
            0,
            None,
            StopReason::SingularGradient,
            "singular gradient matrix at the starting values",
        );
    }

    let mut lambda = options.initial_lambda;
    let mut tolerance = None;

    for iteration in 1..=options.max_iterations {
        let jac = jacobian(model, ages, &theta);
        if jac.iter().any(|v| !v.is_finite()) {
            return Outcome::stop(
                theta,
                iteration,
                tolerance,
                StopReason::NonFiniteResiduals,
                "non-finite gradient during optimization",
            );
        }
        let jtj = jac.tr_mul(&jac);
        let gradient = jac.tr_mul(&residuals);

        loop {
            let Some(step) = damped_step(&jtj, &gradient, lambda) else {
                lambda *= LAMBDA_UP;
                if lambda > MAX_LAMBDA {
                    return Outcome::stop(
                        theta,
                        iteration,
                        tolerance,
                        StopReason::DampingLimit,
                        "damping limit reached: normal equations could not be solved",
                    );
                }
                continue;
            };

            let theta_norm = theta.iter().map(|v| v * v).sum::<f64>().sqrt();
            let relative_step = step.norm() / (theta_norm + options.xtol);
            let candidate = [theta[0] + step[0], theta[1] + step[1], theta[2] + step[2]];

            let trial = residual_vector(model, ages, weights, &candidate)
                .map(|r| {
                    let trial_sse = r.norm_squared();
                    (r, trial_sse)
                })
                .filter(|(_, trial_sse)| trial_sse.is_finite() && *trial_sse < sse);

            match trial {
                Some((trial_residuals, trial_sse)) => {
                    // Actual and linearised reductions, relative to the current SSE.
                    let (reduction, predicted) = if sse > 0.0 {
                        let linear = 2.0 * step.dot(&gradient) - step.dot(&(&jtj * &step));
                        ((sse - trial_sse) / sse, linear / sse)
                    } else {
                        (0.0, 0.0)
                    };
                    theta = candidate;
                    residuals = trial_residuals;
                    sse = trial_sse;
                    lambda = (lambda / LAMBDA_DOWN).max(MIN_LAMBDA);
                    tolerance = Some(relative_step);

                    tracing::trace!(iteration, sse, lambda, relative_step, "step accepted");

                    if relative_step <= options.xtol {
                        return Outcome::stop(
                            theta,
                            iteration,
                            tolerance,
                            StopReason::StepConverged,
                            "relative change in parameters within xtol",
                        );
                    }
                    if reduction <= options.ftol && predicted <= options.ftol {
                        return Outcome::stop(
                            theta,
                            iteration,
                            tolerance,
                            StopReason::SumOfSquaresConverged,
                            "relative reduction in sum of squares within ftol",
                        );
                    }
                    break;
                }
                None => {
                    if relative_step <= options.xtol {
                        tolerance = Some(relative_step);
                        return Outcome::stop(
                            theta,
                            iteration,
                            tolerance,
                            StopReason::StepConverged,
                            "relative change in parameters within xtol",
                        );
                    }
                    lambda *= LAMBDA_UP;
                    if lambda > MAX_LAMBDA {
                        return Outcome::stop(
                            theta,
                            iteration,
                            tolerance,
                            StopReason::DampingLimit,
                            "damping limit reached without reducing the sum of squares",
                        );
                    }
                }
            }
        }
    }

    Outcome::stop(
        theta,
        options.max_iterations,
        tolerance,
        StopReason::IterationLimit,
        format!(
            "iteration limit of {} reached without convergence",
            options.max_iterations
        ),
    )
}

/// `y - f(t)`, or `None` if any prediction is not finite.
fn residual_vector(
    model: GrowthModel,
    ages: &[f64],
    weights: &[f64],
    theta: &[f64; 3],
) -> Option<DVector<f64>> {
    let params = ParameterVector::from_array(*theta);
    let mut out = Vec::with_capacity(ages.len());
    for (&t, &y) in ages.iter().zip(weights) {
        let r = y - model.predict(t, &params);
        if !r.is_finite() {
            return None;
        }
        out.push(r);
    }
    Some(DVector::from_vec(out))
}

fn jacobian(model: GrowthModel, ages: &[f64], theta: &[f64; 3]) -> DMatrix<f64> {
    let params = ParameterVector::from_array(*theta);
    let values: Vec<f64> = ages
        .iter()
        .flat_map(|&t| model.gradient(t, &params))
        .collect();
    DMatrix::from_row_slice(ages.len(), ParameterVector::LEN, &values)
}

fn damped_step(jtj: &DMatrix<f64>, gradient: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let mut damped = jtj.clone();
    for j in 0..damped.ncols() {
        damped[(j, j)] += lambda * jtj[(j, j)].max(DIAG_FLOOR);
    }
    let step = damped.cholesky()?.solve(gradient);
    step.iter().all(|v| v.is_finite()).then_some(step)
}

/// Rank check on the column-scaled Jacobian, so parameters on very different
/// scales do not look degenerate.
fn is_rank_deficient(jac: &DMatrix<f64>) -> bool {
    if jac.nrows() < jac.ncols() || jac.iter().any(|v| !v.is_finite()) {
        return true;
    }
    let mut scaled = jac.clone();
    for mut column in scaled.column_iter_mut() {
        let norm = column.norm();
        if norm == 0.0 {
            return true;
        }
        column /= norm;
    }
    let singular_values = scaled.svd(false, false).singular_values;
    let max = singular_values.iter().cloned().fold(0.0, f64::max);
    let min = singular_values.iter().cloned().fold(f64::INFINITY, f64::min);
    !(max > 0.0 && min / max > RANK_TOLERANCE)
}

/// Standard errors, t values and p-values at the optimum.
fn inference(
    model: GrowthModel,
    ages: &[f64],
    weights: &[f64],
    params: &ParameterVector,
) -> Result<FittedParameters, String> {
    let theta = params.to_array();
    let jac = jacobian(model, ages, &theta);
    if is_rank_deficient(&jac) {
        return Err("singular gradient matrix at the parameter estimates".to_string());
    }
    let covariance_unscaled = jac
        .tr_mul(&jac)
        .try_inverse()
        .ok_or_else(|| "gradient matrix at the parameter estimates is not invertible".to_string())?;

    let rss = residual_vector(model, ages, weights, &theta)
        .map(|r| r.norm_squared())
        .ok_or_else(|| "non-finite residuals at the parameter estimates".to_string())?;

    let n = ages.len();
    let df = n.saturating_sub(ParameterVector::LEN);
    let sigma2 = (df > 0).then(|| rss / df as f64);
    let t_dist = if df > 0 {
        StudentsT::new(0.0, 1.0, df as f64).ok()
    } else {
        None
    };

    let mut estimates = [ParameterEstimate {
        estimate: 0.0,
        std_error: None,
        t_value: None,
        p_value: None,
    }; 3];

    for (j, estimate) in estimates.iter_mut().enumerate() {
        let variance = covariance_unscaled[(j, j)];
        if !(variance.is_finite() && variance >= 0.0) {
            return Err(format!(
                "invalid variance for parameter {} at the estimates",
                ParameterVector::NAMES[j]
            ));
        }
        let std_error = sigma2.map(|s2| (s2 * variance).sqrt());
        let t_value = std_error.filter(|se| *se > 0.0).map(|se| theta[j] / se);
        let p_value = match (t_value, &t_dist) {
            (Some(t), Some(dist)) => Some(2.0 * (1.0 - dist.cdf(t.abs()))),
            _ => None,
        };
        *estimate = ParameterEstimate {
            estimate: theta[j],
            std_error,
            t_value,
            p_value,
        };
    }

    Ok(FittedParameters {
        a: estimates[0],
        b: estimates[1],
        k: estimates[2],
        residual_std_error: sigma2.map(f64::sqrt),
        degrees_of_freedom: df,
    })
}
