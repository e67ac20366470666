use serde::{Deserialize, Serialize};

/// Growth curve parameters shared by every model.
///
/// `a` is the asymptotic (mature) weight in kg, `k` the maturation rate per
/// month and `b` a shape parameter whose meaning depends on the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterVector {
    pub a: f64,
    pub b: f64,
    pub k: f64,
}

impl ParameterVector {
    /// Number of free parameters in every growth model.
    pub const LEN: usize = 3;

    /// Parameter names in column order.
    pub const NAMES: [&'static str; 3] = ["A", "B", "k"];

    pub fn new(a: f64, b: f64, k: f64) -> Self {
        Self { a, b, k }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.a, self.b, self.k]
    }

    pub fn from_array(values: [f64; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }

    pub fn is_finite(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.k.is_finite()
    }
}

impl Default for ParameterVector {
    /// The fixed starting point used for every breed group and model.
    fn default() -> Self {
        Self {
            a: 730.0,
            b: 0.5,
            k: 0.01,
        }
    }
}

/// One estimated parameter with its inferential statistics.
///
/// Statistics are `None` when the fit has no residual degrees of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterEstimate {
    pub estimate: f64,
    pub std_error: Option<f64>,
    pub t_value: Option<f64>,
    pub p_value: Option<f64>,
}

/// Estimates for (A, B, k) from a converged fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedParameters {
    pub a: ParameterEstimate,
    pub b: ParameterEstimate,
    pub k: ParameterEstimate,
    /// Residual standard error, sqrt(RSS / (n - p))
    pub residual_std_error: Option<f64>,
    /// Residual degrees of freedom, n - p
    pub degrees_of_freedom: usize,
}

impl FittedParameters {
    pub fn vector(&self) -> ParameterVector {
        ParameterVector::new(self.a.estimate, self.b.estimate, self.k.estimate)
    }

    /// Estimates in (A, B, k) order, paired with their names.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParameterEstimate)> {
        ParameterVector::NAMES
            .into_iter()
            .zip([&self.a, &self.b, &self.k])
    }
}
