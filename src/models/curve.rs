use serde::{Deserialize, Serialize};

use super::ParameterVector;
use crate::error::GrowthError;

/// Bound on the exponent `-k * age` so optimizer iterates far from any sensible
/// fit overflow to large finite values instead of producing `NaN`.
const EXP_CLAMP: f64 = 700.0;

/// Parametric growth curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GrowthModel {
    /// W(t) = A * (1 - B * e^(-k*t))
    Brody,
    /// W(t) = A * (1 - e^(-k*t))^B
    VonBertalanffy,
    /// W(t) = A / (1 + B * e^(-k*t))
    Logistic,
}

impl GrowthModel {
    /// Every model, in reporting order.
    pub const ALL: [GrowthModel; 3] = [
        GrowthModel::Brody,
        GrowthModel::VonBertalanffy,
        GrowthModel::Logistic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GrowthModel::Brody => "Brody",
            GrowthModel::VonBertalanffy => "Von Bertalanffy",
            GrowthModel::Logistic => "Logistic",
        }
    }

    /// Formula as shown in reports.
    pub fn formula(&self) -> &'static str {
        match self {
            GrowthModel::Brody => "A * (1 - B * exp(-k*t))",
            GrowthModel::VonBertalanffy => "A * (1 - exp(-k*t))^B",
            GrowthModel::Logistic => "A / (1 + B * exp(-k*t))",
        }
    }

    /// Predicted weight at `age`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cattle_growth_analyzer::{GrowthModel, ParameterVector};
    ///
    /// let p = ParameterVector::new(600.0, 0.9, 0.05);
    /// let birth = GrowthModel::Brody.predict(0.0, &p);
    /// assert!((birth - 60.0).abs() < 1e-9);
    /// ```
    pub fn predict(&self, age: f64, params: &ParameterVector) -> f64 {
        let ParameterVector { a, b, k } = *params;
        let e = decay(k, age);
        match self {
            GrowthModel::Brody => a * (1.0 - b * e),
            GrowthModel::VonBertalanffy => {
                let base = 1.0 - e;
                if base <= 0.0 {
                    0.0
                } else {
                    a * base.powf(b)
                }
            }
            GrowthModel::Logistic => a / (1.0 + b * e),
        }
    }

    /// Predictions for every age in `ages`.
    pub fn predict_many(&self, ages: &[f64], params: &ParameterVector) -> Vec<f64> {
        ages.iter().map(|&t| self.predict(t, params)).collect()
    }

    /// Partial derivatives of the prediction with respect to (A, B, k).
    pub fn gradient(&self, age: f64, params: &ParameterVector) -> [f64; 3] {
        let ParameterVector { a, b, k } = *params;
        let e = decay(k, age);
        match self {
            GrowthModel::Brody => [1.0 - b * e, -a * e, a * b * age * e],
            GrowthModel::VonBertalanffy => {
                let base = 1.0 - e;
                if base <= 0.0 {
                    return [0.0; 3];
                }
                let pow = base.powf(b);
                [
                    pow,
                    a * pow * base.ln(),
                    a * b * base.powf(b - 1.0) * age * e,
                ]
            }
            GrowthModel::Logistic => {
                let denom = 1.0 + b * e;
                let denom_sq = denom * denom;
                [1.0 / denom, -a * e / denom_sq, a * b * age * e / denom_sq]
            }
        }
    }
}

fn decay(k: f64, age: f64) -> f64 {
    (-k * age).clamp(-EXP_CLAMP, EXP_CLAMP).exp()
}

impl std::fmt::Display for GrowthModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for GrowthModel {
    type Err = GrowthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "brody" | "b" => Ok(GrowthModel::Brody),
            "vonbertalanffy" | "bertalanffy" | "vb" | "v" => Ok(GrowthModel::VonBertalanffy),
            "logistic" | "richards" | "l" => Ok(GrowthModel::Logistic),
            _ => Err(GrowthError::ParseError(format!(
                "Unknown growth model: '{s}'"
            ))),
        }
    }
}
