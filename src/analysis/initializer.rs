use crate::analysis::StratumSummary;
use crate::models::{GrowthModel, ParameterVector};

/// Chooses the starting point of a fit from the stratum's summary statistics.
///
/// Implementations must be deterministic: the same model and summary always
/// give the same starting point.
pub trait StartingValues: Send + Sync {
    fn initial(&self, model: GrowthModel, summary: &StratumSummary) -> ParameterVector;
}

/// The same starting point for every breed group and model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedStart(pub ParameterVector);

impl Default for FixedStart {
    fn default() -> Self {
        Self(ParameterVector::default())
    }
}

impl StartingValues for FixedStart {
    fn initial(&self, _model: GrowthModel, _summary: &StratumSummary) -> ParameterVector {
        self.0
    }
}

/// Seeds A from the heaviest observation and B from the lightest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataDrivenStart {
    pub rate: f64,
}

impl Default for DataDrivenStart {
    fn default() -> Self {
        Self { rate: 0.05 }
    }
}

impl StartingValues for DataDrivenStart {
    fn initial(&self, model: GrowthModel, summary: &StratumSummary) -> ParameterVector {
        let a = 1.1 * summary.weight_max;
        let ratio = if a > 0.0 { summary.weight_min / a } else { 0.5 };
        let b = match model {
            GrowthModel::Brody => (1.0 - ratio).clamp(0.05, 0.99),
            // Weight scales roughly with the cube of length.
            GrowthModel::VonBertalanffy => 3.0,
            GrowthModel::Logistic => (1.0 / ratio.max(1e-3) - 1.0).max(0.1),
        };
        ParameterVector::new(a, b, self.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Observation, Stratum};

    fn summary() -> StratumSummary {
        StratumSummary::from_stratum(&Stratum::new(
            "Angus",
            vec![
                Observation::new(1.0, 55.0, "Angus"),
                Observation::new(12.0, 300.0, "Angus"),
                Observation::new(30.0, 500.0, "Angus"),
            ],
        ))
    }

    #[test]
    fn test_fixed_start_ignores_data() {
        let init = FixedStart::default();
        for model in GrowthModel::ALL {
            assert_eq!(
                init.initial(model, &summary()),
                ParameterVector::new(730.0, 0.5, 0.01)
            );
        }
    }

    #[test]
    fn test_data_driven_seeds_asymptote_from_max_weight() {
        let init = DataDrivenStart::default();
        let p = init.initial(GrowthModel::Brody, &summary());
        assert!((p.a - 550.0).abs() < 1e-9);
        assert!((p.b - 0.9).abs() < 1e-9);
        assert_eq!(p.k, 0.05);
    }

    #[test]
    fn test_data_driven_logistic_shape() {
        let p = DataDrivenStart::default().initial(GrowthModel::Logistic, &summary());
        // 550 / 55 - 1
        assert!((p.b - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_data_driven_is_deterministic() {
        let init = DataDrivenStart::default();
        let s = summary();
        for model in GrowthModel::ALL {
            assert_eq!(init.initial(model, &s), init.initial(model, &s));
        }
    }
}
