use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::{DataDrivenStart, FitOptions, FixedStart, StartingValues};
use crate::error::GrowthError;
use crate::models::ParameterVector;

/// How starting values are chosen for each (breed group, model) fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StartStrategy {
    /// The same (A, B, k) for every fit.
    #[default]
    Fixed,
    /// Seed A and B from the breed group's observed weights.
    DataDriven,
}

impl std::fmt::Display for StartStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartStrategy::Fixed => write!(f, "fixed"),
            StartStrategy::DataDriven => write!(f, "data-driven"),
        }
    }
}

impl std::str::FromStr for StartStrategy {
    type Err = GrowthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "fixed" => Ok(StartStrategy::Fixed),
            "data-driven" | "data" => Ok(StartStrategy::DataDriven),
            _ => Err(GrowthError::ParseError(format!(
                "Unknown start strategy: '{s}'"
            ))),
        }
    }
}

/// `[start]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StartConfig {
    pub strategy: StartStrategy,
    /// Fixed starting point; ignored by the data-driven strategy
    pub a: f64,
    pub b: f64,
    pub k: f64,
    /// Maturation rate used by the data-driven strategy
    pub data_driven_rate: f64,
}

impl Default for StartConfig {
    fn default() -> Self {
        let fixed = ParameterVector::default();
        Self {
            strategy: StartStrategy::Fixed,
            a: fixed.a,
            b: fixed.b,
            k: fixed.k,
            data_driven_rate: DataDrivenStart::default().rate,
        }
    }
}

impl StartConfig {
    pub fn fixed_point(&self) -> ParameterVector {
        ParameterVector::new(self.a, self.b, self.k)
    }

    /// Build the configured initializer.
    pub fn initializer(&self) -> Box<dyn StartingValues> {
        match self.strategy {
            StartStrategy::Fixed => Box::new(FixedStart(self.fixed_point())),
            StartStrategy::DataDriven => Box::new(DataDrivenStart {
                rate: self.data_driven_rate,
            }),
        }
    }
}

/// `[quality]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Absolute z-score above which a value is flagged as an outlier
    pub z_threshold: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self { z_threshold: 3.0 }
    }
}

/// Analysis configuration, usually read from a TOML file.
///
/// ```toml
/// [fit]
/// max_iterations = 1000
/// ftol = 1e-10
/// xtol = 1e-8
///
/// [start]
/// strategy = "fixed"
/// a = 730.0
/// b = 0.5
/// k = 0.01
///
/// [quality]
/// z_threshold = 3.0
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    pub fit: FitOptions,
    pub start: StartConfig,
    pub quality: QualityConfig,
}

impl GrowthConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, GrowthError> {
        let config: GrowthConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GrowthError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), GrowthError> {
        if self.fit.max_iterations == 0 {
            return Err(GrowthError::ValidationError(
                "fit.max_iterations must be at least 1".to_string(),
            ));
        }
        let tolerances = [self.fit.ftol, self.fit.xtol, self.fit.initial_lambda];
        if tolerances.iter().any(|v| v.is_nan() || *v <= 0.0) {
            return Err(GrowthError::ValidationError(
                "fit.ftol, fit.xtol and fit.initial_lambda must be positive".to_string(),
            ));
        }
        if !self.start.fixed_point().is_finite() {
            return Err(GrowthError::ValidationError(
                "start.a, start.b and start.k must be finite".to_string(),
            ));
        }
        if self.quality.z_threshold.is_nan() || self.quality.z_threshold <= 0.0 {
            return Err(GrowthError::ValidationError(format!(
                "quality.z_threshold must be positive, got {}",
                self.quality.z_threshold
            )));
        }
        Ok(())
    }
}
