use serde::{Deserialize, Serialize};

use super::Observation;

/// All usable observations of one breed group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stratum {
    pub breed_group: String,
    pub observations: Vec<Observation>,
}

impl Stratum {
    pub fn new(breed_group: impl Into<String>, observations: Vec<Observation>) -> Self {
        Self {
            breed_group: breed_group.into(),
            observations,
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Ages in record order.
    pub fn ages(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.age).collect()
    }

    /// Weights in record order.
    pub fn weights(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.weight).collect()
    }

    /// Smallest and largest observed age.
    pub fn age_range(&self) -> Option<(f64, f64)> {
        if self.observations.is_empty() {
            return None;
        }
        let (min, max) = self
            .observations
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), o| {
                (lo.min(o.age), hi.max(o.age))
            });
        Some((min, max))
    }
}
