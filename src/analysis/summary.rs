use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::models::Stratum;

/// Descriptive statistics for one breed group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StratumSummary {
    pub breed_group: String,
    pub n: usize,
    pub age_min: f64,
    pub age_max: f64,
    pub weight_mean: f64,
    /// Sample standard deviation; `None` with fewer than two observations
    pub weight_sd: Option<f64>,
    pub weight_min: f64,
    pub weight_max: f64,
}

impl StratumSummary {
    pub fn from_stratum(stratum: &Stratum) -> Self {
        let ages = stratum.ages();
        let weights = stratum.weights();

        let weight_sd = if weights.len() >= 2 {
            Some(Statistics::std_dev(&weights))
        } else {
            None
        };

        Self {
            breed_group: stratum.breed_group.clone(),
            n: stratum.len(),
            age_min: Statistics::min(&ages),
            age_max: Statistics::max(&ages),
            weight_mean: Statistics::mean(&weights),
            weight_sd,
            weight_min: Statistics::min(&weights),
            weight_max: Statistics::max(&weights),
        }
    }
}

/// Summaries for every stratum, in stratum order.
pub fn summarize(strata: &[Stratum]) -> Vec<StratumSummary> {
    strata.iter().map(StratumSummary::from_stratum).collect()
}
