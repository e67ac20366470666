use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Observation, Stratum};
use crate::error::GrowthError;

/// A loaded weight-at-age dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Name or identifier for this dataset (usually the file stem)
    pub name: String,
    /// All records in file order
    pub observations: Vec<Observation>,
}

impl Dataset {
    /// Create a new empty dataset.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            observations: Vec::new(),
        }
    }

    pub fn with_observations(name: impl Into<String>, observations: Vec<Observation>) -> Self {
        Self {
            name: name.into(),
            observations,
        }
    }

    /// Total number of records, including incomplete ones.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Number of records usable for fitting.
    pub fn num_complete(&self) -> usize {
        self.observations.iter().filter(|o| o.is_complete()).count()
    }

    /// Sorted unique non-empty breed group labels.
    pub fn breed_groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self
            .observations
            .iter()
            .map(|o| o.breed_group.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();
        groups.sort();
        groups.dedup();
        groups
    }

    /// Partition the complete records into strata, ordered by breed group.
    ///
    /// Incomplete records are skipped. An empty dataset, or a breed group whose
    /// records are all incomplete, is an input error.
    ///
    /// # Examples
    ///
    /// ```
    /// use cattle_growth_analyzer::{Dataset, Observation};
    ///
    /// let ds = Dataset::with_observations("Example", vec![
    ///     Observation::new(6.0, 180.0, "B"),
    ///     Observation::new(6.0, 170.0, "A"),
    ///     Observation::new(12.0, 290.0, "B"),
    /// ]);
    /// let strata = ds.stratify().unwrap();
    /// assert_eq!(strata.len(), 2);
    /// assert_eq!(strata[0].breed_group, "A");
    /// assert_eq!(strata[1].len(), 2);
    /// ```
    pub fn stratify(&self) -> Result<Vec<Stratum>, GrowthError> {
        if self.observations.is_empty() {
            return Err(GrowthError::EmptyDataset);
        }

        let mut groups: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
        let mut skipped = 0usize;
        for obs in &self.observations {
            let label = obs.breed_group.trim();
            if label.is_empty() {
                skipped += 1;
                continue;
            }
            let entry = groups.entry(label.to_string()).or_default();
            if obs.is_complete() {
                let mut obs = obs.clone();
                obs.breed_group = label.to_string();
                entry.push(obs);
            } else {
                skipped += 1;
            }
        }

        if skipped > 0 {
            tracing::warn!(
                dataset = %self.name,
                skipped,
                "incomplete records excluded from stratification"
            );
        }

        if groups.is_empty() {
            return Err(GrowthError::EmptyDataset);
        }

        groups
            .into_iter()
            .map(|(label, observations)| {
                if observations.is_empty() {
                    Err(GrowthError::EmptyStratum(label))
                } else {
                    Ok(Stratum::new(label, observations))
                }
            })
            .collect()
    }
}
