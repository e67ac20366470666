use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::models::Dataset;

/// Field of an observation that a quality finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityField {
    Age,
    Weight,
    BreedGroup,
}

impl std::fmt::Display for QualityField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityField::Age => write!(f, "Age"),
            QualityField::Weight => write!(f, "Weight"),
            QualityField::BreedGroup => write!(f, "Breed_Group"),
        }
    }
}

/// A missing or non-finite cell. `row` is the 1-based data row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValue {
    pub row: usize,
    pub field: QualityField,
}

/// A finite value that no growth fit accepts: a negative age or a weight of
/// zero or less. Such rows are left out of every stratum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidValue {
    pub row: usize,
    pub field: QualityField,
    pub value: f64,
}

/// A row identical to an earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateRow {
    pub row: usize,
    pub first_row: usize,
}

/// A value whose within-group z-score exceeds the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlier {
    pub row: usize,
    pub breed_group: String,
    pub field: QualityField,
    pub value: f64,
    pub z_score: f64,
}

/// Read-only diagnostics over a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub z_threshold: f64,
    pub missing: Vec<MissingValue>,
    pub invalid: Vec<InvalidValue>,
    pub duplicates: Vec<DuplicateRow>,
    pub outliers: Vec<Outlier>,
}

impl QualityReport {
    /// Check a dataset for missing cells, out-of-range values, duplicate rows
    /// and z-score outliers.
    ///
    /// Z-scores use the mean and sample standard deviation of each breed
    /// group; groups with fewer than three values or no spread are skipped.
    pub fn check(dataset: &Dataset, z_threshold: f64) -> Self {
        let observations = &dataset.observations;

        let mut missing = Vec::new();
        let mut invalid = Vec::new();
        for (idx, obs) in observations.iter().enumerate() {
            let row = idx + 1;
            if obs.age_out_of_range() {
                invalid.push(InvalidValue {
                    row,
                    field: QualityField::Age,
                    value: obs.age,
                });
            }
            if obs.weight_out_of_range() {
                invalid.push(InvalidValue {
                    row,
                    field: QualityField::Weight,
                    value: obs.weight,
                });
            }
            if !obs.age.is_finite() {
                missing.push(MissingValue {
                    row,
                    field: QualityField::Age,
                });
            }
            if !obs.weight.is_finite() {
                missing.push(MissingValue {
                    row,
                    field: QualityField::Weight,
                });
            }
            if obs.breed_group.trim().is_empty() {
                missing.push(MissingValue {
                    row,
                    field: QualityField::BreedGroup,
                });
            }
        }

        let mut seen: HashMap<(u64, u64, &str), usize> = HashMap::new();
        let mut duplicates = Vec::new();
        for (idx, obs) in observations.iter().enumerate() {
            let key = (
                obs.age.to_bits(),
                obs.weight.to_bits(),
                obs.breed_group.trim(),
            );
            match seen.get(&key) {
                Some(&first_row) => duplicates.push(DuplicateRow {
                    row: idx + 1,
                    first_row,
                }),
                None => {
                    seen.insert(key, idx + 1);
                }
            }
        }

        // (row, value) pairs per group and field
        let mut by_group: BTreeMap<&str, [Vec<(usize, f64)>; 2]> = BTreeMap::new();
        for (idx, obs) in observations.iter().enumerate() {
            let label = obs.breed_group.trim();
            if label.is_empty() {
                continue;
            }
            let entry = by_group.entry(label).or_default();
            if obs.age.is_finite() {
                entry[0].push((idx + 1, obs.age));
            }
            if obs.weight.is_finite() {
                entry[1].push((idx + 1, obs.weight));
            }
        }

        let mut outliers = Vec::new();
        for (label, [ages, weights]) in &by_group {
            for (field, values) in [(QualityField::Age, ages), (QualityField::Weight, weights)] {
                outliers.extend(
                    z_score_outliers(values, z_threshold)
                        .into_iter()
                        .map(|(row, value, z_score)| Outlier {
                            row,
                            breed_group: label.to_string(),
                            field,
                            value,
                            z_score,
                        }),
                );
            }
        }
        outliers.sort_by_key(|o| o.row);

        let found = missing.len() + invalid.len() + duplicates.len() + outliers.len();
        if found > 0 {
            tracing::info!(
                dataset = %dataset.name,
                missing = missing.len(),
                invalid = invalid.len(),
                duplicates = duplicates.len(),
                outliers = outliers.len(),
                "data quality findings"
            );
        }

        Self {
            total_rows: observations.len(),
            z_threshold,
            missing,
            invalid,
            duplicates,
            outliers,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
            && self.invalid.is_empty()
            && self.duplicates.is_empty()
            && self.outliers.is_empty()
    }
}

fn z_score_outliers(values: &[(usize, f64)], threshold: f64) -> Vec<(usize, f64, f64)> {
    if values.len() < 3 {
        return Vec::new();
    }
    let data: Vec<f64> = values.iter().map(|&(_, v)| v).collect();
    let mean = Statistics::mean(&data);
    let sd = Statistics::std_dev(&data);
    if !(sd.is_finite() && sd > 0.0) {
        return Vec::new();
    }
    values
        .iter()
        .filter_map(|&(row, v)| {
            let z = (v - mean) / sd;
            (z.abs() > threshold).then_some((row, v, z))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Observation;

    fn clean_dataset() -> Dataset {
        Dataset::with_observations(
            "Clean",
            (1..=10)
                .map(|i| Observation::new(i as f64 * 3.0, 50.0 + i as f64 * 40.0, "Angus"))
                .collect(),
        )
    }

    #[test]
    fn test_clean_dataset() {
        let report = QualityReport::check(&clean_dataset(), 3.0);
        assert_eq!(report.total_rows, 10);
        assert!(report.is_clean());
    }

    #[test]
    fn test_missing_values_flagged() {
        let mut ds = clean_dataset();
        ds.observations[2].weight = f64::NAN;
        ds.observations[4].age = f64::INFINITY;
        ds.observations[6].breed_group = String::new();
        let report = QualityReport::check(&ds, 3.0);
        assert_eq!(
            report.missing,
            vec![
                MissingValue {
                    row: 3,
                    field: QualityField::Weight
                },
                MissingValue {
                    row: 5,
                    field: QualityField::Age
                },
                MissingValue {
                    row: 7,
                    field: QualityField::BreedGroup
                },
            ]
        );
    }

    #[test]
    fn test_out_of_range_values_flagged() {
        let ds = Dataset::with_observations(
            "Range",
            vec![
                Observation::new(1.0, 40.0, "A"),
                Observation::new(6.0, 150.0, "A"),
                Observation::new(12.0, -250.0, "A"),
                Observation::new(18.0, 0.0, "A"),
                Observation::new(24.0, 400.0, "A"),
                Observation::new(-3.0, 90.0, "A"),
            ],
        );
        let report = QualityReport::check(&ds, 3.0);
        assert!(!report.is_clean());
        assert!(report.missing.is_empty());
        assert_eq!(
            report.invalid,
            vec![
                InvalidValue {
                    row: 3,
                    field: QualityField::Weight,
                    value: -250.0
                },
                InvalidValue {
                    row: 4,
                    field: QualityField::Weight,
                    value: 0.0
                },
                InvalidValue {
                    row: 6,
                    field: QualityField::Age,
                    value: -3.0
                },
            ]
        );
        // Every flagged row is one that stratification leaves out.
        let kept: usize = ds.stratify().unwrap().iter().map(|s| s.len()).sum();
        assert_eq!(kept, ds.len() - report.invalid.len());
    }

    #[test]
    fn test_missing_is_not_out_of_range() {
        let ds = Dataset::with_observations(
            "Gaps",
            vec![
                Observation::new(f64::NAN, 40.0, "A"),
                Observation::new(2.0, f64::NAN, "A"),
            ],
        );
        let report = QualityReport::check(&ds, 3.0);
        assert_eq!(report.missing.len(), 2);
        assert!(report.invalid.is_empty());
    }

    #[test]
    fn test_duplicates_flagged() {
        let mut ds = clean_dataset();
        ds.observations.push(ds.observations[1].clone());
        ds.observations.push(ds.observations[1].clone());
        let report = QualityReport::check(&ds, 3.0);
        assert_eq!(report.duplicates.len(), 2);
        assert_eq!(report.duplicates[0], DuplicateRow { row: 11, first_row: 2 });
        assert_eq!(report.duplicates[1], DuplicateRow { row: 12, first_row: 2 });
    }

    #[test]
    fn test_same_values_different_group_not_duplicate() {
        let ds = Dataset::with_observations(
            "Groups",
            vec![
                Observation::new(6.0, 200.0, "Angus"),
                Observation::new(6.0, 200.0, "Nelore"),
            ],
        );
        assert!(QualityReport::check(&ds, 3.0).duplicates.is_empty());
    }

    #[test]
    fn test_outlier_flagged_within_group() {
        let mut obs: Vec<Observation> = (0..20)
            .map(|i| Observation::new(12.0, 300.0 + (i % 5) as f64, "Angus"))
            .collect();
        obs.push(Observation::new(12.0, 900.0, "Angus"));
        let ds = Dataset::with_observations("Outlier", obs);
        let report = QualityReport::check(&ds, 3.0);
        assert_eq!(report.outliers.len(), 1);
        let outlier = &report.outliers[0];
        assert_eq!(outlier.row, 21);
        assert_eq!(outlier.field, QualityField::Weight);
        assert_eq!(outlier.breed_group, "Angus");
        assert!(outlier.z_score > 3.0);
    }

    #[test]
    fn test_zero_spread_group_skipped() {
        let ds = Dataset::with_observations(
            "Flat",
            (0..5)
                .map(|_| Observation::new(12.0, 300.0, "Angus"))
                .collect(),
        );
        let report = QualityReport::check(&ds, 1.0);
        assert!(report.outliers.is_empty());
        assert_eq!(report.duplicates.len(), 4);
    }

    #[test]
    fn test_check_does_not_mutate_dataset() {
        let mut ds = clean_dataset();
        ds.observations[0].weight = f64::NAN;
        let before = ds.observations.len();
        let _ = QualityReport::check(&ds, 3.0);
        assert_eq!(ds.observations.len(), before);
        assert!(ds.observations[0].weight.is_nan());
    }
}
