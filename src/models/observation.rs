use serde::{Deserialize, Serialize};

/// A single weight-at-age record.
///
/// Missing or unparseable numeric cells are loaded as `NaN` and a missing
/// label as an empty string, so the quality checker can see them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Age in months
    pub age: f64,
    /// Body weight in kilograms
    pub weight: f64,
    /// Breed group label
    pub breed_group: String,
}

impl Observation {
    pub fn new(age: f64, weight: f64, breed_group: impl Into<String>) -> Self {
        Self {
            age,
            weight,
            breed_group: breed_group.into(),
        }
    }

    /// True when the record can take part in a fit: finite non-negative age,
    /// finite positive weight and a non-empty breed group.
    pub fn is_complete(&self) -> bool {
        self.age.is_finite()
            && self.age >= 0.0
            && self.weight.is_finite()
            && self.weight > 0.0
            && !self.breed_group.trim().is_empty()
    }

    /// Finite but negative age.
    pub fn age_out_of_range(&self) -> bool {
        self.age.is_finite() && self.age < 0.0
    }

    /// Finite but zero or negative weight.
    pub fn weight_out_of_range(&self) -> bool {
        self.weight.is_finite() && self.weight <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_observation() {
        let obs = Observation::new(12.0, 310.0, "Angus");
        assert!(obs.is_complete());
        assert!(!obs.age_out_of_range() && !obs.weight_out_of_range());
    }

    #[test]
    fn test_birth_record_is_complete() {
        let obs = Observation::new(0.0, 35.0, "Angus");
        assert!(obs.is_complete());
    }

    #[test]
    fn test_missing_weight_incomplete() {
        let obs = Observation::new(12.0, f64::NAN, "Angus");
        assert!(!obs.is_complete());
        // Missing is not out of range
        assert!(!obs.weight_out_of_range());
    }

    #[test]
    fn test_negative_age_rejected() {
        let obs = Observation::new(-1.0, 300.0, "Angus");
        assert!(!obs.is_complete());
        assert!(obs.age_out_of_range());
        assert!(!obs.weight_out_of_range());
    }

    #[test]
    fn test_zero_weight_rejected() {
        let obs = Observation::new(6.0, 0.0, "Angus");
        assert!(!obs.is_complete());
        assert!(obs.weight_out_of_range());
    }

    #[test]
    fn test_blank_breed_group_rejected() {
        let obs = Observation::new(6.0, 200.0, "  ");
        assert!(!obs.is_complete());
        assert!(!obs.age_out_of_range() && !obs.weight_out_of_range());
    }

    #[test]
    fn test_observation_json_roundtrip() {
        let obs = Observation::new(18.0, 420.5, "Nelore");
        let json = serde_json::to_string(&obs).unwrap();
        let back: Observation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, obs);
    }
}
