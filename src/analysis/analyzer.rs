use rayon::prelude::*;

use crate::analysis::{summarize, FitTable, Fitter, QualityReport, ReportTables, StratumSummary};
use crate::config::GrowthConfig;
use crate::error::GrowthError;
use crate::models::{Dataset, GrowthModel, Stratum};

/// Unified analysis API that groups the pipeline steps on a dataset.
pub struct Analyzer<'a> {
    dataset: &'a Dataset,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub dataset_name: String,
    pub quality: QualityReport,
    pub summaries: Vec<StratumSummary>,
    pub strata: Vec<Stratum>,
    pub fits: FitTable,
}

impl AnalysisReport {
    pub fn tables(&self) -> ReportTables {
        self.fits.tables()
    }
}

impl<'a> Analyzer<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset }
    }

    /// Missing values, duplicate rows and z-score outliers.
    pub fn quality(&self, z_threshold: f64) -> QualityReport {
        QualityReport::check(self.dataset, z_threshold)
    }

    /// Per-breed-group descriptive statistics.
    pub fn summaries(&self) -> Result<Vec<StratumSummary>, GrowthError> {
        Ok(summarize(&self.dataset.stratify()?))
    }

    /// Fit every model to every breed group.
    ///
    /// Input errors abort before any fit; a failed fit is recorded in the
    /// table and never stops the others.
    pub fn fit_all(&self, fitter: &Fitter) -> Result<FitTable, GrowthError> {
        let strata = self.dataset.stratify()?;
        Ok(fit_strata(&strata, fitter))
    }

    /// Quality check, stratification, summaries and all fits.
    pub fn run(&self, config: &GrowthConfig) -> Result<AnalysisReport, GrowthError> {
        config.validate()?;
        let quality = self.quality(config.quality.z_threshold);
        if !quality.is_clean() {
            tracing::warn!(
                missing = quality.missing.len(),
                invalid = quality.invalid.len(),
                duplicates = quality.duplicates.len(),
                outliers = quality.outliers.len(),
                "data quality issues found"
            );
        }

        let strata = self.dataset.stratify()?;
        let fitter = Fitter::new(config.fit.clone()).with_initializer(config.start.initializer());
        let fits = fit_strata(&strata, &fitter);

        tracing::info!(
            dataset = %self.dataset.name,
            breed_groups = strata.len(),
            converged = fits.iter().filter(|f| f.is_converged()).count(),
            total = fits.len(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            dataset_name: self.dataset.name.clone(),
            quality,
            summaries: summarize(&strata),
            strata,
            fits,
        })
    }
}

fn fit_strata(strata: &[Stratum], fitter: &Fitter) -> FitTable {
    let pairs: Vec<(&Stratum, GrowthModel)> = strata
        .iter()
        .flat_map(|s| GrowthModel::ALL.into_iter().map(move |m| (s, m)))
        .collect();
    pairs
        .into_par_iter()
        .map(|(stratum, model)| fitter.fit(model, stratum))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FitOptions, FitStatus};
    use crate::models::{Observation, ParameterVector};

    fn brody_rows(label: &str, truth: ParameterVector) -> Vec<Observation> {
        (0..15)
            .map(|i| {
                let age = 1.0 + 4.0 * i as f64;
                Observation::new(age, GrowthModel::Brody.predict(age, &truth), label)
            })
            .collect()
    }

    fn sample_dataset() -> Dataset {
        let mut observations = brody_rows("Angus", ParameterVector::new(560.0, 0.92, 0.06));
        observations.extend(brody_rows("Nelore", ParameterVector::new(480.0, 0.9, 0.05)));
        Dataset::with_observations("Analyzer Test", observations)
    }

    #[test]
    fn test_fit_all_covers_every_pair() {
        let ds = sample_dataset();
        let table = Analyzer::new(&ds).fit_all(&Fitter::default()).unwrap();
        assert_eq!(table.len(), 6);
        for group in ["Angus", "Nelore"] {
            for model in GrowthModel::ALL {
                let fit = table.get(group, model).unwrap();
                assert!(fit.status.is_terminal());
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let ds = sample_dataset();
        let fitter = Fitter::new(FitOptions::default());
        let parallel = Analyzer::new(&ds).fit_all(&fitter).unwrap();
        let sequential: FitTable = ds
            .stratify()
            .unwrap()
            .iter()
            .flat_map(|s| GrowthModel::ALL.map(|m| fitter.fit(m, s)))
            .collect();
        assert_eq!(parallel.metrics_rows(), sequential.metrics_rows());
        assert_eq!(parallel.parameter_rows(), sequential.parameter_rows());
    }

    #[test]
    fn test_empty_dataset_is_input_error() {
        let ds = Dataset::new("Empty");
        let err = Analyzer::new(&ds).fit_all(&Fitter::default()).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_run_collects_everything() {
        let mut ds = sample_dataset();
        ds.observations.push(Observation::new(f64::NAN, 300.0, "Angus"));
        let report = Analyzer::new(&ds).run(&GrowthConfig::default()).unwrap();
        assert_eq!(report.dataset_name, "Analyzer Test");
        assert_eq!(report.strata.len(), 2);
        assert_eq!(report.summaries.len(), 2);
        assert_eq!(report.quality.missing.len(), 1);
        assert_eq!(report.fits.len(), 6);
        let brody = report.fits.get("Angus", GrowthModel::Brody).unwrap();
        assert_eq!(brody.status, FitStatus::Converged);
        assert_eq!(brody.n_obs, 15);
        assert_eq!(report.tables().parameters.len(), 6);
    }

    #[test]
    fn test_run_rejects_invalid_config() {
        let ds = sample_dataset();
        let mut config = GrowthConfig::default();
        config.fit.max_iterations = 0;
        assert!(Analyzer::new(&ds).run(&config).is_err());
    }

    #[test]
    fn test_summaries_sorted_by_group() {
        let ds = sample_dataset();
        let summaries = Analyzer::new(&ds).summaries().unwrap();
        let groups: Vec<&str> = summaries.iter().map(|s| s.breed_group.as_str()).collect();
        assert_eq!(groups, vec!["Angus", "Nelore"]);
        assert_eq!(summaries[0].n, 15);
    }
}
