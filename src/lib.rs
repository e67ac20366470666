//! Growth curve fitting for cattle weight-at-age data.
//!
//! Observations are split by breed group and each group is fitted with the
//! Brody, Von Bertalanffy and Logistic curves by nonlinear least squares.
//! Fits are compared by AIC, BIC and R², and failed fits are kept as data so
//! every (breed group, model) pair shows up in the output tables.
//!
//! ```no_run
//! use cattle_growth_analyzer::{io, Analyzer, GrowthConfig};
//!
//! let dataset = io::read_dataset("weights.csv")?;
//! let report = Analyzer::new(&dataset).run(&GrowthConfig::default())?;
//! for group in report.fits.breed_groups() {
//!     println!("{group}: {:?}", report.fits.best_model(&group));
//! }
//! # Ok::<(), cattle_growth_analyzer::GrowthError>(())
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod visualization;

pub use analysis::{
    evaluate, AnalysisReport, Analyzer, FitMetrics, FitOptions, FitResult, FitStatus, FitTable,
    Fitter, StartingValues,
};
pub use config::GrowthConfig;
pub use error::GrowthError;
pub use io::{DatasetReader, DatasetWriter};
pub use models::{Dataset, GrowthModel, Observation, ParameterVector, Stratum};
