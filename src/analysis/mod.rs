mod analyzer;
mod comparison;
mod evaluator;
mod fitter;
mod initializer;
mod quality;
mod summary;

pub use analyzer::{AnalysisReport, Analyzer};
pub use comparison::{
    ConvergenceRow, FitTable, MetricsRow, ParameterRow, RankingRow, ReportTables, TableRow,
    TableValue,
};
pub use evaluator::{
    aic, bic, convergence, evaluate, gaussian_log_likelihood, r_squared, ConvergenceInfo,
    FitMetrics,
};
pub use fitter::{fit, FitOptions, FitResult, FitStatus, Fitter, StopReason};
pub use initializer::{DataDrivenStart, FixedStart, StartingValues};
pub use quality::{
    DuplicateRow, InvalidValue, MissingValue, Outlier, QualityField, QualityReport,
};
pub use summary::{summarize, StratumSummary};
