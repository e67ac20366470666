mod curve;
mod dataset;
mod observation;
mod parameters;
mod stratum;

pub use curve::GrowthModel;
pub use dataset::Dataset;
pub use observation::Observation;
pub use parameters::{FittedParameters, ParameterEstimate, ParameterVector};
pub use stratum::Stratum;
