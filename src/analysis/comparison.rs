use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::analysis::{convergence, evaluate, FitResult, FitStatus};
use crate::models::GrowthModel;

/// One cell of an output table. `Number(None)` renders as `NA`.
#[derive(Debug, Clone, PartialEq)]
pub enum TableValue {
    Text(String),
    Number(Option<f64>),
    Count(usize),
}

impl fmt::Display for TableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableValue::Text(s) => write!(f, "{s}"),
            TableValue::Number(Some(v)) => write!(f, "{v}"),
            TableValue::Number(None) => write!(f, "NA"),
            TableValue::Count(n) => write!(f, "{n}"),
        }
    }
}

/// A row of one of the output tables, with a fixed column layout.
pub trait TableRow {
    const HEADERS: &'static [&'static str];

    fn values(&self) -> Vec<TableValue>;
}

/// Breed group × model → estimates, standard errors and p-values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterRow {
    pub breed_group: String,
    pub model: GrowthModel,
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub k: Option<f64>,
    pub se_a: Option<f64>,
    pub se_b: Option<f64>,
    pub se_k: Option<f64>,
    pub p_a: Option<f64>,
    pub p_b: Option<f64>,
    pub p_k: Option<f64>,
}

impl ParameterRow {
    fn from_fit(fit: &FitResult) -> Self {
        let p = fit.parameters.as_ref();
        Self {
            breed_group: fit.breed_group.clone(),
            model: fit.model,
            a: p.map(|p| p.a.estimate),
            b: p.map(|p| p.b.estimate),
            k: p.map(|p| p.k.estimate),
            se_a: p.and_then(|p| p.a.std_error),
            se_b: p.and_then(|p| p.b.std_error),
            se_k: p.and_then(|p| p.k.std_error),
            p_a: p.and_then(|p| p.a.p_value),
            p_b: p.and_then(|p| p.b.p_value),
            p_k: p.and_then(|p| p.k.p_value),
        }
    }
}

impl TableRow for ParameterRow {
    const HEADERS: &'static [&'static str] = &[
        "Breed_Group",
        "Model",
        "A",
        "B",
        "k",
        "SE_A",
        "SE_B",
        "SE_k",
        "P_A",
        "P_B",
        "P_k",
    ];

    fn values(&self) -> Vec<TableValue> {
        vec![
            TableValue::Text(self.breed_group.clone()),
            TableValue::Text(self.model.name().to_string()),
            TableValue::Number(self.a),
            TableValue::Number(self.b),
            TableValue::Number(self.k),
            TableValue::Number(self.se_a),
            TableValue::Number(self.se_b),
            TableValue::Number(self.se_k),
            TableValue::Number(self.p_a),
            TableValue::Number(self.p_b),
            TableValue::Number(self.p_k),
        ]
    }
}

/// Breed group × model → AIC, BIC, R².
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRow {
    pub breed_group: String,
    pub model: GrowthModel,
    pub n: usize,
    pub rss: Option<f64>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    pub r_squared: Option<f64>,
}

impl MetricsRow {
    fn from_fit(fit: &FitResult) -> Self {
        let metrics = evaluate(fit);
        Self {
            breed_group: fit.breed_group.clone(),
            model: fit.model,
            n: fit.n_obs,
            rss: metrics.map(|m| m.rss),
            aic: metrics.and_then(|m| m.aic),
            bic: metrics.and_then(|m| m.bic),
            r_squared: metrics.and_then(|m| m.r_squared),
        }
    }
}

impl TableRow for MetricsRow {
    const HEADERS: &'static [&'static str] =
        &["Breed_Group", "Model", "N", "RSS", "AIC", "BIC", "R2"];

    fn values(&self) -> Vec<TableValue> {
        vec![
            TableValue::Text(self.breed_group.clone()),
            TableValue::Text(self.model.name().to_string()),
            TableValue::Count(self.n),
            TableValue::Number(self.rss),
            TableValue::Number(self.aic),
            TableValue::Number(self.bic),
            TableValue::Number(self.r_squared),
        ]
    }
}

/// Breed group × model → status, iterations, tolerance, stop code and message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceRow {
    pub breed_group: String,
    pub model: GrowthModel,
    pub status: FitStatus,
    pub iterations: usize,
    pub tolerance: Option<f64>,
    pub stop_code: i32,
    pub stop_message: String,
}

impl ConvergenceRow {
    fn from_fit(fit: &FitResult) -> Self {
        let info = convergence(fit);
        Self {
            breed_group: fit.breed_group.clone(),
            model: fit.model,
            status: info.status,
            iterations: info.iterations,
            tolerance: info.tolerance,
            stop_code: info.stop_code,
            stop_message: info.stop_message,
        }
    }
}

impl TableRow for ConvergenceRow {
    const HEADERS: &'static [&'static str] = &[
        "Breed_Group",
        "Model",
        "Status",
        "Iterations",
        "Tolerance",
        "Stop_Code",
        "Stop_Message",
    ];

    fn values(&self) -> Vec<TableValue> {
        vec![
            TableValue::Text(self.breed_group.clone()),
            TableValue::Text(self.model.name().to_string()),
            TableValue::Text(self.status.to_string()),
            TableValue::Count(self.iterations),
            TableValue::Number(self.tolerance),
            TableValue::Text(self.stop_code.to_string()),
            TableValue::Text(self.stop_message.clone()),
        ]
    }
}

/// AIC ranking of the three models within one breed group.
///
/// Models without an AIC (failed or degenerate fits) are listed last with
/// every ranking column absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    pub breed_group: String,
    pub model: GrowthModel,
    pub rank: Option<usize>,
    pub aic: Option<f64>,
    pub delta_aic: Option<f64>,
    /// Akaike weight, `exp(-Δ/2)` normalised over the ranked models
    pub akaike_weight: Option<f64>,
}

impl TableRow for RankingRow {
    const HEADERS: &'static [&'static str] = &[
        "Breed_Group",
        "Model",
        "Rank",
        "AIC",
        "Delta_AIC",
        "Akaike_Weight",
    ];

    fn values(&self) -> Vec<TableValue> {
        vec![
            TableValue::Text(self.breed_group.clone()),
            TableValue::Text(self.model.name().to_string()),
            match self.rank {
                Some(r) => TableValue::Count(r),
                None => TableValue::Number(None),
            },
            TableValue::Number(self.aic),
            TableValue::Number(self.delta_aic),
            TableValue::Number(self.akaike_weight),
        ]
    }
}

/// All output tables of one run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportTables {
    pub parameters: Vec<ParameterRow>,
    pub metrics: Vec<MetricsRow>,
    pub convergence: Vec<ConvergenceRow>,
    pub selection: Vec<RankingRow>,
}

/// Fit results keyed by (breed group, model).
///
/// Keys are unique, so results can be inserted in any order (for example as
/// parallel fits complete); iteration is always ordered by breed group then
/// by model.
#[derive(Debug, Clone, Default)]
pub struct FitTable {
    fits: BTreeMap<(String, GrowthModel), FitResult>,
}

impl FitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result, returning the one it replaces.
    pub fn insert(&mut self, fit: FitResult) -> Option<FitResult> {
        self.fits.insert((fit.breed_group.clone(), fit.model), fit)
    }

    pub fn get(&self, breed_group: &str, model: GrowthModel) -> Option<&FitResult> {
        self.fits.get(&(breed_group.to_string(), model))
    }

    pub fn len(&self) -> usize {
        self.fits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FitResult> {
        self.fits.values()
    }

    /// Distinct breed groups, sorted.
    pub fn breed_groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self.fits.keys().map(|(g, _)| g.clone()).collect();
        groups.dedup();
        groups
    }

    /// The fits of one breed group, in model order.
    pub fn fits_for(&self, breed_group: &str) -> Vec<&FitResult> {
        self.fits
            .iter()
            .filter(|((g, _), _)| g == breed_group)
            .map(|(_, fit)| fit)
            .collect()
    }

    pub fn parameter_rows(&self) -> Vec<ParameterRow> {
        self.iter().map(ParameterRow::from_fit).collect()
    }

    pub fn metrics_rows(&self) -> Vec<MetricsRow> {
        self.iter().map(MetricsRow::from_fit).collect()
    }

    pub fn convergence_rows(&self) -> Vec<ConvergenceRow> {
        self.iter().map(ConvergenceRow::from_fit).collect()
    }

    /// Rank the models of every breed group by AIC.
    pub fn rankings(&self) -> Vec<RankingRow> {
        let mut rows = Vec::with_capacity(self.len());
        for group in self.breed_groups() {
            let mut scored: Vec<(GrowthModel, f64)> = Vec::new();
            let mut unscored: Vec<GrowthModel> = Vec::new();
            for fit in self.fits_for(&group) {
                match evaluate(fit).and_then(|m| m.aic) {
                    Some(aic) if aic.is_finite() => scored.push((fit.model, aic)),
                    _ => unscored.push(fit.model),
                }
            }
            scored.sort_by(|a, b| a.1.total_cmp(&b.1));

            let best = scored.first().map_or(0.0, |(_, aic)| *aic);
            let total: f64 = scored
                .iter()
                .map(|(_, aic)| (-(aic - best) / 2.0).exp())
                .sum();

            for (i, (model, aic)) in scored.iter().enumerate() {
                let delta = aic - best;
                rows.push(RankingRow {
                    breed_group: group.clone(),
                    model: *model,
                    rank: Some(i + 1),
                    aic: Some(*aic),
                    delta_aic: Some(delta),
                    akaike_weight: Some((-delta / 2.0).exp() / total),
                });
            }
            rows.extend(unscored.into_iter().map(|model| RankingRow {
                breed_group: group.clone(),
                model,
                rank: None,
                aic: None,
                delta_aic: None,
                akaike_weight: None,
            }));
        }
        rows
    }

    /// The converged model with the lowest AIC for `breed_group`.
    pub fn best_model(&self, breed_group: &str) -> Option<GrowthModel> {
        self.fits_for(breed_group)
            .into_iter()
            .filter_map(|fit| {
                evaluate(fit)
                    .and_then(|m| m.aic)
                    .filter(|aic| aic.is_finite())
                    .map(|aic| (fit.model, aic))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(model, _)| model)
    }

    pub fn tables(&self) -> ReportTables {
        ReportTables {
            parameters: self.parameter_rows(),
            metrics: self.metrics_rows(),
            convergence: self.convergence_rows(),
            selection: self.rankings(),
        }
    }
}

impl FromIterator<FitResult> for FitTable {
    fn from_iter<I: IntoIterator<Item = FitResult>>(iter: I) -> Self {
        let mut table = FitTable::new();
        for fit in iter {
            table.insert(fit);
        }
        table
    }
}

impl Extend<FitResult> for FitTable {
    fn extend<I: IntoIterator<Item = FitResult>>(&mut self, iter: I) {
        for fit in iter {
            self.insert(fit);
        }
    }
}
