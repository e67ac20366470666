use colored::Colorize;

use crate::analysis::{FitResult, FitTable};
use crate::models::{GrowthModel, Stratum};

const WIDTH: usize = 60;
const HEIGHT: usize = 16;
const RESIDUAL_HEIGHT: usize = 9;
const OBSERVED: char = 'o';

/// Plot glyph for a model's curve.
pub fn model_glyph(model: GrowthModel) -> char {
    match model {
        GrowthModel::Brody => 'b',
        GrowthModel::VonBertalanffy => 'v',
        GrowthModel::Logistic => 'l',
    }
}

/// Character grid with linear axes.
struct Canvas {
    width: usize,
    height: usize,
    x: (f64, f64),
    y: (f64, f64),
    cells: Vec<Vec<char>>,
}

impl Canvas {
    fn new(width: usize, height: usize, x: (f64, f64), y: (f64, f64)) -> Self {
        Self {
            width,
            height,
            x: widen(x),
            y: widen(y),
            cells: vec![vec![' '; width]; height],
        }
    }

    fn column(&self, x: f64) -> Option<usize> {
        let t = (x - self.x.0) / (self.x.1 - self.x.0);
        (t.is_finite() && (0.0..=1.0).contains(&t))
            .then(|| (t * (self.width - 1) as f64).round() as usize)
    }

    fn row(&self, y: f64) -> Option<usize> {
        let t = (y - self.y.0) / (self.y.1 - self.y.0);
        (t.is_finite() && (0.0..=1.0).contains(&t))
            .then(|| self.height - 1 - (t * (self.height - 1) as f64).round() as usize)
    }

    fn plot(&mut self, x: f64, y: f64, glyph: char) {
        if let (Some(c), Some(r)) = (self.column(x), self.row(y)) {
            self.cells[r][c] = glyph;
        }
    }

    /// Age at the centre of column `c`.
    fn x_at(&self, c: usize) -> f64 {
        self.x.0 + (self.x.1 - self.x.0) * c as f64 / (self.width - 1) as f64
    }

    fn hline(&mut self, y: f64, glyph: char) {
        if let Some(r) = self.row(y) {
            for cell in self.cells[r].iter_mut().filter(|c| **c == ' ') {
                *cell = glyph;
            }
        }
    }

    fn render(&self, x_label: &str) -> String {
        let mut out = String::new();
        for (i, row) in self.cells.iter().enumerate() {
            let label = if i == 0 {
                format!("{:>9.1}", self.y.1)
            } else if i == self.height - 1 {
                format!("{:>9.1}", self.y.0)
            } else {
                " ".repeat(9)
            };
            out.push_str(&format!("{label} │{}\n", row.iter().collect::<String>()));
        }
        out.push_str(&format!("{} └{}\n", " ".repeat(9), "─".repeat(self.width)));
        let left = format!("{:.1}", self.x.0);
        let right = format!("{:.1}", self.x.1);
        let gap = self.width.saturating_sub(left.len() + right.len());
        out.push_str(&format!("{}  {left}{}{right}\n", " ".repeat(9), " ".repeat(gap)));
        out.push_str(&format!("{}  {x_label:^w$}\n", " ".repeat(9), w = self.width));
        out
    }
}

/// Give a degenerate range some width so every value maps to a cell.
fn widen((lo, hi): (f64, f64)) -> (f64, f64) {
    if hi > lo {
        (lo, hi)
    } else {
        let pad = if lo.abs() > 0.0 { lo.abs() * 0.05 } else { 1.0 };
        (lo - pad, hi + pad)
    }
}

fn extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn curve_points(fit: &FitResult, canvas: &Canvas) -> Vec<(f64, f64)> {
    (0..canvas.width)
        .filter_map(|c| {
            let age = canvas.x_at(c);
            fit.predict(age).map(|w| (age, w))
        })
        .collect()
}

fn legend(fits: &[&FitResult]) -> String {
    let mut parts = vec![format!("{OBSERVED} observed")];
    for fit in fits {
        if fit.is_converged() {
            parts.push(format!("{} {}", model_glyph(fit.model), fit.model.name()));
        } else {
            parts.push(format!("{} (not converged)", fit.model.name()).dimmed().to_string());
        }
    }
    format!("  {}\n", parts.join("   "))
}

fn overlay(
    stratum: &Stratum,
    fits: &[&FitResult],
    x: (f64, f64),
    y: (f64, f64),
) -> String {
    let mut canvas = Canvas::new(WIDTH, HEIGHT, x, y);
    for fit in fits.iter().filter(|f| f.is_converged()) {
        for (age, weight) in curve_points(fit, &canvas) {
            canvas.plot(age, weight, model_glyph(fit.model));
        }
    }
    for obs in &stratum.observations {
        canvas.plot(obs.age, obs.weight, OBSERVED);
    }
    let mut out = canvas.render("Age (months)");
    out.push_str(&legend(fits));
    out
}

/// Observed weights and the weight range each converged curve covers.
fn weight_extent(stratum: &Stratum, fits: &[&FitResult], x: (f64, f64)) -> Option<(f64, f64)> {
    let layout = Canvas::new(WIDTH, HEIGHT, x, (0.0, 1.0));
    let predicted = fits
        .iter()
        .flat_map(|f| curve_points(f, &layout))
        .map(|(_, w)| w);
    extent(stratum.weights().into_iter().chain(predicted))
}

/// Format a text overlay of observed weights and each converged model's
/// curve over the observed age range.
pub fn format_growth_overlay(stratum: &Stratum, fits: &[&FitResult]) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "\n{}\n",
        format!("Growth Curves: {}", stratum.breed_group).bold().green()
    ));
    output.push_str(&format!("{}\n", "=".repeat(WIDTH + 11)));

    let Some(x) = stratum.age_range() else {
        output.push_str("  No data available.\n");
        return output;
    };
    let Some((_, y_max)) = weight_extent(stratum, fits, x) else {
        output.push_str("  No data available.\n");
        return output;
    };

    output.push_str(&overlay(stratum, fits, x, (0.0, y_max * 1.05)));
    output
}

/// Print the growth overlay for one breed group.
pub fn print_growth_overlay(stratum: &Stratum, fits: &[&FitResult]) {
    print!("{}", format_growth_overlay(stratum, fits));
}

/// Format residual-vs-age plots, one facet per model.
pub fn format_residual_facets(fits: &[&FitResult]) -> String {
    let mut output = String::new();
    let title = match fits.first() {
        Some(f) => format!("Residuals: {}", f.breed_group),
        None => "Residuals".to_string(),
    };
    output.push_str(&format!("\n{}\n", title.bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(WIDTH + 11)));

    for fit in fits {
        output.push_str(&format!("\n  {}\n", fit.model.name().bold()));
        if !fit.is_converged() {
            output.push_str(&format!(
                "  {}\n",
                format!("not converged: {}", fit.stop_message).red()
            ));
            continue;
        }
        let (Some(x), Some((lo, hi))) = (
            extent(fit.ages.iter().copied()),
            extent(fit.residuals.iter().copied()),
        ) else {
            output.push_str("  No residuals.\n");
            continue;
        };
        let bound = lo.abs().max(hi.abs());
        let mut canvas = Canvas::new(WIDTH, RESIDUAL_HEIGHT, x, (-bound, bound));
        for (age, r) in fit.ages.iter().zip(&fit.residuals) {
            canvas.plot(*age, *r, model_glyph(fit.model));
        }
        canvas.hline(0.0, '·');
        output.push_str(&canvas.render("Age (months)"));
    }
    output
}

/// Print residual facets for one breed group.
pub fn print_residual_facets(fits: &[&FitResult]) {
    print!("{}", format_residual_facets(fits));
}

/// Format one overlay facet per breed group on shared axes.
pub fn format_combined_overlay(strata: &[Stratum], fits: &FitTable) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Growth Curves by Breed Group".bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(WIDTH + 11)));

    let ages = strata.iter().flat_map(|s| s.ages());
    let Some(x) = extent(ages) else {
        output.push_str("  No data available.\n");
        return output;
    };
    let y_max = strata
        .iter()
        .filter_map(|s| weight_extent(s, &fits.fits_for(&s.breed_group), x))
        .map(|(_, hi)| hi)
        .fold(0.0_f64, f64::max);

    for stratum in strata {
        output.push_str(&format!("\n  {}\n", stratum.breed_group.bold()));
        let group_fits = fits.fits_for(&stratum.breed_group);
        output.push_str(&overlay(stratum, &group_fits, x, (0.0, y_max * 1.05)));
    }
    output
}

/// Print the combined overlay.
pub fn print_combined_overlay(strata: &[Stratum], fits: &FitTable) {
    print!("{}", format_combined_overlay(strata, fits));
}
