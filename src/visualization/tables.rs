use colored::Colorize;
use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, ContentArrangement, Table,
};

use crate::analysis::{FitStatus, FitTable, QualityReport, StratumSummary};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn heading(output: &mut String, title: &str, width: usize) {
    output.push_str(&format!("\n{}\n", title.bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(width)));
}

fn opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => "NA".to_string(),
    }
}

fn p_value(value: Option<f64>) -> String {
    match value {
        Some(p) if p < 1e-4 => format!("{p:.2e}"),
        other => opt(other, 4),
    }
}

/// Format the data quality report as a string.
pub fn format_quality_report(report: &QualityReport) -> String {
    let mut output = String::new();
    heading(&mut output, "Data Quality", 60);
    output.push_str(&format!(
        "{}\n",
        format!(
            "Rows: {} | Missing: {} | Invalid: {} | Duplicates: {} | Outliers (|z| > {}): {}",
            report.total_rows,
            report.missing.len(),
            report.invalid.len(),
            report.duplicates.len(),
            report.z_threshold,
            report.outliers.len()
        )
        .dimmed()
    ));

    if report.is_clean() {
        output.push_str(&format!("  {}\n", "No issues found.".green()));
        return output;
    }

    let mut table = new_table(vec!["Row", "Issue", "Field", "Detail"]);
    for m in &report.missing {
        table.add_row(vec![
            Cell::new(m.row),
            Cell::new("Missing").fg(Color::Red),
            Cell::new(m.field),
            Cell::new(""),
        ]);
    }
    for v in &report.invalid {
        table.add_row(vec![
            Cell::new(v.row),
            Cell::new("Invalid").fg(Color::Red),
            Cell::new(v.field),
            Cell::new(format!("{} = {}", v.field, v.value)),
        ]);
    }
    for d in &report.duplicates {
        table.add_row(vec![
            Cell::new(d.row),
            Cell::new("Duplicate").fg(Color::Yellow),
            Cell::new(""),
            Cell::new(format!("same as row {}", d.first_row)),
        ]);
    }
    for o in &report.outliers {
        table.add_row(vec![
            Cell::new(o.row),
            Cell::new("Outlier").fg(Color::Yellow),
            Cell::new(o.field),
            Cell::new(format!(
                "{} = {} (z = {:.2}, {})",
                o.field, o.value, o.z_score, o.breed_group
            )),
        ]);
    }

    output.push_str(&format!("{table}\n"));
    output
}

/// Print the data quality report.
pub fn print_quality_report(report: &QualityReport) {
    print!("{}", format_quality_report(report));
}

/// Format per-breed-group descriptive statistics as a string.
pub fn format_summary_table(summaries: &[StratumSummary]) -> String {
    let mut output = String::new();
    heading(&mut output, "Breed Group Summary", 60);

    let mut table = new_table(vec![
        "Breed Group",
        "N",
        "Age Range (mo)",
        "Mean Wt (kg)",
        "SD Wt",
        "Min Wt",
        "Max Wt",
    ]);
    for s in summaries {
        table.add_row(vec![
            Cell::new(&s.breed_group),
            Cell::new(s.n),
            Cell::new(format!("{:.1} - {:.1}", s.age_min, s.age_max)),
            Cell::new(format!("{:.1}", s.weight_mean)),
            Cell::new(opt(s.weight_sd, 1)),
            Cell::new(format!("{:.1}", s.weight_min)),
            Cell::new(format!("{:.1}", s.weight_max)),
        ]);
    }

    output.push_str(&format!("{table}\n"));
    output
}

/// Print per-breed-group descriptive statistics.
pub fn print_summary_table(summaries: &[StratumSummary]) {
    print!("{}", format_summary_table(summaries));
}

/// Format parameter estimates, standard errors and p-values as a string.
pub fn format_parameter_table(fits: &FitTable) -> String {
    let mut output = String::new();
    heading(&mut output, "Parameter Estimates", 70);

    let mut table = new_table(vec![
        "Breed Group",
        "Model",
        "A (SE)",
        "B (SE)",
        "k (SE)",
        "p(A)",
        "p(B)",
        "p(k)",
    ]);
    for row in fits.parameter_rows() {
        let with_se = |v: Option<f64>, se: Option<f64>, decimals: usize| match v {
            Some(_) => format!("{} ({})", opt(v, decimals), opt(se, decimals)),
            None => "NA".to_string(),
        };
        table.add_row(vec![
            Cell::new(&row.breed_group),
            Cell::new(row.model.name()),
            Cell::new(with_se(row.a, row.se_a, 2)),
            Cell::new(with_se(row.b, row.se_b, 4)),
            Cell::new(with_se(row.k, row.se_k, 5)),
            Cell::new(p_value(row.p_a)),
            Cell::new(p_value(row.p_b)),
            Cell::new(p_value(row.p_k)),
        ]);
    }

    output.push_str(&format!("{table}\n"));
    output
}

/// Print parameter estimates.
pub fn print_parameter_table(fits: &FitTable) {
    print!("{}", format_parameter_table(fits));
}

/// Format AIC, BIC and R² as a string, marking each group's lowest AIC.
pub fn format_metrics_table(fits: &FitTable) -> String {
    let mut output = String::new();
    heading(&mut output, "Goodness of Fit", 60);

    let mut table = new_table(vec!["Breed Group", "Model", "N", "RSS", "AIC", "BIC", "R²"]);
    for row in fits.metrics_rows() {
        let best = fits.best_model(&row.breed_group) == Some(row.model);
        let aic = if best {
            Cell::new(format!("{} *", opt(row.aic, 2))).fg(Color::Green)
        } else {
            Cell::new(opt(row.aic, 2))
        };
        table.add_row(vec![
            Cell::new(&row.breed_group),
            Cell::new(row.model.name()),
            Cell::new(row.n),
            Cell::new(opt(row.rss, 2)),
            aic,
            Cell::new(opt(row.bic, 2)),
            Cell::new(opt(row.r_squared, 4)),
        ]);
    }

    output.push_str(&format!("{table}\n"));
    output.push_str(&format!("{}\n", "* lowest AIC in breed group".dimmed()));
    output
}

/// Print AIC, BIC and R².
pub fn print_metrics_table(fits: &FitTable) {
    print!("{}", format_metrics_table(fits));
}

/// Format convergence diagnostics as a string.
pub fn format_convergence_table(fits: &FitTable) -> String {
    let mut output = String::new();
    heading(&mut output, "Convergence", 70);

    let mut table = new_table(vec![
        "Breed Group",
        "Model",
        "Status",
        "Iterations",
        "Tolerance",
        "Code",
        "Message",
    ]);
    for row in fits.convergence_rows() {
        let status = match row.status {
            FitStatus::Converged => Cell::new(row.status).fg(Color::Green),
            _ => Cell::new(row.status).fg(Color::Red),
        };
        table.add_row(vec![
            Cell::new(&row.breed_group),
            Cell::new(row.model.name()),
            status,
            Cell::new(row.iterations),
            Cell::new(match row.tolerance {
                Some(t) => format!("{t:.2e}"),
                None => "NA".to_string(),
            }),
            Cell::new(row.stop_code),
            Cell::new(&row.stop_message),
        ]);
    }

    output.push_str(&format!("{table}\n"));
    output
}

/// Print convergence diagnostics.
pub fn print_convergence_table(fits: &FitTable) {
    print!("{}", format_convergence_table(fits));
}

/// Format the per-group AIC ranking as a string.
pub fn format_ranking_table(fits: &FitTable) -> String {
    let mut output = String::new();
    heading(&mut output, "Model Selection (AIC)", 60);

    let mut table = new_table(vec!["Breed Group", "Rank", "Model", "AIC", "ΔAIC", "Weight"]);
    for row in fits.rankings() {
        table.add_row(vec![
            Cell::new(&row.breed_group),
            Cell::new(row.rank.map_or("NA".to_string(), |r| r.to_string())),
            Cell::new(row.model.name()),
            Cell::new(opt(row.aic, 2)),
            Cell::new(opt(row.delta_aic, 2)),
            Cell::new(opt(row.akaike_weight, 3)),
        ]);
    }

    output.push_str(&format!("{table}\n"));
    output
}

/// Print the per-group AIC ranking.
pub fn print_ranking_table(fits: &FitTable) {
    print!("{}", format_ranking_table(fits));
}
