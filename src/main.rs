use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cattle_growth_analyzer::{
    analysis::Analyzer,
    config::{GrowthConfig, StartStrategy},
    io,
    models::Dataset,
    visualization::{
        print_combined_overlay, print_convergence_table, print_growth_overlay,
        print_metrics_table, print_parameter_table, print_quality_report, print_ranking_table,
        print_residual_facets, print_summary_table,
    },
};

#[derive(Parser)]
#[command(
    name = "growth-analyzer",
    about = "Cattle Growth Analyzer - Brody, Von Bertalanffy and Logistic curve fitting by breed group",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit all growth models to every breed group and compare them
    Fit {
        /// Path to input file (CSV, JSON, or Excel)
        #[arg(short, long)]
        input: PathBuf,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Iteration cap per fit (overrides the config file)
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Starting values: fixed or data-driven (overrides the config file)
        #[arg(long)]
        initializer: Option<StartStrategy>,

        /// Export tables: .json, .xlsx, or a CSV stem such as out/results.csv
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Show growth curve overlays and residual plots
        #[arg(long)]
        plots: bool,
    },

    /// Check the data for missing values, duplicates and outliers
    Quality {
        /// Path to input file (CSV, JSON, or Excel)
        #[arg(short, long)]
        input: PathBuf,

        /// Absolute z-score above which a value is flagged
        #[arg(short, long, default_value = "3.0")]
        z_threshold: f64,
    },

    /// Display descriptive statistics per breed group
    Summary {
        /// Path to input file (CSV, JSON, or Excel)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Convert weight-at-age data between formats
    Convert {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    let dataset = io::read_dataset(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    println!(
        "  Loaded {} observations in {} breed groups",
        dataset.len(),
        dataset.breed_groups().len()
    );
    Ok(dataset)
}

fn load_config(path: Option<&Path>) -> Result<GrowthConfig> {
    match path {
        Some(p) => GrowthConfig::from_file(p)
            .with_context(|| format!("Failed to read config {}", p.display())),
        None => Ok(GrowthConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Fit {
            input,
            config,
            max_iterations,
            initializer,
            export,
            plots,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(n) = max_iterations {
                config.fit.max_iterations = n;
            }
            if let Some(strategy) = initializer {
                config.start.strategy = strategy;
            }

            println!(
                "\n{}",
                format!("Growth Curve Analysis: {}", input.display())
                    .bold()
                    .cyan()
            );
            let dataset = load_dataset(&input)?;
            let report = Analyzer::new(&dataset).run(&config)?;

            if !report.quality.is_clean() {
                eprintln!(
                    "{}: {} missing, {} out-of-range, {} duplicate, {} outlier values (run `quality` for details)",
                    "Warning".yellow(),
                    report.quality.missing.len(),
                    report.quality.invalid.len(),
                    report.quality.duplicates.len(),
                    report.quality.outliers.len()
                );
            }

            print_summary_table(&report.summaries);
            print_parameter_table(&report.fits);
            print_metrics_table(&report.fits);
            print_convergence_table(&report.fits);
            print_ranking_table(&report.fits);

            if plots {
                for stratum in &report.strata {
                    let fits = report.fits.fits_for(&stratum.breed_group);
                    print_growth_overlay(stratum, &fits);
                    print_residual_facets(&fits);
                }
                print_combined_overlay(&report.strata, &report.fits);
            }

            if let Some(path) = export {
                let written = io::export_report(&report, &path)?;
                for file in written {
                    println!("{} {}", "Wrote".green().bold(), file.display());
                }
            }
        }

        Commands::Quality { input, z_threshold } => {
            if z_threshold.is_nan() || z_threshold <= 0.0 {
                anyhow::bail!("--z-threshold must be positive, got {z_threshold}");
            }
            let dataset = load_dataset(&input)?;
            let report = Analyzer::new(&dataset).quality(z_threshold);
            print_quality_report(&report);
        }

        Commands::Summary { input } => {
            let dataset = load_dataset(&input)?;
            println!("\n{}", "Quick Summary".bold().cyan());
            println!("{}", "=".repeat(40));
            println!("  Name:           {}", dataset.name);
            println!("  Observations:   {}", dataset.len());
            println!("  Complete:       {}", dataset.num_complete());
            println!("  Breed groups:   {}", dataset.breed_groups().len());
            print_summary_table(&Analyzer::new(&dataset).summaries()?);
        }

        Commands::Convert {
            input,
            output,
            pretty,
        } => {
            let dataset = load_dataset(&input)?;

            let out_ext = output
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();

            match out_ext.as_str() {
                "csv" => io::write_csv(&dataset, &output)?,
                "json" => io::write_json(&dataset, &output, pretty)?,
                "xlsx" => io::write_excel(&dataset, &output)?,
                _ => anyhow::bail!("Unsupported output format: .{out_ext}"),
            }

            println!(
                "{} Converted {} -> {}",
                "Success:".green().bold(),
                input.display(),
                output.display()
            );
        }
    }

    Ok(())
}
