mod csv_io;
mod excel_io;
mod json_io;

use std::path::{Path, PathBuf};

use crate::analysis::AnalysisReport;
use crate::error::GrowthError;
use crate::models::Dataset;

pub use csv_io::{read_csv, read_csv_from_bytes, write_csv, write_tables_csv};
pub use excel_io::{read_excel, read_excel_from_bytes, write_excel, write_tables_excel};
pub use json_io::{read_json, read_json_from_bytes, write_json, write_json_report};

/// Trait for reading weight-at-age data from a file.
pub trait DatasetReader {
    fn read(&self, path: &Path) -> Result<Dataset, GrowthError>;
}

/// Trait for writing weight-at-age data to a file.
pub trait DatasetWriter {
    fn write(&self, dataset: &Dataset, path: &Path) -> Result<(), GrowthError>;
}

/// CSV format reader/writer.
pub struct CsvFormat;

impl DatasetReader for CsvFormat {
    fn read(&self, path: &Path) -> Result<Dataset, GrowthError> {
        read_csv(path)
    }
}

impl DatasetWriter for CsvFormat {
    fn write(&self, dataset: &Dataset, path: &Path) -> Result<(), GrowthError> {
        write_csv(dataset, path)
    }
}

/// JSON format reader/writer.
#[derive(Default)]
pub struct JsonFormat {
    pub pretty: bool,
}

impl DatasetReader for JsonFormat {
    fn read(&self, path: &Path) -> Result<Dataset, GrowthError> {
        read_json(path)
    }
}

impl DatasetWriter for JsonFormat {
    fn write(&self, dataset: &Dataset, path: &Path) -> Result<(), GrowthError> {
        write_json(dataset, path, self.pretty)
    }
}

/// Excel (.xlsx) format reader/writer.
pub struct ExcelFormat;

impl DatasetReader for ExcelFormat {
    fn read(&self, path: &Path) -> Result<Dataset, GrowthError> {
        read_excel(path)
    }
}

impl DatasetWriter for ExcelFormat {
    fn write(&self, dataset: &Dataset, path: &Path) -> Result<(), GrowthError> {
        write_excel(dataset, path)
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Pick a reader from the file extension.
pub fn reader_for(path: &Path) -> Result<Box<dyn DatasetReader>, GrowthError> {
    match extension(path).as_str() {
        "csv" => Ok(Box::new(CsvFormat)),
        "json" => Ok(Box::new(JsonFormat::default())),
        "xlsx" | "xlsm" => Ok(Box::new(ExcelFormat)),
        other => Err(GrowthError::ParseError(format!(
            "Unsupported input format '{other}' (expected csv, json or xlsx)"
        ))),
    }
}

/// Read a dataset, choosing the format from the file extension.
pub fn read_dataset(path: impl AsRef<Path>) -> Result<Dataset, GrowthError> {
    let path = path.as_ref();
    reader_for(path)?.read(path)
}

/// Export the output tables of a run.
///
/// `.json` writes one document and `.xlsx` one workbook. Anything else is
/// treated as a CSV stem: `out/results.csv` writes `out/results_parameters.csv`
/// and its siblings. Returns the files written.
pub fn export_report(
    report: &AnalysisReport,
    path: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, GrowthError> {
    let path = path.as_ref();
    match extension(path).as_str() {
        "json" => {
            write_json_report(report, path, true)?;
            Ok(vec![path.to_path_buf()])
        }
        "xlsx" => {
            write_tables_excel(&report.tables(), path)?;
            Ok(vec![path.to_path_buf()])
        }
        _ => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| report.dataset_name.clone());
            write_tables_csv(&report.tables(), dir, &stem)
        }
    }
}

/// Positions of the required columns in a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ColumnLayout {
    pub age: usize,
    pub weight: usize,
    pub breed_group: usize,
}

impl ColumnLayout {
    /// Locate Age, Weight and Breed_Group, ignoring case, spaces and underscores.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Result<Self, GrowthError> {
        let find = |wanted: &str, display: &str| {
            headers
                .iter()
                .position(|h| normalize_header(h.as_ref()) == wanted)
                .ok_or_else(|| GrowthError::MissingColumn(display.to_string()))
        };
        Ok(Self {
            age: find("age", "Age")?,
            weight: find("weight", "Weight")?,
            breed_group: find("breedgroup", "Breed_Group")?,
        })
    }
}

pub(crate) fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Numeric cell text; blank or unparseable cells become `NaN`.
pub(crate) fn parse_number(cell: &str) -> f64 {
    cell.trim().parse::<f64>().unwrap_or(f64::NAN)
}

pub(crate) fn stem_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Observation;

    fn sample_dataset() -> Dataset {
        Dataset::with_observations(
            "IO Trait Test",
            vec![
                Observation::new(6.0, 180.0, "Angus"),
                Observation::new(12.0, 310.5, "Angus"),
                Observation::new(6.0, 150.0, "Nelore"),
            ],
        )
    }

    #[test]
    fn test_csv_trait_roundtrip() {
        let ds = sample_dataset();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.csv");

        let writer: &dyn DatasetWriter = &CsvFormat;
        writer.write(&ds, &path).unwrap();

        let reader: &dyn DatasetReader = &CsvFormat;
        let loaded = reader.read(&path).unwrap();

        assert_eq!(loaded.name, "test");
        assert_eq!(loaded.observations, ds.observations);
    }

    #[test]
    fn test_json_trait_roundtrip() {
        let ds = sample_dataset();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.json");

        let writer: &dyn DatasetWriter = &JsonFormat { pretty: true };
        writer.write(&ds, &path).unwrap();

        let loaded = read_dataset(&path).unwrap();
        assert_eq!(loaded.observations, ds.observations);
    }

    #[test]
    fn test_excel_trait_roundtrip() {
        let ds = sample_dataset();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.xlsx");

        ExcelFormat.write(&ds, &path).unwrap();
        let loaded = read_dataset(&path).unwrap();
        assert_eq!(loaded.observations, ds.observations);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = read_dataset("weights.parquet").unwrap_err();
        assert!(matches!(err, GrowthError::ParseError(_)));
    }

    #[test]
    fn test_json_format_default() {
        let fmt = JsonFormat::default();
        assert!(!fmt.pretty);
    }

    #[test]
    fn test_column_layout_ignores_case_spaces_underscores() {
        let layout = ColumnLayout::resolve(&["Breed Group", "WEIGHT", "age"]).unwrap();
        assert_eq!(
            layout,
            ColumnLayout {
                age: 2,
                weight: 1,
                breed_group: 0
            }
        );
        assert!(ColumnLayout::resolve(&["Age", "Weight", "breed_group"]).is_ok());
    }

    #[test]
    fn test_column_layout_missing_column() {
        let err = ColumnLayout::resolve(&["Age", "Breed_Group"]).unwrap_err();
        assert!(matches!(err, GrowthError::MissingColumn(ref c) if c == "Weight"));
        assert_eq!(err.to_string(), "Missing required column: Weight");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 12.5 "), 12.5);
        assert!(parse_number("").is_nan());
        assert!(parse_number("n/a").is_nan());
    }
}
