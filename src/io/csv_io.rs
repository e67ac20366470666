use std::io::Read;
use std::path::{Path, PathBuf};

use super::{parse_number, stem_name, ColumnLayout};
use crate::analysis::{ReportTables, TableRow};
use crate::error::GrowthError;
use crate::models::{Dataset, Observation};

fn parse_csv_records<R: Read>(
    rdr: &mut csv::Reader<R>,
) -> Result<Vec<Observation>, GrowthError> {
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let layout = ColumnLayout::resolve(&headers)?;

    let mut observations = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let cell = |idx: usize| record.get(idx).unwrap_or("");
        observations.push(Observation::new(
            parse_number(cell(layout.age)),
            parse_number(cell(layout.weight)),
            cell(layout.breed_group).trim(),
        ));
    }
    Ok(observations)
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(true).flexible(true).trim(csv::Trim::All);
    builder
}

/// Read weight-at-age data from a CSV file.
///
/// Requires Age, Weight and Breed_Group columns in any order; other columns
/// are ignored. Blank or unparseable numbers load as `NaN`.
pub fn read_csv(path: impl AsRef<Path>) -> Result<Dataset, GrowthError> {
    let path = path.as_ref();
    let mut rdr = reader_builder().from_path(path)?;
    let observations = parse_csv_records(&mut rdr)?;
    Ok(Dataset::with_observations(stem_name(path), observations))
}

/// Read weight-at-age data from CSV bytes.
pub fn read_csv_from_bytes(data: &[u8], name: &str) -> Result<Dataset, GrowthError> {
    let mut rdr = reader_builder().from_reader(data);
    let observations = parse_csv_records(&mut rdr)?;
    Ok(Dataset::with_observations(name, observations))
}

/// Write a dataset as Age, Weight, Breed_Group rows.
pub fn write_csv(dataset: &Dataset, path: impl AsRef<Path>) -> Result<(), GrowthError> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    wtr.write_record(["Age", "Weight", "Breed_Group"])?;
    for obs in &dataset.observations {
        wtr.write_record([
            obs.age.to_string(),
            obs.weight.to_string(),
            obs.breed_group.clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_rows<R: TableRow>(rows: &[R], path: &Path) -> Result<(), GrowthError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(R::HEADERS)?;
    for row in rows {
        wtr.write_record(row.values().iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the output tables as `<stem>_parameters.csv`, `<stem>_metrics.csv`,
/// `<stem>_convergence.csv` and `<stem>_selection.csv` inside `dir`.
///
/// Missing values are written as `NA`.
pub fn write_tables_csv(
    tables: &ReportTables,
    dir: impl AsRef<Path>,
    stem: &str,
) -> Result<Vec<PathBuf>, GrowthError> {
    let dir = dir.as_ref();
    let path = |suffix: &str| dir.join(format!("{stem}_{suffix}.csv"));

    let written = vec![
        path("parameters"),
        path("metrics"),
        path("convergence"),
        path("selection"),
    ];
    write_rows(&tables.parameters, &written[0])?;
    write_rows(&tables.metrics, &written[1])?;
    write_rows(&tables.convergence, &written[2])?;
    write_rows(&tables.selection, &written[3])?;

    tracing::info!(dir = %dir.display(), stem, "wrote output tables");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FitTable, Fitter};
    use crate::models::GrowthModel;

    #[test]
    fn test_read_csv_from_bytes() {
        let data = b"Age,Weight,Breed_Group\n1,45.5,Angus\n12,320,Angus\n6,190,Nelore\n";
        let ds = read_csv_from_bytes(data, "bytes").unwrap();
        assert_eq!(ds.name, "bytes");
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.observations[0], Observation::new(1.0, 45.5, "Angus"));
        assert_eq!(ds.breed_groups(), vec!["Angus", "Nelore"]);
    }

    #[test]
    fn test_header_variants_and_extra_columns() {
        let data = b"animal_id, breed group ,AGE,weight\n7,Hereford,3,110\n";
        let ds = read_csv_from_bytes(data, "variants").unwrap();
        assert_eq!(ds.observations[0], Observation::new(3.0, 110.0, "Hereford"));
    }

    #[test]
    fn test_missing_column_is_error() {
        let data = b"Age,Breed_Group\n1,Angus\n";
        let err = read_csv_from_bytes(data, "bad").unwrap_err();
        assert!(matches!(err, GrowthError::MissingColumn(ref c) if c == "Weight"));
    }

    #[test]
    fn test_blank_and_unparseable_cells_load_as_nan() {
        let data = b"Age,Weight,Breed_Group\n1,,Angus\nx,50,Angus\n2,60,\n";
        let ds = read_csv_from_bytes(data, "gaps").unwrap();
        assert_eq!(ds.len(), 3);
        assert!(ds.observations[0].weight.is_nan());
        assert!(ds.observations[1].age.is_nan());
        assert_eq!(ds.observations[2].breed_group, "");
        assert_eq!(ds.num_complete(), 0);
    }

    #[test]
    fn test_short_rows_and_blank_lines() {
        let data = b"Age,Weight,Breed_Group\n1,40\n,,\n2,50,Angus\n";
        let ds = read_csv_from_bytes(data, "short").unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.observations[0].breed_group, "");
        assert!(ds.observations[1].is_complete());
    }

    #[test]
    fn test_read_missing_file() {
        assert!(read_csv("/nonexistent/weights.csv").is_err());
    }

    #[test]
    fn test_write_tables_csv() {
        let stratum = crate::models::Stratum::new(
            "Zebu",
            vec![
                Observation::new(1.0, 40.0, "Zebu"),
                Observation::new(2.0, 55.0, "Zebu"),
            ],
        );
        let fitter = Fitter::default();
        let table: FitTable = GrowthModel::ALL
            .into_iter()
            .map(|m| fitter.fit(m, &stratum))
            .collect();

        let dir = tempfile::tempdir().unwrap();
        let written = write_tables_csv(&table.tables(), dir.path(), "run").unwrap();
        assert_eq!(written.len(), 4);
        assert!(dir.path().join("run_parameters.csv").exists());

        let metrics = std::fs::read_to_string(dir.path().join("run_metrics.csv")).unwrap();
        let mut lines = metrics.lines();
        assert_eq!(lines.next(), Some("Breed_Group,Model,N,RSS,AIC,BIC,R2"));
        assert_eq!(lines.next(), Some("Zebu,Brody,2,NA,NA,NA,NA"));
        assert_eq!(metrics.lines().count(), 4);

        let convergence =
            std::fs::read_to_string(dir.path().join("run_convergence.csv")).unwrap();
        assert!(convergence.contains("Failed"));
        assert!(convergence.contains(",8,"));
    }
}
