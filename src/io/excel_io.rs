use std::path::Path;

use calamine::{open_workbook, DataType, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};

use super::{stem_name, ColumnLayout};
use crate::analysis::{ReportTables, TableRow, TableValue};
use crate::error::GrowthError;
use crate::models::{Dataset, Observation};

/// Read weight-at-age data from the first sheet of an Excel (.xlsx) file.
///
/// The first row holds the headers; Age, Weight and Breed_Group are located
/// by name. Empty rows are skipped and empty or non-numeric cells load as
/// `NaN`.
pub fn read_excel(path: impl AsRef<Path>) -> Result<Dataset, GrowthError> {
    let path = path.as_ref();
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| GrowthError::Excel("No sheets found in workbook".to_string()))?;

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();

    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default();
    let layout = ColumnLayout::resolve(&headers)?;

    let mut observations = Vec::new();
    for row in rows {
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        let number = |idx: usize| -> f64 {
            row.get(idx).and_then(|c| c.as_f64()).unwrap_or(f64::NAN)
        };
        let label = row
            .get(layout.breed_group)
            .map(|c| c.to_string().trim().to_string())
            .unwrap_or_default();
        observations.push(Observation::new(
            number(layout.age),
            number(layout.weight),
            label,
        ));
    }

    Ok(Dataset::with_observations(stem_name(path), observations))
}

/// Read weight-at-age data from Excel bytes.
pub fn read_excel_from_bytes(data: &[u8], name: &str) -> Result<Dataset, GrowthError> {
    use std::io::Write;
    let mut tmp = tempfile::NamedTempFile::new()?;
    tmp.write_all(data)?;
    tmp.flush()?;
    let mut dataset = read_excel(tmp.path())?;
    dataset.name = name.to_string();
    Ok(dataset)
}

/// Write a dataset to a single-sheet workbook.
pub fn write_excel(dataset: &Dataset, path: impl AsRef<Path>) -> Result<(), GrowthError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Observations")?;

    for (col, header) in ["Age", "Weight", "Breed_Group"].iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (i, obs) in dataset.observations.iter().enumerate() {
        let row = i as u32 + 1;
        if obs.age.is_finite() {
            worksheet.write_number(row, 0, obs.age)?;
        }
        if obs.weight.is_finite() {
            worksheet.write_number(row, 1, obs.weight)?;
        }
        worksheet.write_string(row, 2, &obs.breed_group)?;
    }

    workbook.save(path.as_ref())?;
    Ok(())
}

fn write_sheet<R: TableRow>(
    workbook: &mut Workbook,
    name: &str,
    rows: &[R],
) -> Result<(), GrowthError> {
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(name)?;

    for (col, header) in R::HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        for (col, value) in row.values().into_iter().enumerate() {
            let col = col as u16;
            match value {
                TableValue::Text(s) => worksheet.write_string(r, col, s)?,
                TableValue::Number(Some(v)) if v.is_finite() => {
                    worksheet.write_number(r, col, v)?
                }
                TableValue::Number(_) => worksheet.write_string(r, col, "NA")?,
                TableValue::Count(n) => worksheet.write_number(r, col, n as f64)?,
            };
        }
    }
    Ok(())
}

/// Write the output tables to one workbook with Parameters, Metrics,
/// Convergence and Selection sheets.
pub fn write_tables_excel(
    tables: &ReportTables,
    path: impl AsRef<Path>,
) -> Result<(), GrowthError> {
    let mut workbook = Workbook::new();
    write_sheet(&mut workbook, "Parameters", &tables.parameters)?;
    write_sheet(&mut workbook, "Metrics", &tables.metrics)?;
    write_sheet(&mut workbook, "Convergence", &tables.convergence)?;
    write_sheet(&mut workbook, "Selection", &tables.selection)?;
    workbook.save(path.as_ref())?;
    tracing::info!(path = %path.as_ref().display(), "wrote output workbook");
    Ok(())
}
