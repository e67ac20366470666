use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{normalize_header, parse_number, stem_name, ColumnLayout};
use crate::analysis::{AnalysisReport, QualityReport, ReportTables, StratumSummary};
use crate::error::GrowthError;
use crate::models::{Dataset, Observation};

fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => parse_number(s),
        _ => f64::NAN,
    }
}

fn label(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Parse an array of records such as
/// `[{"Age": 6, "Weight": 180.5, "Breed_Group": "Angus"}, ...]`.
fn parse_records(content: &str, name: &str) -> Result<Dataset, GrowthError> {
    let records: Vec<Map<String, Value>> = serde_json::from_str(content)?;
    if records.is_empty() {
        return Ok(Dataset::new(name));
    }

    let keys: Vec<String> = records
        .iter()
        .flat_map(|r| r.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let layout = ColumnLayout::resolve(&keys)?;
    let (age_key, weight_key, group_key) = (
        normalize_header(&keys[layout.age]),
        normalize_header(&keys[layout.weight]),
        normalize_header(&keys[layout.breed_group]),
    );

    let observations = records
        .iter()
        .map(|record| {
            let field = |wanted: &str| {
                record
                    .iter()
                    .find(|(k, _)| normalize_header(k) == wanted)
                    .map(|(_, v)| v)
            };
            Observation::new(
                number(field(&age_key)),
                number(field(&weight_key)),
                label(field(&group_key)),
            )
        })
        .collect();

    Ok(Dataset::with_observations(name, observations))
}

/// Read weight-at-age data from a JSON file holding an array of records.
pub fn read_json(path: impl AsRef<Path>) -> Result<Dataset, GrowthError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    parse_records(&content, &stem_name(path))
}

/// Read weight-at-age data from JSON bytes.
pub fn read_json_from_bytes(data: &[u8], name: &str) -> Result<Dataset, GrowthError> {
    let content = std::str::from_utf8(data)
        .map_err(|e| GrowthError::ParseError(format!("Invalid UTF-8: {e}")))?;
    parse_records(content, name)
}

#[derive(Serialize)]
struct Record<'a> {
    #[serde(rename = "Age")]
    age: f64,
    #[serde(rename = "Weight")]
    weight: f64,
    #[serde(rename = "Breed_Group")]
    breed_group: &'a str,
}

/// Write a dataset as an array of records.
pub fn write_json(
    dataset: &Dataset,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), GrowthError> {
    let records: Vec<Record> = dataset
        .observations
        .iter()
        .map(|o| Record {
            age: o.age,
            weight: o.weight,
            breed_group: &o.breed_group,
        })
        .collect();
    let content = if pretty {
        serde_json::to_string_pretty(&records)?
    } else {
        serde_json::to_string(&records)?
    };
    std::fs::write(path.as_ref(), content)?;
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    dataset: &'a str,
    quality: &'a QualityReport,
    summaries: &'a [StratumSummary],
    #[serde(flatten)]
    tables: ReportTables,
}

/// Write the quality report, summaries and output tables as one JSON document.
///
/// Missing values are written as `null`.
pub fn write_json_report(
    report: &AnalysisReport,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), GrowthError> {
    let doc = JsonReport {
        dataset: &report.dataset_name,
        quality: &report.quality,
        summaries: &report.summaries,
        tables: report.tables(),
    };
    let content = if pretty {
        serde_json::to_string_pretty(&doc)?
    } else {
        serde_json::to_string(&doc)?
    };
    std::fs::write(path.as_ref(), content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;
    use crate::config::GrowthConfig;

    #[test]
    fn test_read_records() {
        let data = br#"[
            {"Age": 1, "Weight": 42.5, "Breed_Group": "Angus"},
            {"age": "12", "weight": 300, "breed group": "Angus", "id": 9},
            {"Age": 6, "Weight": null, "Breed_Group": "Nelore"}
        ]"#;
        let ds = read_json_from_bytes(data, "records").unwrap();
        assert_eq!(ds.name, "records");
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.observations[0], Observation::new(1.0, 42.5, "Angus"));
        assert_eq!(ds.observations[1], Observation::new(12.0, 300.0, "Angus"));
        assert!(ds.observations[2].weight.is_nan());
    }

    #[test]
    fn test_missing_column() {
        let data = br#"[{"Age": 1, "Weight": 42.5}]"#;
        let err = read_json_from_bytes(data, "x").unwrap_err();
        assert!(matches!(err, GrowthError::MissingColumn(ref c) if c == "Breed_Group"));
    }

    #[test]
    fn test_empty_array_is_empty_dataset() {
        let ds = read_json_from_bytes(b"[]", "empty").unwrap();
        assert!(ds.is_empty());
    }

    #[test]
    fn test_not_an_array() {
        let err = read_json_from_bytes(br#"{"Age": 1}"#, "x").unwrap_err();
        assert!(matches!(err, GrowthError::Json(_)));
    }

    #[test]
    fn test_invalid_utf8() {
        let err = read_json_from_bytes(&[0xff, 0xfe], "x").unwrap_err();
        assert!(matches!(err, GrowthError::ParseError(_)));
    }

    #[test]
    fn test_write_json_report() {
        let observations = vec![
            Observation::new(1.0, 40.0, "Zebu"),
            Observation::new(2.0, 55.0, "Zebu"),
        ];
        let ds = Dataset::with_observations("tiny", observations);
        let report = Analyzer::new(&ds).run(&GrowthConfig::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json_report(&report, &path, false).unwrap();

        let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["dataset"], "tiny");
        assert_eq!(value["metrics"].as_array().unwrap().len(), 3);
        assert!(value["metrics"][0]["aic"].is_null());
        assert_eq!(value["convergence"][0]["status"], "Failed");
        assert_eq!(value["convergence"][0]["stop_code"], 8);
        assert_eq!(value["summaries"][0]["n"], 2);
    }

    #[test]
    fn test_json_report_lists_out_of_range_rows() {
        let observations = vec![
            Observation::new(1.0, 40.0, "Zebu"),
            Observation::new(2.0, 55.0, "Zebu"),
            Observation::new(3.0, -10.0, "Zebu"),
        ];
        let ds = Dataset::with_observations("range", observations);
        let report = Analyzer::new(&ds).run(&GrowthConfig::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json_report(&report, &path, false).unwrap();

        let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let invalid = value["quality"]["invalid"].as_array().unwrap();
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0]["row"], 3);
        assert_eq!(invalid[0]["field"], "Weight");
        assert_eq!(invalid[0]["value"], -10.0);
    }
}
