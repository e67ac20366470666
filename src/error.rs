use thiserror::Error;

/// Errors that can occur while loading growth data or running the pipeline.
///
/// Numerical failures of a single fit are not errors: they are recorded on the
/// [`FitResult`](crate::analysis::FitResult) so the remaining fits still run.
#[derive(Error, Debug)]
pub enum GrowthError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Dataset contains no observations")]
    EmptyDataset,

    #[error("Breed group '{0}' has no usable observations")]
    EmptyStratum(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl GrowthError {
    /// Whether this error is an input problem detected before any fitting.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            GrowthError::MissingColumn(_)
                | GrowthError::EmptyDataset
                | GrowthError::EmptyStratum(_)
                | GrowthError::ParseError(_)
        )
    }
}

impl From<calamine::Error> for GrowthError {
    fn from(e: calamine::Error) -> Self {
        GrowthError::Excel(e.to_string())
    }
}

impl From<calamine::XlsxError> for GrowthError {
    fn from(e: calamine::XlsxError) -> Self {
        GrowthError::Excel(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for GrowthError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        GrowthError::Excel(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = GrowthError::from(io_err);
        let msg = err.to_string();
        assert!(msg.contains("IO error"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn test_excel_error_display() {
        let err = GrowthError::Excel("bad sheet".to_string());
        assert_eq!(err.to_string(), "Excel error: bad sheet");
    }

    #[test]
    fn test_missing_column_display() {
        let err = GrowthError::MissingColumn("Breed_Group".to_string());
        assert_eq!(err.to_string(), "Missing required column: Breed_Group");
    }

    #[test]
    fn test_empty_stratum_display() {
        let err = GrowthError::EmptyStratum("Angus".to_string());
        assert_eq!(
            err.to_string(),
            "Breed group 'Angus' has no usable observations"
        );
    }

    #[test]
    fn test_input_error_classification() {
        assert!(GrowthError::EmptyDataset.is_input_error());
        assert!(GrowthError::MissingColumn("Age".into()).is_input_error());
        assert!(GrowthError::EmptyStratum("A".into()).is_input_error());
        assert!(!GrowthError::Excel("x".into()).is_input_error());
        assert!(!GrowthError::ValidationError("x".into()).is_input_error());
    }

    #[test]
    fn test_json_error_from_conversion() {
        let result: Result<serde_json::Value, _> = serde_json::from_str("not valid json{{{");
        let json_err = result.unwrap_err();
        let err: GrowthError = json_err.into();
        assert!(matches!(err, GrowthError::Json(_)));
        assert!(err.to_string().contains("JSON error"));
    }

    #[test]
    fn test_toml_error_from_conversion() {
        let result: Result<toml::Value, _> = toml::from_str("= broken");
        let err: GrowthError = result.unwrap_err().into();
        assert!(matches!(err, GrowthError::Config(_)));
    }

    #[test]
    fn test_error_is_debug() {
        let err = GrowthError::ParseError("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("ParseError"));
    }
}
