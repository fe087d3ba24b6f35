// crates/covidtrack-core/src/error.rs

use covidtrack_parser::ParserError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("source {location} is missing required columns: {}", missing.join(", "))]
    SchemaMismatch {
        location: String,
        missing: Vec<&'static str>,
    },

    #[error("none of the requested entities are present: {}", requested.join(", "))]
    EmptySelection { requested: Vec<String> },

    #[error("entity {entity} has {rows} dated row(s); at least two are needed for deltas")]
    InsufficientHistory { entity: String, rows: usize },

    #[error("entity {entity} dates are not strictly increasing at {date}")]
    UnorderedHistory { entity: String, date: chrono::NaiveDate },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV writing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ParserError> for PipelineError {
    fn from(err: ParserError) -> Self {
        match err {
            ParserError::SchemaMismatch { location, missing } => {
                PipelineError::SchemaMismatch { location, missing }
            }
            other => PipelineError::SourceUnavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_schema_mismatch_keeps_its_identity() {
        let err: PipelineError = ParserError::SchemaMismatch {
            location: "data.csv".into(),
            missing: vec!["population"],
        }
        .into();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
        assert!(err.to_string().contains("population"));
    }

    #[test]
    fn parse_failures_surface_as_source_unavailable() {
        let err: PipelineError = ParserError::MalformedRow {
            location: "data.csv".into(),
            line_index: 7,
            message: "invalid date 'x'".into(),
        }
        .into();
        assert!(matches!(err, PipelineError::SourceUnavailable(_)));
        assert!(err.to_string().contains("line 7"));
    }
}
