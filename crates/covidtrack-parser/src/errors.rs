use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct SourceAttempt {
    pub location: String,
    pub message: String,
}

impl SourceAttempt {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SourceAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("source {location} unavailable: {reason}")]
    SourceUnavailable { location: String, reason: String },

    #[error("source {location} CSV error: {source}")]
    Csv {
        location: String,
        #[source]
        source: csv::Error,
    },

    #[error("source {location} is missing required columns: {}", missing.join(", "))]
    SchemaMismatch {
        location: String,
        missing: Vec<&'static str>,
    },

    #[error("source {location} line {line_index} invalid: {message}")]
    MalformedRow {
        location: String,
        line_index: usize,
        message: String,
    },

    #[error("no candidate source could be loaded; attempts: {attempts:?}")]
    NoAvailableSource { attempts: Vec<SourceAttempt> },
}

impl ParserError {
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, ParserError::SchemaMismatch { .. })
    }
}
