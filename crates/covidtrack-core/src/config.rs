use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::series::Metric;

pub const DEFAULT_SOURCE: &str = "data/owid-covid-data.csv";
pub const DEFAULT_WINDOW: usize = 7;
pub const DEFAULT_ENTITIES: [&str; 6] = [
    "United States",
    "India",
    "Brazil",
    "Germany",
    "Kenya",
    "South Africa",
];

/// Inclusive calendar range.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(PipelineError::InvalidDateRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Candidate input locations, tried in order.
    pub sources: Vec<PathBuf>,
    pub entities: BTreeSet<String>,
    pub date_range: Option<DateRange>,
    pub window: usize,
    pub drop_rows_without_counts: bool,
    pub exclude_aggregates_from_snapshot: bool,
    pub chart_metrics: Vec<Metric>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: vec![PathBuf::from(DEFAULT_SOURCE)],
            entities: DEFAULT_ENTITIES.iter().map(|name| name.to_string()).collect(),
            date_range: None,
            window: DEFAULT_WINDOW,
            drop_rows_without_counts: true,
            exclude_aggregates_from_snapshot: true,
            chart_metrics: vec![
                Metric::TotalCases,
                Metric::TotalDeaths,
                Metric::NewCasesRollingMean,
                Metric::CaseFatality,
                Metric::TotalVaccinations,
                Metric::VaccinationsPerHundred,
            ],
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(PipelineError::Config(
                "window must be at least one row".to_string(),
            ));
        }
        if self.sources.is_empty() {
            return Err(PipelineError::Config(
                "at least one source location is required".to_string(),
            ));
        }
        if let Some(range) = &self.date_range {
            range.validate()?;
        }
        Ok(())
    }
}

pub fn parse_config(toml_str: &str) -> Result<PipelineConfig> {
    let config = toml::from_str::<PipelineConfig>(toml_str)
        .map_err(|err| PipelineError::Config(format!("failed to parse config TOML: {err}")))?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_config(&content)
}
