use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use covidtrack_parser::EntityKey;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::frame::date_series;
use crate::metrics::{DerivedRow, DerivedTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalCases,
    TotalDeaths,
    TotalVaccinations,
    NewCases,
    NewDeaths,
    NewCasesRollingMean,
    VaccinationCoverage,
    CaseFatality,
    WindowedCaseFatality,
    CasesPerMillion,
    VaccinationsPerHundred,
}

impl Metric {
    pub const ALL: [Metric; 11] = [
        Metric::TotalCases,
        Metric::TotalDeaths,
        Metric::TotalVaccinations,
        Metric::NewCases,
        Metric::NewDeaths,
        Metric::NewCasesRollingMean,
        Metric::VaccinationCoverage,
        Metric::CaseFatality,
        Metric::WindowedCaseFatality,
        Metric::CasesPerMillion,
        Metric::VaccinationsPerHundred,
    ];

    pub fn canonical_name(&self) -> &'static str {
        match self {
            Metric::TotalCases => "total_cases",
            Metric::TotalDeaths => "total_deaths",
            Metric::TotalVaccinations => "total_vaccinations",
            Metric::NewCases => "new_cases",
            Metric::NewDeaths => "new_deaths",
            Metric::NewCasesRollingMean => "new_cases_rolling_mean",
            Metric::VaccinationCoverage => "vaccination_coverage",
            Metric::CaseFatality => "case_fatality",
            Metric::WindowedCaseFatality => "windowed_case_fatality",
            Metric::CasesPerMillion => "cases_per_million",
            Metric::VaccinationsPerHundred => "vaccinations_per_hundred",
        }
    }

    pub fn value(&self, row: &DerivedRow) -> Option<f64> {
        let record = &row.record;
        let metrics = &row.metrics;
        match self {
            Metric::TotalCases => record.total_cases.map(|value| value as f64),
            Metric::TotalDeaths => record.total_deaths.map(|value| value as f64),
            Metric::TotalVaccinations => record.total_vaccinations.map(|value| value as f64),
            Metric::NewCases => metrics.new_cases.map(|value| value as f64),
            Metric::NewDeaths => metrics.new_deaths.map(|value| value as f64),
            Metric::NewCasesRollingMean => metrics.new_cases_rolling_mean,
            Metric::VaccinationCoverage => metrics.vaccination_coverage,
            Metric::CaseFatality => metrics.case_fatality,
            Metric::WindowedCaseFatality => metrics.windowed_case_fatality,
            Metric::CasesPerMillion => metrics.cases_per_million,
            Metric::VaccinationsPerHundred => metrics.vaccinations_per_hundred,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

impl FromStr for Metric {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        Metric::ALL
            .into_iter()
            .find(|metric| metric.canonical_name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| PipelineError::UnknownMetric(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// A chart-ready view over a [`DerivedTable`]: one date-ascending point sequence per entity.
///
/// Nothing is materialised up front; every call to [`MetricSeries::iter`] or
/// [`MetricSeries::points`] walks the borrowed table again.
#[derive(Debug, Clone)]
pub struct MetricSeries<'a> {
    table: &'a DerivedTable,
    metric: Metric,
    entities: Vec<&'a EntityKey>,
}

impl<'a> MetricSeries<'a> {
    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn entities(&self) -> &[&'a EntityKey] {
        &self.entities
    }

    pub fn points(&self, entity: &'a EntityKey) -> SeriesPoints<'a> {
        SeriesPoints {
            rows: self.table.rows().iter(),
            entity,
            metric: self.metric,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a EntityKey, SeriesPoints<'a>)> + '_ {
        self.entities
            .iter()
            .map(move |entity| (*entity, self.points(*entity)))
    }

    /// Long-format frame with one row per (entity, date).
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut codes: Vec<&str> = Vec::new();
        let mut names: Vec<&str> = Vec::new();
        let mut dates: Vec<NaiveDate> = Vec::new();
        let mut values: Vec<Option<f64>> = Vec::new();

        for (entity, points) in self.iter() {
            for point in points {
                codes.push(entity.code.as_str());
                names.push(entity.name.as_str());
                dates.push(point.date);
                values.push(point.value);
            }
        }

        DataFrame::new(vec![
            Series::new("entity_code".into(), codes).into(),
            Series::new("entity_name".into(), names).into(),
            date_series("date", &dates)?.into(),
            Series::new(self.metric.canonical_name().into(), values).into(),
        ])
    }
}

pub struct SeriesPoints<'a> {
    rows: std::slice::Iter<'a, DerivedRow>,
    entity: &'a EntityKey,
    metric: Metric,
}

impl Iterator for SeriesPoints<'_> {
    type Item = SeriesPoint;

    fn next(&mut self) -> Option<Self::Item> {
        let entity = self.entity;
        let row = self.rows.find(|row| &row.record.entity == entity)?;
        Some(SeriesPoint {
            date: row.record.date,
            value: self.metric.value(row),
        })
    }
}

/// Builds the per-entity sequence of `metric`. An empty `entities` list selects every
/// entity in the table; identifiers that match nothing are skipped with a warning.
pub fn aggregate_by_date<'a, I, S>(
    table: &'a DerivedTable,
    metric: Metric,
    entities: I,
) -> Result<MetricSeries<'a>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let requested: Vec<String> = entities
        .into_iter()
        .map(|identifier| identifier.as_ref().trim().to_string())
        .filter(|identifier| !identifier.is_empty())
        .collect();

    let resolved: Vec<&'a EntityKey> = if requested.is_empty() {
        table.entities()
    } else {
        let mut resolved: Vec<&'a EntityKey> = Vec::new();
        for identifier in &requested {
            match table.resolve(identifier) {
                Some(entity) if !resolved.contains(&entity) => resolved.push(entity),
                Some(_) => {}
                None => warn!(identifier = %identifier, "entity not present in derived table"),
            }
        }
        resolved
    };

    if resolved.is_empty() {
        return Err(PipelineError::EmptySelection { requested });
    }

    Ok(MetricSeries {
        table,
        metric,
        entities: resolved,
    })
}
