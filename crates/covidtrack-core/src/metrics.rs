use std::collections::{HashMap, VecDeque};

use chrono::NaiveDate;
use covidtrack_parser::{EntityKey, Record, Table};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_WINDOW;
use crate::error::{PipelineError, Result};

const PER_MILLION: f64 = 1_000_000.0;
const PER_HUNDRED: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricOptions {
    /// Trailing row count for the rolling mean and the windowed case fatality.
    pub window: usize,
}

impl Default for MetricOptions {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
        }
    }
}

/// Metrics derived for one record. `None` means undefined, never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DailyMetrics {
    pub new_cases: Option<u64>,
    pub new_deaths: Option<u64>,
    pub vaccination_coverage: Option<f64>,
    pub case_fatality: Option<f64>,
    pub windowed_case_fatality: Option<f64>,
    pub new_cases_rolling_mean: Option<f64>,
    pub cases_per_million: Option<f64>,
    pub vaccinations_per_hundred: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRow {
    pub record: Record,
    pub metrics: DailyMetrics,
}

/// Input rows paired one-to-one with their derived metrics, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedTable {
    rows: Vec<DerivedRow>,
    insufficient_history: Vec<EntityKey>,
    revisions_clamped: usize,
    window: usize,
}

impl DerivedTable {
    pub fn rows(&self) -> &[DerivedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Number of adjacent-row deltas that were negative and clamped to zero.
    pub fn revisions_clamped(&self) -> usize {
        self.revisions_clamped
    }

    /// Entities with fewer than two dated rows.
    pub fn insufficient_history(&self) -> &[EntityKey] {
        &self.insufficient_history
    }

    pub fn entities(&self) -> Vec<&EntityKey> {
        let mut seen = std::collections::HashSet::new();
        self.rows
            .iter()
            .map(|row| &row.record.entity)
            .filter(|entity| seen.insert(*entity))
            .collect()
    }

    /// Finds the entity whose code or name equals `identifier`.
    pub fn resolve(&self, identifier: &str) -> Option<&EntityKey> {
        self.rows
            .iter()
            .map(|row| &row.record.entity)
            .find(|entity| entity.matches(identifier))
    }

    pub fn rows_for<'a>(
        &'a self,
        entity: &'a EntityKey,
    ) -> impl Iterator<Item = &'a DerivedRow> + 'a {
        self.rows
            .iter()
            .filter(move |row| &row.record.entity == entity)
    }

    /// Day-over-day new cases for `entity`, one entry per row after its first.
    pub fn new_case_deltas(&self, entity: &EntityKey) -> Result<Vec<Option<u64>>> {
        self.deltas(entity, |metrics| metrics.new_cases)
    }

    pub fn new_death_deltas(&self, entity: &EntityKey) -> Result<Vec<Option<u64>>> {
        self.deltas(entity, |metrics| metrics.new_deaths)
    }

    fn deltas(
        &self,
        entity: &EntityKey,
        pick: impl Fn(&DailyMetrics) -> Option<u64>,
    ) -> Result<Vec<Option<u64>>> {
        let rows: Vec<&DerivedRow> = self.rows_for(entity).collect();
        match rows.len() {
            0 => Err(PipelineError::EmptySelection {
                requested: vec![entity.to_string()],
            }),
            1 => Err(PipelineError::InsufficientHistory {
                entity: entity.to_string(),
                rows: 1,
            }),
            _ => Ok(rows[1..].iter().map(|row| pick(&row.metrics)).collect()),
        }
    }
}

#[derive(Default)]
struct EntityState {
    rows: usize,
    last_date: Option<NaiveDate>,
    last_cases: Option<i64>,
    last_deaths: Option<i64>,
    recent: VecDeque<(Option<u64>, Option<u64>)>,
}

impl EntityState {
    fn push_window(&mut self, window: usize, new_cases: Option<u64>, new_deaths: Option<u64>) {
        self.recent.push_back((new_cases, new_deaths));
        while self.recent.len() > window {
            self.recent.pop_front();
        }
    }

    /// Sums of new cases and deaths over a full window of defined deltas; `None` on overflow.
    fn window_sums(&self, window: usize) -> Option<(u64, u64)> {
        if self.recent.len() < window {
            return None;
        }
        self.recent
            .iter()
            .try_fold((0u64, 0u64), |(cases, deaths), (new_cases, new_deaths)| {
                Some((
                    cases.checked_add((*new_cases)?)?,
                    deaths.checked_add((*new_deaths)?)?,
                ))
            })
    }
}

pub fn derive_daily_metrics(table: &Table) -> Result<DerivedTable> {
    derive_daily_metrics_with(table, &MetricOptions::default())
}

/// Computes per-row deltas, ratios and trailing-window metrics.
///
/// Deltas only compare a row with the previous row of the same entity. A negative delta is a
/// downward revision by the publisher and is clamped to zero: the correction is dropped
/// rather than spread over earlier days, so summed deltas can exceed the final cumulative.
pub fn derive_daily_metrics_with(table: &Table, options: &MetricOptions) -> Result<DerivedTable> {
    if options.window == 0 {
        return Err(PipelineError::Config(
            "window must be at least one row".to_string(),
        ));
    }

    let mut states: HashMap<&EntityKey, EntityState> = HashMap::new();
    let mut revisions_clamped = 0usize;
    let mut rows = Vec::with_capacity(table.len());

    for record in &table.records {
        let state = states.entry(&record.entity).or_default();

        if let Some(last_date) = state.last_date {
            if record.date <= last_date {
                return Err(PipelineError::UnorderedHistory {
                    entity: record.entity.to_string(),
                    date: record.date,
                });
            }
        }

        let (new_cases, new_deaths) = if state.rows == 0 {
            (None, None)
        } else {
            (
                clamped_delta(record.total_cases, state.last_cases, &mut revisions_clamped),
                clamped_delta(
                    record.total_deaths,
                    state.last_deaths,
                    &mut revisions_clamped,
                ),
            )
        };

        state.push_window(options.window, new_cases, new_deaths);
        let window_sums = state.window_sums(options.window);

        state.rows += 1;
        state.last_date = Some(record.date);
        state.last_cases = record.total_cases;
        state.last_deaths = record.total_deaths;

        let population = record
            .population
            .filter(|population| *population > 0)
            .map(|population| population as f64);

        let metrics = DailyMetrics {
            new_cases,
            new_deaths,
            vaccination_coverage: record
                .total_vaccinations
                .zip(population)
                .map(|(vaccinations, population)| {
                    (vaccinations as f64 / population).clamp(0.0, 1.0)
                }),
            case_fatality: ratio(record.total_deaths, record.total_cases),
            windowed_case_fatality: window_sums.and_then(|(cases, deaths)| {
                (cases > 0).then(|| deaths as f64 / cases as f64)
            }),
            new_cases_rolling_mean: window_sums
                .map(|(cases, _)| cases as f64 / options.window as f64),
            cases_per_million: record
                .total_cases
                .zip(population)
                .map(|(cases, population)| cases as f64 / population * PER_MILLION),
            vaccinations_per_hundred: record
                .total_vaccinations
                .zip(population)
                .map(|(vaccinations, population)| vaccinations as f64 / population * PER_HUNDRED),
        };

        rows.push(DerivedRow {
            record: record.clone(),
            metrics,
        });
    }

    let mut insufficient_history: Vec<EntityKey> = states
        .iter()
        .filter(|(_, state)| state.rows < 2)
        .map(|(entity, _)| (*entity).clone())
        .collect();
    insufficient_history.sort();
    for entity in &insufficient_history {
        warn!(entity = %entity, "fewer than two dated rows; deltas are undefined");
    }

    for (entity, state) in &states {
        debug!(entity = %entity, rows = state.rows, "derived entity metrics");
    }
    info!(
        rows = rows.len(),
        entities = states.len(),
        revisions_clamped,
        window = options.window,
        "Derived daily metrics"
    );

    Ok(DerivedTable {
        rows,
        insufficient_history,
        revisions_clamped,
        window: options.window,
    })
}

fn clamped_delta(current: Option<i64>, previous: Option<i64>, clamped: &mut usize) -> Option<u64> {
    let delta = current?.saturating_sub(previous?);
    if delta < 0 {
        *clamped += 1;
        Some(0)
    } else {
        Some(delta as u64)
    }
}

fn ratio(numerator: Option<i64>, denominator: Option<i64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(numerator), Some(denominator)) if denominator > 0 => {
            Some(numerator as f64 / denominator as f64)
        }
        _ => None,
    }
}
