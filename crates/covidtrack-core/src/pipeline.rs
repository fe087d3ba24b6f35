use std::path::Path;

use chrono::{DateTime, Utc};
use covidtrack_parser::{load_first_available, load_table, SourceInfo, Table};
use serde::Serialize;
use tracing::info;

use crate::clean::{clean_with_summary, CleanOptions, CleanSummary};
use crate::config::{DateRange, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::metrics::{derive_daily_metrics_with, DerivedTable, MetricOptions};
use crate::select::{filter_date_range, select_entities};
use crate::snapshot::{latest_snapshot, Snapshot};

/// Reads one source location into a table whose columns have been validated.
pub fn load(source: impl AsRef<Path>) -> Result<Table> {
    Ok(load_table(source)?)
}

/// Loads the first candidate location that is available.
pub fn load_any<P: AsRef<Path>>(candidates: &[P]) -> Result<Table> {
    Ok(load_first_available(candidates)?)
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub generated_at: DateTime<Utc>,
    pub source: Option<SourceInfo>,
    pub clean: CleanSummary,
    pub requested_entities: Vec<String>,
    pub selected_entities: Vec<String>,
    pub date_range: Option<DateRange>,
    pub row_count: usize,
    pub window: usize,
    pub revisions_clamped: usize,
    pub insufficient_history: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub loaded: Table,
    pub cleaned: Table,
    pub derived: DerivedTable,
    pub snapshot: Option<Snapshot>,
    pub summary: PipelineSummary,
}

pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;
    let loaded = load_any(&config.sources)?;
    info!(
        rows = loaded.len(),
        source = loaded
            .source
            .as_ref()
            .map(|source| source.location.as_str())
            .unwrap_or("<memory>"),
        "Loaded source table"
    );
    run_on_table(config, loaded)
}

/// Load → clean → select → date range → derive, plus the latest-date snapshot of the
/// unselected table.
pub fn run_on_table(config: &PipelineConfig, loaded: Table) -> Result<PipelineOutput> {
    config.validate()?;

    let (cleaned, clean_summary) = clean_with_summary(
        &loaded,
        &CleanOptions {
            drop_rows_without_counts: config.drop_rows_without_counts,
        },
    );

    let mut selected = select_entities(&cleaned, &config.entities)?;
    if let Some(range) = &config.date_range {
        selected = filter_date_range(&selected, range)?;
        if selected.is_empty() {
            return Err(PipelineError::EmptySelection {
                requested: config.entities.iter().cloned().collect(),
            });
        }
    }

    let derived = derive_daily_metrics_with(
        &selected,
        &MetricOptions {
            window: config.window,
        },
    )?;

    let snapshot = latest_snapshot(&loaded, config.exclude_aggregates_from_snapshot);

    let summary = PipelineSummary {
        generated_at: Utc::now(),
        source: loaded.source.clone(),
        clean: clean_summary,
        requested_entities: config.entities.iter().cloned().collect(),
        selected_entities: derived
            .entities()
            .iter()
            .map(|entity| entity.to_string())
            .collect(),
        date_range: config.date_range,
        row_count: derived.len(),
        window: derived.window(),
        revisions_clamped: derived.revisions_clamped(),
        insufficient_history: derived
            .insufficient_history()
            .iter()
            .map(|entity| entity.to_string())
            .collect(),
    };

    info!(
        rows = summary.row_count,
        entities = summary.selected_entities.len(),
        "Pipeline finished"
    );

    Ok(PipelineOutput {
        loaded,
        cleaned,
        derived,
        snapshot,
        summary,
    })
}
