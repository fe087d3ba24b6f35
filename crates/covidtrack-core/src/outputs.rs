use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::frame::derived_to_dataframe;
use crate::metrics::DerivedTable;
use crate::pipeline::PipelineOutput;
use crate::series::{aggregate_by_date, Metric, MetricSeries};

pub const METRICS_CSV: &str = "metrics.csv";
pub const METRICS_PARQUET: &str = "metrics.parquet";
pub const SNAPSHOT_JSON: &str = "snapshot.json";
pub const SUMMARY_JSON: &str = "summary.json";

/// Paths of every file written for one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct OutputArtifacts {
    pub metrics_csv: PathBuf,
    pub metrics_parquet: PathBuf,
    pub series: Vec<PathBuf>,
    pub snapshot: Option<PathBuf>,
    pub summary: PathBuf,
}

#[derive(Serialize)]
struct MetricsCsvRow<'a> {
    entity_code: &'a str,
    entity_name: &'a str,
    continent: Option<&'a str>,
    date: NaiveDate,
    total_cases: Option<i64>,
    total_deaths: Option<i64>,
    total_vaccinations: Option<i64>,
    population: Option<i64>,
    total_cases_filled: bool,
    total_deaths_filled: bool,
    total_vaccinations_filled: bool,
    new_cases: Option<u64>,
    new_deaths: Option<u64>,
    vaccination_coverage: Option<f64>,
    case_fatality: Option<f64>,
    windowed_case_fatality: Option<f64>,
    new_cases_rolling_mean: Option<f64>,
    cases_per_million: Option<f64>,
    vaccinations_per_hundred: Option<f64>,
}

#[derive(Serialize)]
struct SeriesCsvRow<'a> {
    entity_code: &'a str,
    entity_name: &'a str,
    date: NaiveDate,
    metric: &'static str,
    value: Option<f64>,
}

pub fn write_metrics_csv(table: &DerivedTable, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in table.rows() {
        let record = &row.record;
        let metrics = &row.metrics;
        writer.serialize(MetricsCsvRow {
            entity_code: &record.entity.code,
            entity_name: &record.entity.name,
            continent: record.continent.as_deref(),
            date: record.date,
            total_cases: record.total_cases,
            total_deaths: record.total_deaths,
            total_vaccinations: record.total_vaccinations,
            population: record.population,
            total_cases_filled: record.filled.total_cases,
            total_deaths_filled: record.filled.total_deaths,
            total_vaccinations_filled: record.filled.total_vaccinations,
            new_cases: metrics.new_cases,
            new_deaths: metrics.new_deaths,
            vaccination_coverage: metrics.vaccination_coverage,
            case_fatality: metrics.case_fatality,
            windowed_case_fatality: metrics.windowed_case_fatality,
            new_cases_rolling_mean: metrics.new_cases_rolling_mean,
            cases_per_million: metrics.cases_per_million,
            vaccinations_per_hundred: metrics.vaccinations_per_hundred,
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_series_csv(series: &MetricSeries<'_>, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let metric = series.metric().canonical_name();
    for (entity, points) in series.iter() {
        for point in points {
            writer.serialize(SeriesCsvRow {
                entity_code: &entity.code,
                entity_name: &entity.name,
                date: point.date,
                metric,
                value: point.value,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    ParquetWriter::new(BufWriter::new(file))
        .with_compression(ParquetCompression::Zstd(None))
        .with_statistics(StatisticsOptions::default())
        .finish(df)?;
    Ok(())
}

pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

pub fn series_file_name(metric: Metric) -> String {
    format!("series_{}.csv", metric.canonical_name())
}

/// Writes the derived table, one series file per chart metric, the snapshot and the run
/// summary into `dir`, creating it when missing.
pub fn write_outputs(
    output: &PipelineOutput,
    chart_metrics: &[Metric],
    dir: &Path,
) -> Result<OutputArtifacts> {
    fs::create_dir_all(dir)?;

    let metrics_csv = dir.join(METRICS_CSV);
    write_metrics_csv(&output.derived, &metrics_csv)?;

    let metrics_parquet = dir.join(METRICS_PARQUET);
    let mut df = derived_to_dataframe(&output.derived)?;
    write_parquet(&mut df, &metrics_parquet)?;

    let mut series = Vec::with_capacity(chart_metrics.len());
    if !output.derived.is_empty() {
        for metric in chart_metrics {
            let metric_series = aggregate_by_date(&output.derived, *metric, Vec::<&str>::new())?;
            let path = dir.join(series_file_name(*metric));
            write_series_csv(&metric_series, &path)?;
            series.push(path);
        }
    }

    let snapshot = match &output.snapshot {
        Some(snapshot) => {
            let path = dir.join(SNAPSHOT_JSON);
            write_json(snapshot, &path)?;
            Some(path)
        }
        None => None,
    };

    let summary = dir.join(SUMMARY_JSON);
    write_json(&output.summary, &summary)?;

    info!(
        dir = %dir.display(),
        rows = output.derived.len(),
        series = series.len(),
        "Wrote pipeline outputs"
    );

    Ok(OutputArtifacts {
        metrics_csv,
        metrics_parquet,
        series,
        snapshot,
        summary,
    })
}
