use std::collections::BTreeSet;
use std::fs::File;
use std::path::PathBuf;

use covidtrack_core::config::PipelineConfig;
use covidtrack_core::outputs::{
    series_file_name, write_outputs, METRICS_CSV, METRICS_PARQUET, SNAPSHOT_JSON, SUMMARY_JSON,
};
use covidtrack_core::{load, run_on_table, Metric};
use polars::prelude::{ParquetReader, SerReader};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../covidtrack-parser/tests/data")
        .join(name)
}

fn config() -> PipelineConfig {
    PipelineConfig {
        entities: BTreeSet::from(["Kenya".to_string(), "DEU".to_string()]),
        ..PipelineConfig::default()
    }
}

#[test]
fn writes_every_artifact() {
    let config = config();
    let output = run_on_table(&config, load(fixture_path("owid_sample.csv")).unwrap()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("run");

    let artifacts = write_outputs(&output, &config.chart_metrics, &out_dir).unwrap();

    assert_eq!(artifacts.metrics_csv, out_dir.join(METRICS_CSV));
    let mut reader = csv::Reader::from_path(&artifacts.metrics_csv).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert!(headers.iter().any(|name| name == "new_cases"));
    assert!(headers.iter().any(|name| name == "total_deaths_filled"));
    assert_eq!(reader.records().count(), 7);

    assert_eq!(artifacts.metrics_parquet, out_dir.join(METRICS_PARQUET));
    let df = ParquetReader::new(File::open(&artifacts.metrics_parquet).unwrap())
        .finish()
        .unwrap();
    assert_eq!(df.height(), 7);

    assert_eq!(artifacts.series.len(), config.chart_metrics.len());
    let cases_series = out_dir.join(series_file_name(Metric::TotalCases));
    assert!(artifacts.series.contains(&cases_series));
    let series_rows = csv::Reader::from_path(&cases_series)
        .unwrap()
        .records()
        .count();
    assert_eq!(series_rows, 7);

    assert_eq!(artifacts.snapshot, Some(out_dir.join(SNAPSHOT_JSON)));

    let summary: serde_json::Value =
        serde_json::from_reader(File::open(out_dir.join(SUMMARY_JSON)).unwrap()).unwrap();
    assert_eq!(summary["row_count"], 7);
    assert_eq!(summary["revisions_clamped"], 1);
    assert_eq!(summary["window"], 7);
    assert_eq!(summary["clean"]["unusable_entity_rows"], 1);
}

#[test]
fn series_file_names_follow_metric() {
    assert_eq!(
        series_file_name(Metric::VaccinationsPerHundred),
        "series_vaccinations_per_hundred.csv"
    );
}
