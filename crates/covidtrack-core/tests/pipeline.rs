use std::path::PathBuf;

use chrono::NaiveDate;
use covidtrack_core::config::{DateRange, PipelineConfig};
use covidtrack_core::{run_pipeline, PipelineError};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../covidtrack-parser/tests/data")
        .join(name)
}

fn config_for(sources: Vec<PathBuf>, entities: &[&str]) -> PipelineConfig {
    PipelineConfig {
        sources,
        entities: entities.iter().map(|name| name.to_string()).collect(),
        ..PipelineConfig::default()
    }
}

#[test]
fn falls_back_to_next_available_source() {
    let config = config_for(
        vec![
            fixture_path("does_not_exist.csv"),
            fixture_path("owid_sample.csv"),
        ],
        &["Kenya", "Niue"],
    );
    let output = run_pipeline(&config).unwrap();

    let location = &output.summary.source.as_ref().unwrap().location;
    assert!(location.ends_with("owid_sample.csv"));
    assert_eq!(output.loaded.len(), 12);
    assert_eq!(output.cleaned.len(), 10);
    assert_eq!(output.derived.len(), 5);
    assert_eq!(output.summary.selected_entities, vec!["Kenya (KEN)", "Niue (NIU)"]);
    assert_eq!(output.summary.insufficient_history, vec!["Niue (NIU)"]);

    // The snapshot ignores the entity selection.
    let snapshot = output.snapshot.unwrap();
    assert_eq!(snapshot.rows.len(), 3);
}

#[test]
fn missing_population_column_is_a_schema_mismatch() {
    let config = config_for(vec![fixture_path("owid_no_population.csv")], &["Kenya"]);
    match run_pipeline(&config).unwrap_err() {
        PipelineError::SchemaMismatch { missing, .. } => assert_eq!(missing, vec!["population"]),
        other => panic!("expected schema mismatch, got {other:?}"),
    }
}

#[test]
fn no_available_source_is_reported() {
    let config = config_for(vec![fixture_path("does_not_exist.csv")], &["Kenya"]);
    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(err, PipelineError::SourceUnavailable(_)));
}

#[test]
fn absent_entities_are_an_empty_selection() {
    let config = config_for(vec![fixture_path("owid_sample.csv")], &["Z"]);
    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(err, PipelineError::EmptySelection { .. }));
}

#[test]
fn range_outside_history_is_an_empty_selection() {
    let mut config = config_for(vec![fixture_path("owid_sample.csv")], &["Kenya"]);
    config.date_range = Some(
        DateRange::new(
            NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2022, 1, 31).unwrap(),
        )
        .unwrap(),
    );
    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(err, PipelineError::EmptySelection { .. }));
}

#[test]
fn date_range_trims_derived_rows() {
    let mut config = config_for(vec![fixture_path("owid_sample.csv")], &["Kenya"]);
    config.date_range = Some(
        DateRange::new(
            NaiveDate::from_ymd_opt(2021, 3, 2).unwrap(),
            NaiveDate::from_ymd_opt(2021, 3, 4).unwrap(),
        )
        .unwrap(),
    );
    config.window = 2;
    let output = run_pipeline(&config).unwrap();

    assert_eq!(output.derived.len(), 3);
    // The first row in range has no predecessor, so its delta is undefined.
    let first = &output.derived.rows()[0];
    assert_eq!(first.metrics.new_cases, None);
    assert_eq!(output.summary.window, 2);
    assert_eq!(output.summary.revisions_clamped, 1);
}
