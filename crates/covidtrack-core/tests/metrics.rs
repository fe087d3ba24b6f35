use std::path::PathBuf;

use chrono::{Duration, NaiveDate};
use covidtrack_core::{
    clean, derive_daily_metrics, derive_daily_metrics_with, load, MetricOptions, PipelineError,
    Table,
};
use covidtrack_parser::{EntityKey, Record};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../covidtrack-parser/tests/data")
        .join(name)
}

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 3, 1).unwrap() + Duration::days(offset)
}

fn entity_table(entity: &EntityKey, cases: &[i64], deaths: &[i64]) -> Vec<Record> {
    cases
        .iter()
        .zip(deaths)
        .enumerate()
        .map(|(idx, (cases, deaths))| {
            Record::new(entity.clone(), day(idx as i64))
                .with_counts(Some(*cases), Some(*deaths), Some(0))
                .with_population(Some(1_000))
        })
        .collect()
}

#[test]
fn downward_revision_is_clamped_to_zero() {
    let kenya = EntityKey::new("KEN", "Kenya");
    let table = Table::new(entity_table(&kenya, &[100, 150, 140, 200], &[1, 1, 1, 1]));
    let derived = derive_daily_metrics(&table).unwrap();

    let new_cases: Vec<Option<u64>> = derived
        .rows()
        .iter()
        .map(|row| row.metrics.new_cases)
        .collect();
    assert_eq!(new_cases, vec![None, Some(50), Some(0), Some(60)]);
    assert_eq!(derived.revisions_clamped(), 1);
    assert_eq!(
        derived.new_case_deltas(&kenya).unwrap(),
        vec![Some(50), Some(0), Some(60)]
    );
}

#[test]
fn deltas_cover_every_row_after_the_first() {
    let table = clean(&load(fixture_path("owid_sample.csv")).unwrap());
    let derived = derive_daily_metrics(&table).unwrap();

    for entity in derived.entities() {
        let rows = derived.rows_for(entity).count();
        if rows < 2 {
            continue;
        }
        let cases = derived.new_case_deltas(entity).unwrap();
        let deaths = derived.new_death_deltas(entity).unwrap();
        assert_eq!(cases.len(), rows - 1, "{entity}");
        assert_eq!(deaths.len(), rows - 1, "{entity}");
        assert!(cases.iter().all(Option::is_some));
    }
}

#[test]
fn coverage_is_a_fraction() {
    let table = clean(&load(fixture_path("owid_sample.csv")).unwrap());
    let derived = derive_daily_metrics(&table).unwrap();
    for row in derived.rows() {
        if let Some(coverage) = row.metrics.vaccination_coverage {
            assert!((0.0..=1.0).contains(&coverage), "{coverage}");
        }
    }

    let over = EntityKey::new("GIB", "Gibraltar");
    let table = Table::new(vec![Record::new(over, day(0))
        .with_counts(Some(10), Some(0), Some(2_500))
        .with_population(Some(1_000))]);
    let derived = derive_daily_metrics(&table).unwrap();
    assert_eq!(derived.rows()[0].metrics.vaccination_coverage, Some(1.0));
    assert_eq!(derived.rows()[0].metrics.vaccinations_per_hundred, Some(250.0));
}

#[test]
fn single_row_entity_has_insufficient_history() {
    let table = clean(&load(fixture_path("owid_sample.csv")).unwrap());
    let derived = derive_daily_metrics(&table).unwrap();

    let niue = derived.resolve("Niue").cloned().unwrap();
    assert!(derived.insufficient_history().contains(&niue));
    let err = derived.new_case_deltas(&niue).unwrap_err();
    assert!(matches!(err, PipelineError::InsufficientHistory { rows: 1, .. }));

    let niue_row = derived.rows_for(&niue).next().unwrap();
    assert_eq!(niue_row.metrics.new_cases, None);
}

#[test]
fn unknown_entity_has_no_deltas() {
    let kenya = EntityKey::new("KEN", "Kenya");
    let table = Table::new(entity_table(&kenya, &[1, 2], &[0, 0]));
    let derived = derive_daily_metrics(&table).unwrap();
    let err = derived
        .new_case_deltas(&EntityKey::new("ZZZ", "Z"))
        .unwrap_err();
    assert!(matches!(err, PipelineError::EmptySelection { .. }));
}

#[test]
fn out_of_order_history_is_rejected() {
    let kenya = EntityKey::new("KEN", "Kenya");
    let mut records = entity_table(&kenya, &[1, 2, 3], &[0, 0, 0]);
    records.swap(1, 2);
    let err = derive_daily_metrics(&Table::new(records)).unwrap_err();
    match err {
        PipelineError::UnorderedHistory { date, .. } => assert_eq!(date, day(1)),
        other => panic!("expected unordered history, got {other:?}"),
    }
}

#[test]
fn deltas_never_cross_entities() {
    let kenya = EntityKey::new("KEN", "Kenya");
    let germany = EntityKey::new("DEU", "Germany");
    let mut records = entity_table(&kenya, &[10, 20], &[0, 1]);
    records.extend(entity_table(&germany, &[5_000, 5_100], &[50, 60]));
    let derived = derive_daily_metrics(&Table::new(records)).unwrap();

    let first_germany = derived.rows_for(&germany).next().unwrap();
    assert_eq!(first_germany.metrics.new_cases, None);
    assert_eq!(derived.new_case_deltas(&germany).unwrap(), vec![Some(100)]);
    assert_eq!(derived.new_death_deltas(&kenya).unwrap(), vec![Some(1)]);
    assert_eq!(derived.revisions_clamped(), 0);
}

#[test]
fn missing_cumulative_leaves_delta_undefined() {
    let kenya = EntityKey::new("KEN", "Kenya");
    let table = Table::new(vec![
        Record::new(kenya.clone(), day(0)).with_counts(Some(10), Some(1), None),
        Record::new(kenya.clone(), day(1)).with_counts(None, Some(2), None),
    ]);
    let derived = derive_daily_metrics(&table).unwrap();
    assert_eq!(derived.new_case_deltas(&kenya).unwrap(), vec![None]);
    assert_eq!(derived.new_death_deltas(&kenya).unwrap(), vec![Some(1)]);
}

#[test]
fn trailing_window_needs_full_history() {
    let kenya = EntityKey::new("KEN", "Kenya");
    let table = Table::new(entity_table(
        &kenya,
        &[0, 10, 30, 60, 100],
        &[0, 1, 2, 3, 4],
    ));
    let derived = derive_daily_metrics_with(&table, &MetricOptions { window: 3 }).unwrap();
    assert_eq!(derived.window(), 3);

    let means: Vec<Option<f64>> = derived
        .rows()
        .iter()
        .map(|row| row.metrics.new_cases_rolling_mean)
        .collect();
    assert_eq!(means, vec![None, None, None, Some(20.0), Some(30.0)]);

    let windowed = derived.rows()[3].metrics.windowed_case_fatality.unwrap();
    assert!((windowed - 0.05).abs() < 1e-12);
    let overall = derived.rows()[4].metrics.case_fatality.unwrap();
    assert!((overall - 0.04).abs() < 1e-12);
}

#[test]
fn zero_window_is_rejected() {
    let err = derive_daily_metrics_with(&Table::default(), &MetricOptions { window: 0 }).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[test]
fn per_capita_metrics_need_population() {
    let kenya = EntityKey::new("KEN", "Kenya");
    let table = Table::new(vec![Record::new(kenya, day(0)).with_counts(Some(500), Some(5), Some(100))]);
    let derived = derive_daily_metrics(&table).unwrap();
    let metrics = &derived.rows()[0].metrics;
    assert_eq!(metrics.cases_per_million, None);
    assert_eq!(metrics.vaccination_coverage, None);
    assert_eq!(metrics.case_fatality, Some(0.01));
}

#[test]
fn window_sums_that_overflow_stay_undefined() {
    let kenya = EntityKey::new("KEN", "Kenya");
    let cases: Vec<i64> = (0..10)
        .map(|idx| if idx % 2 == 0 { 0 } else { 9_000_000_000_000_000_000 })
        .collect();
    let deaths = vec![0; cases.len()];
    let derived = derive_daily_metrics(&Table::new(entity_table(&kenya, &cases, &deaths))).unwrap();

    assert_eq!(derived.len(), 10);
    assert_eq!(derived.rows()[1].metrics.new_cases, Some(9_000_000_000_000_000_000));
    assert_eq!(derived.rows()[2].metrics.new_cases, Some(0));
    assert_eq!(derived.revisions_clamped(), 4);
    for row in derived.rows() {
        assert_eq!(row.metrics.new_cases_rolling_mean, None);
        assert_eq!(row.metrics.windowed_case_fatality, None);
    }
}
