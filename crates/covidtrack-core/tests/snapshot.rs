use std::path::PathBuf;

use chrono::NaiveDate;
use covidtrack_core::{latest_snapshot, load, Table};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../covidtrack-parser/tests/data")
        .join(name)
}

#[test]
fn snapshot_uses_latest_date() {
    let table = load(fixture_path("owid_sample.csv")).unwrap();
    let snapshot = latest_snapshot(&table, true).unwrap();

    assert_eq!(snapshot.date, NaiveDate::from_ymd_opt(2021, 3, 4).unwrap());
    let codes: Vec<&str> = snapshot
        .rows
        .iter()
        .map(|row| row.entity_code.as_str())
        .collect();
    assert_eq!(codes, vec!["KEN", "NIU", "TUV"]);

    let kenya = &snapshot.rows[0];
    assert_eq!(kenya.total_cases, Some(200));
    assert_eq!(kenya.continent.as_deref(), Some("Africa"));
    let expected = 200.0 / 53_005_614.0 * 1_000_000.0;
    assert!((kenya.cases_per_million.unwrap() - expected).abs() < 1e-9);

    let tuvalu = &snapshot.rows[2];
    assert_eq!(tuvalu.total_cases, None);
    assert_eq!(tuvalu.cases_per_million, None);
}

#[test]
fn aggregates_can_be_kept() {
    let table = load(fixture_path("owid_sample.csv")).unwrap();
    let snapshot = latest_snapshot(&table, false).unwrap();
    assert_eq!(snapshot.rows.len(), 4);
    assert!(snapshot.rows.iter().any(|row| row.entity_code == "OWID_WRL"));
}

#[test]
fn empty_table_has_no_snapshot() {
    assert!(latest_snapshot(&Table::default(), true).is_none());
}

#[test]
fn duplicate_latest_rows_keep_the_last_and_drop_negatives() {
    use covidtrack_parser::{EntityKey, Record};

    let date = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap();
    let kenya = EntityKey::new("KEN", "Kenya");
    let table = Table::new(vec![
        Record::new(EntityKey::new("DEU", "Germany"), date)
            .with_counts(Some(-5), Some(-1), None)
            .with_population(Some(1_000_000)),
        Record::new(kenya.clone(), date)
            .with_counts(Some(100), Some(2), None)
            .with_population(Some(1_000_000)),
        Record::new(kenya, date)
            .with_counts(Some(120), Some(3), None)
            .with_population(Some(1_000_000)),
    ]);
    let snapshot = latest_snapshot(&table, true).unwrap();

    assert_eq!(snapshot.rows.len(), 2);
    let germany = &snapshot.rows[0];
    assert_eq!(germany.entity_code, "DEU");
    assert_eq!(germany.total_cases, None);
    assert_eq!(germany.total_deaths, None);
    assert_eq!(germany.cases_per_million, None);

    let kenya = &snapshot.rows[1];
    assert_eq!(kenya.total_cases, Some(120));
    assert_eq!(kenya.total_deaths, Some(3));
    assert!((kenya.cases_per_million.unwrap() - 120.0).abs() < 1e-9);
}
