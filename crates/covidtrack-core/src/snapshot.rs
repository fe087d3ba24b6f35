use std::collections::BTreeMap;

use chrono::NaiveDate;
use covidtrack_parser::{EntityKey, Record, Table};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRow {
    pub entity_code: String,
    pub entity_name: String,
    pub continent: Option<String>,
    pub total_cases: Option<i64>,
    pub total_deaths: Option<i64>,
    pub cases_per_million: Option<f64>,
}

/// Every entity's figures on the latest date of the table, keyed for a choropleth map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub rows: Vec<SnapshotRow>,
}

/// Builds the snapshot from the latest date of `table`. Duplicate rows for an entity keep the
/// last occurrence and negative counts are treated as unreported.
pub fn latest_snapshot(table: &Table, exclude_aggregates: bool) -> Option<Snapshot> {
    let eligible = |record: &&Record| {
        record.entity.is_usable() && !(exclude_aggregates && record.entity.is_aggregate())
    };

    let date = table.records.iter().filter(eligible).map(|r| r.date).max()?;

    let mut latest: BTreeMap<&EntityKey, &Record> = BTreeMap::new();
    let mut duplicates = 0usize;
    for record in table
        .records
        .iter()
        .filter(eligible)
        .filter(|record| record.date == date)
    {
        if latest.insert(&record.entity, record).is_some() {
            duplicates += 1;
        }
    }

    let rows: Vec<SnapshotRow> = latest
        .into_values()
        .map(|record| {
            let total_cases = record.total_cases.filter(|cases| *cases >= 0);
            SnapshotRow {
                entity_code: record.entity.code.clone(),
                entity_name: record.entity.name.clone(),
                continent: record.continent.clone(),
                total_cases,
                total_deaths: record.total_deaths.filter(|deaths| *deaths >= 0),
                cases_per_million: total_cases
                    .zip(record.population.filter(|population| *population > 0))
                    .map(|(cases, population)| cases as f64 / population as f64 * 1_000_000.0),
            }
        })
        .collect();

    info!(%date, entities = rows.len(), duplicates, "Built latest snapshot");
    Some(Snapshot { date, rows })
}
