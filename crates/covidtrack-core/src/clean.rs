use covidtrack_parser::{Record, Table};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanOptions {
    /// Drop rows that report neither cumulative cases nor cumulative deaths.
    pub drop_rows_without_counts: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            drop_rows_without_counts: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanSummary {
    pub input_rows: usize,
    pub output_rows: usize,
    pub unusable_entity_rows: usize,
    pub rows_without_counts: usize,
    pub duplicate_rows: usize,
    pub negative_values_discarded: usize,
    pub cells_forward_filled: usize,
    pub cells_defaulted: usize,
    pub entities_without_population: usize,
}

pub fn clean(table: &Table) -> Table {
    clean_with(table, &CleanOptions::default())
}

pub fn clean_with(table: &Table, options: &CleanOptions) -> Table {
    clean_with_summary(table, options).0
}

/// Normalises a table into per-entity, strictly date-ordered series with every cumulative
/// cell populated. Imputed cells are recorded in each record's `filled` flags.
pub fn clean_with_summary(table: &Table, options: &CleanOptions) -> (Table, CleanSummary) {
    let mut summary = CleanSummary {
        input_rows: table.len(),
        ..CleanSummary::default()
    };

    let mut rows: Vec<(usize, Record)> = Vec::with_capacity(table.len());
    for (idx, record) in table.records.iter().enumerate() {
        if !record.entity.is_usable() {
            summary.unusable_entity_rows += 1;
            continue;
        }

        if options.drop_rows_without_counts
            && record.total_cases.is_none()
            && record.total_deaths.is_none()
        {
            summary.rows_without_counts += 1;
            continue;
        }

        let mut record = record.clone();
        for value in [
            &mut record.total_cases,
            &mut record.total_deaths,
            &mut record.total_vaccinations,
        ] {
            if value.is_some_and(|count| count < 0) {
                *value = None;
                summary.negative_values_discarded += 1;
            }
        }
        if record.population.is_some_and(|population| population <= 0) {
            record.population = None;
        }

        rows.push((idx, record));
    }

    // Source position breaks ties so the last duplicate wins below.
    rows.sort_by(|(idx_a, a), (idx_b, b)| {
        a.entity
            .cmp(&b.entity)
            .then(a.date.cmp(&b.date))
            .then(idx_a.cmp(idx_b))
    });

    let mut cleaned: Vec<Record> = Vec::with_capacity(rows.len());
    for (_, record) in rows {
        if let Some(last) = cleaned.last_mut() {
            if last.entity == record.entity && last.date == record.date {
                *last = record;
                summary.duplicate_rows += 1;
                continue;
            }
        }
        cleaned.push(record);
    }

    for group in cleaned.chunk_by_mut(|a, b| a.entity == b.entity) {
        fill_entity(group, &mut summary);
    }

    summary.output_rows = cleaned.len();
    info!(
        input_rows = summary.input_rows,
        output_rows = summary.output_rows,
        unusable_entity_rows = summary.unusable_entity_rows,
        rows_without_counts = summary.rows_without_counts,
        duplicate_rows = summary.duplicate_rows,
        forward_filled = summary.cells_forward_filled,
        defaulted = summary.cells_defaulted,
        "Cleaned table"
    );

    (table.with_records(cleaned), summary)
}

fn fill_entity(rows: &mut [Record], summary: &mut CleanSummary) {
    let mut last_cases = None;
    let mut last_deaths = None;
    let mut last_vaccinations = None;

    for record in rows.iter_mut() {
        fill_cell(
            &mut record.total_cases,
            &mut last_cases,
            &mut record.filled.total_cases,
            summary,
        );
        fill_cell(
            &mut record.total_deaths,
            &mut last_deaths,
            &mut record.filled.total_deaths,
            summary,
        );
        fill_cell(
            &mut record.total_vaccinations,
            &mut last_vaccinations,
            &mut record.filled.total_vaccinations,
            summary,
        );
    }

    // Population is a per-entity constant; the latest positive report wins.
    let population = rows
        .iter()
        .rev()
        .find_map(|record| record.population.filter(|value| *value > 0));
    if population.is_none() {
        if let Some(first) = rows.first() {
            debug!(entity = %first.entity, "entity reports no population");
        }
        summary.entities_without_population += 1;
    }
    for record in rows.iter_mut() {
        record.population = population;
    }
}

fn fill_cell(
    value: &mut Option<i64>,
    last: &mut Option<i64>,
    flag: &mut bool,
    summary: &mut CleanSummary,
) {
    match (*value, *last) {
        (Some(current), _) => *last = Some(current),
        (None, Some(previous)) => {
            *value = Some(previous);
            *flag = true;
            summary.cells_forward_filled += 1;
        }
        (None, None) => {
            *value = Some(0);
            *last = Some(0);
            *flag = true;
            summary.cells_defaulted += 1;
        }
    }
}
