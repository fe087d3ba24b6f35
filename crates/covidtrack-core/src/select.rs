use covidtrack_parser::{Record, Table};
use tracing::{info, warn};

use crate::config::DateRange;
use crate::error::{PipelineError, Result};

/// Keeps the rows of entities whose code or name matches one of `identifiers`.
pub fn select_entities<I, S>(table: &Table, identifiers: I) -> Result<Table>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let requested: Vec<String> = identifiers
        .into_iter()
        .map(|identifier| identifier.as_ref().trim().to_string())
        .filter(|identifier| !identifier.is_empty())
        .collect();

    for identifier in &requested {
        if !table
            .records
            .iter()
            .any(|record| record.entity.matches(identifier))
        {
            warn!(identifier = %identifier, "requested entity not present in table");
        }
    }

    let records: Vec<Record> = table
        .records
        .iter()
        .filter(|record| {
            requested
                .iter()
                .any(|identifier| record.entity.matches(identifier))
        })
        .cloned()
        .collect();

    if records.is_empty() {
        return Err(PipelineError::EmptySelection { requested });
    }

    info!(
        requested = requested.len(),
        rows = records.len(),
        "Selected entities"
    );
    Ok(table.with_records(records))
}

pub fn filter_date_range(table: &Table, range: &DateRange) -> Result<Table> {
    range.validate()?;
    let records: Vec<Record> = table
        .records
        .iter()
        .filter(|record| range.contains(record.date))
        .cloned()
        .collect();
    info!(
        start = %range.start,
        end = %range.end,
        kept = records.len(),
        dropped = table.len() - records.len(),
        "Applied date range"
    );
    Ok(table.with_records(records))
}

/// Drops regional and income-group aggregates such as `OWID_WRL`.
pub fn exclude_aggregates(table: &Table) -> Table {
    table.with_records(
        table
            .records
            .iter()
            .filter(|record| !record.entity.is_aggregate())
            .cloned()
            .collect(),
    )
}
