use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};

use crate::errors::{ParserError, SourceAttempt};
use crate::model::{EntityKey, Record, SourceInfo, Table};
use crate::schema::ColumnMap;

/// Reads a delimited file from disk into a [`Table`].
pub fn load_table(path: impl AsRef<Path>) -> Result<Table, ParserError> {
    let path = path.as_ref();
    let location = path.display().to_string();
    let bytes = fs::read(path).map_err(|err| ParserError::SourceUnavailable {
        location: location.clone(),
        reason: err.to_string(),
    })?;
    parse_bytes(&bytes, &location)
}

/// Tries each candidate in order and returns the first table that loads.
///
/// A schema mismatch on a located source ends the search: the data is there but does not
/// honour the column contract, so falling back would hide the problem.
pub fn load_first_available<P: AsRef<Path>>(candidates: &[P]) -> Result<Table, ParserError> {
    let mut attempts = Vec::new();

    for candidate in candidates {
        match load_table(candidate) {
            Ok(table) => return Ok(table),
            Err(err) if err.is_schema_mismatch() => return Err(err),
            Err(err) => {
                attempts.push(SourceAttempt::new(
                    candidate.as_ref().display().to_string(),
                    err.to_string(),
                ));
            }
        }
    }

    Err(ParserError::NoAvailableSource { attempts })
}

pub fn parse_bytes(bytes: &[u8], location: &str) -> Result<Table, ParserError> {
    let content = std::str::from_utf8(bytes).map_err(|err| ParserError::SourceUnavailable {
        location: location.to_string(),
        reason: format!("source is not valid UTF-8: {err}"),
    })?;
    parse_str(content, location)
}

pub fn parse_str(content: &str, location: &str) -> Result<Table, ParserError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|source| ParserError::Csv {
            location: location.to_string(),
            source,
        })?
        .clone();
    if headers.is_empty() {
        return Err(ParserError::SourceUnavailable {
            location: location.to_string(),
            reason: "source has no header row".to_string(),
        });
    }
    let columns = ColumnMap::resolve(location, &headers)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|source| ParserError::Csv {
            location: location.to_string(),
            source,
        })?;
        let line_index = row.position().map(|pos| pos.line() as usize).unwrap_or(0);
        records.push(parse_row(&row, &columns, location, line_index)?);
    }

    let row_count = records.len();
    Ok(Table {
        records,
        source: Some(SourceInfo {
            location: location.to_string(),
            content_hash: blake3::hash(content.as_bytes()).to_hex().to_string(),
            row_count,
        }),
    })
}

fn parse_row(
    row: &StringRecord,
    columns: &ColumnMap,
    location: &str,
    line_index: usize,
) -> Result<Record, ParserError> {
    let field = |idx: usize| row.get(idx).unwrap_or("");
    let count = |idx: usize, column: &str| {
        parse_optional_count(field(idx), location, line_index, column)
    };

    let entity = EntityKey::new(field(columns.entity_code), field(columns.entity_name));
    let date = parse_date(field(columns.date), location, line_index)?;

    Ok(Record {
        entity,
        continent: columns
            .continent
            .map(field)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string),
        date,
        total_cases: count(columns.total_cases, "total_cases")?,
        total_deaths: count(columns.total_deaths, "total_deaths")?,
        total_vaccinations: count(columns.total_vaccinations, "total_vaccinations")?,
        population: count(columns.population, "population")?,
        filled: Default::default(),
    })
}

pub(crate) fn parse_date(
    value: &str,
    location: &str,
    line_index: usize,
) -> Result<NaiveDate, ParserError> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    static DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt.date());
        }
    }
    Err(ParserError::MalformedRow {
        location: location.to_string(),
        line_index,
        message: format!("invalid date '{trimmed}'"),
    })
}

/// Counts arrive as integers or float renderings ("100.0", "1.5e6"); both round to i64.
pub(crate) fn parse_optional_count(
    value: &str,
    location: &str,
    line_index: usize,
    column: &str,
) -> Result<Option<i64>, ParserError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Ok(Some(parsed));
    }

    match trimmed.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed.abs() < i64::MAX as f64 => {
            Ok(Some(parsed.round() as i64))
        }
        Ok(parsed) => Err(ParserError::MalformedRow {
            location: location.to_string(),
            line_index,
            message: format!("column '{column}' value {parsed} is out of range"),
        }),
        Err(err) => Err(ParserError::MalformedRow {
            location: location.to_string(),
            line_index,
            message: format!("failed to parse column '{column}' as a count: {err}"),
        }),
    }
}
