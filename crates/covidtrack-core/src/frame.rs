use chrono::{Datelike, NaiveDate};
use polars::prelude::{Column, DataFrame, DataType, NamedFrom, PolarsResult, Series};

use crate::metrics::DerivedTable;

/// Days from 0001-01-01 (CE) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub(crate) fn date_series(name: &str, dates: &[NaiveDate]) -> PolarsResult<Series> {
    let days: Vec<i32> = dates
        .iter()
        .map(|date| date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
        .collect();
    Series::new(name.into(), days).cast(&DataType::Date)
}

/// Materialises the cleaned and derived table as a DataFrame with one row per record.
pub fn derived_to_dataframe(table: &DerivedTable) -> PolarsResult<DataFrame> {
    let rows = table.rows();
    let len = rows.len();

    let mut codes = Vec::with_capacity(len);
    let mut names = Vec::with_capacity(len);
    let mut continents: Vec<Option<&str>> = Vec::with_capacity(len);
    let mut dates = Vec::with_capacity(len);
    let mut total_cases = Vec::with_capacity(len);
    let mut total_deaths = Vec::with_capacity(len);
    let mut total_vaccinations = Vec::with_capacity(len);
    let mut population = Vec::with_capacity(len);
    let mut cases_filled = Vec::with_capacity(len);
    let mut deaths_filled = Vec::with_capacity(len);
    let mut vaccinations_filled = Vec::with_capacity(len);
    let mut new_cases = Vec::with_capacity(len);
    let mut new_deaths = Vec::with_capacity(len);
    let mut coverage = Vec::with_capacity(len);
    let mut case_fatality = Vec::with_capacity(len);
    let mut windowed_case_fatality = Vec::with_capacity(len);
    let mut rolling_mean = Vec::with_capacity(len);
    let mut per_million = Vec::with_capacity(len);
    let mut per_hundred = Vec::with_capacity(len);

    for row in rows {
        let record = &row.record;
        let metrics = &row.metrics;
        codes.push(record.entity.code.as_str());
        names.push(record.entity.name.as_str());
        continents.push(record.continent.as_deref());
        dates.push(record.date);
        total_cases.push(record.total_cases);
        total_deaths.push(record.total_deaths);
        total_vaccinations.push(record.total_vaccinations);
        population.push(record.population);
        cases_filled.push(record.filled.total_cases);
        deaths_filled.push(record.filled.total_deaths);
        vaccinations_filled.push(record.filled.total_vaccinations);
        new_cases.push(metrics.new_cases);
        new_deaths.push(metrics.new_deaths);
        coverage.push(metrics.vaccination_coverage);
        case_fatality.push(metrics.case_fatality);
        windowed_case_fatality.push(metrics.windowed_case_fatality);
        rolling_mean.push(metrics.new_cases_rolling_mean);
        per_million.push(metrics.cases_per_million);
        per_hundred.push(metrics.vaccinations_per_hundred);
    }

    let columns: Vec<Column> = vec![
        Series::new("entity_code".into(), codes).into(),
        Series::new("entity_name".into(), names).into(),
        Series::new("continent".into(), continents).into(),
        date_series("date", &dates)?.into(),
        Series::new("total_cases".into(), total_cases).into(),
        Series::new("total_deaths".into(), total_deaths).into(),
        Series::new("total_vaccinations".into(), total_vaccinations).into(),
        Series::new("population".into(), population).into(),
        Series::new("total_cases_filled".into(), cases_filled).into(),
        Series::new("total_deaths_filled".into(), deaths_filled).into(),
        Series::new("total_vaccinations_filled".into(), vaccinations_filled).into(),
        Series::new("new_cases".into(), new_cases).into(),
        Series::new("new_deaths".into(), new_deaths).into(),
        Series::new("vaccination_coverage".into(), coverage).into(),
        Series::new("case_fatality".into(), case_fatality).into(),
        Series::new("windowed_case_fatality".into(), windowed_case_fatality).into(),
        Series::new("new_cases_rolling_mean".into(), rolling_mean).into(),
        Series::new("cases_per_million".into(), per_million).into(),
        Series::new("vaccinations_per_hundred".into(), per_hundred).into(),
    ];

    DataFrame::new(columns)
}
