use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Prefix Our World in Data uses for regional and income-group aggregates.
pub const AGGREGATE_CODE_PREFIX: &str = "OWID_";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub code: String,
    pub name: String,
}

impl EntityKey {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into().trim().to_string(),
            name: name.into().trim().to_string(),
        }
    }

    /// An entity needs at least one non-blank identifier to be addressable.
    pub fn is_usable(&self) -> bool {
        !self.code.trim().is_empty() || !self.name.trim().is_empty()
    }

    pub fn is_aggregate(&self) -> bool {
        self.code.starts_with(AGGREGATE_CODE_PREFIX)
    }

    pub fn matches(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();
        !identifier.is_empty() && (self.code == identifier || self.name == identifier)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code.is_empty(), self.name.is_empty()) {
            (false, false) => write!(f, "{} ({})", self.name, self.code),
            (true, _) => f.write_str(&self.name),
            (false, true) => f.write_str(&self.code),
        }
    }
}

/// Which cumulative cells of a record were imputed rather than reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillFlags {
    pub total_cases: bool,
    pub total_deaths: bool,
    pub total_vaccinations: bool,
}

impl FillFlags {
    pub fn any(&self) -> bool {
        self.total_cases || self.total_deaths || self.total_vaccinations
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub entity: EntityKey,
    pub continent: Option<String>,
    pub date: NaiveDate,
    pub total_cases: Option<i64>,
    pub total_deaths: Option<i64>,
    pub total_vaccinations: Option<i64>,
    pub population: Option<i64>,
    pub filled: FillFlags,
}

impl Record {
    pub fn new(entity: EntityKey, date: NaiveDate) -> Self {
        Self {
            entity,
            continent: None,
            date,
            total_cases: None,
            total_deaths: None,
            total_vaccinations: None,
            population: None,
            filled: FillFlags::default(),
        }
    }

    pub fn with_counts(
        mut self,
        total_cases: Option<i64>,
        total_deaths: Option<i64>,
        total_vaccinations: Option<i64>,
    ) -> Self {
        self.total_cases = total_cases;
        self.total_deaths = total_deaths;
        self.total_vaccinations = total_vaccinations;
        self
    }

    pub fn with_population(mut self, population: Option<i64>) -> Self {
        self.population = population;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub location: String,
    pub content_hash: String,
    pub row_count: usize,
}

/// An in-memory table of per-entity, per-date records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub records: Vec<Record>,
    pub source: Option<SourceInfo>,
}

impl Table {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            source: None,
        }
    }

    pub fn with_records(&self, records: Vec<Record>) -> Self {
        Self {
            records,
            source: self.source.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Distinct entities in order of first appearance.
    pub fn entities(&self) -> Vec<&EntityKey> {
        let mut seen = std::collections::HashSet::new();
        self.records
            .iter()
            .map(|record| &record.entity)
            .filter(|entity| seen.insert(*entity))
            .collect()
    }

    pub fn rows_for<'a>(&'a self, entity: &'a EntityKey) -> impl Iterator<Item = &'a Record> + 'a {
        self.records
            .iter()
            .filter(move |record| &record.entity == entity)
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|record| record.date).max()
    }

    pub fn earliest_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|record| record.date).min()
    }
}
