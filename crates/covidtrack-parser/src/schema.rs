use csv::StringRecord;

use crate::errors::ParserError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    EntityCode,
    EntityName,
    Date,
    TotalCases,
    TotalDeaths,
    TotalVaccinations,
    Population,
    Continent,
}

impl ColumnRole {
    pub const REQUIRED: [ColumnRole; 7] = [
        ColumnRole::EntityCode,
        ColumnRole::EntityName,
        ColumnRole::Date,
        ColumnRole::TotalCases,
        ColumnRole::TotalDeaths,
        ColumnRole::TotalVaccinations,
        ColumnRole::Population,
    ];

    pub fn canonical_name(&self) -> &'static str {
        match self {
            ColumnRole::EntityCode => "iso_code",
            ColumnRole::EntityName => "location",
            ColumnRole::Date => "date",
            ColumnRole::TotalCases => "total_cases",
            ColumnRole::TotalDeaths => "total_deaths",
            ColumnRole::TotalVaccinations => "total_vaccinations",
            ColumnRole::Population => "population",
            ColumnRole::Continent => "continent",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            ColumnRole::EntityCode => &["iso_code", "code", "entity_code"],
            ColumnRole::EntityName => &["location", "entity", "entity_name", "country", "name"],
            ColumnRole::Date => &["date"],
            ColumnRole::TotalCases => &["total_cases", "cases"],
            ColumnRole::TotalDeaths => &["total_deaths", "deaths"],
            ColumnRole::TotalVaccinations => &["total_vaccinations", "vaccinations"],
            ColumnRole::Population => &["population"],
            ColumnRole::Continent => &["continent"],
        }
    }

    fn classify(header: &str) -> Option<ColumnRole> {
        let trimmed = header.trim().trim_start_matches('\u{feff}');
        [
            ColumnRole::EntityCode,
            ColumnRole::EntityName,
            ColumnRole::Date,
            ColumnRole::TotalCases,
            ColumnRole::TotalDeaths,
            ColumnRole::TotalVaccinations,
            ColumnRole::Population,
            ColumnRole::Continent,
        ]
        .into_iter()
        .find(|role| {
            role.aliases()
                .iter()
                .any(|alias| trimmed.eq_ignore_ascii_case(alias))
        })
    }
}

/// Field positions of every logical column, resolved once from the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub entity_code: usize,
    pub entity_name: usize,
    pub date: usize,
    pub total_cases: usize,
    pub total_deaths: usize,
    pub total_vaccinations: usize,
    pub population: usize,
    pub continent: Option<usize>,
}

impl ColumnMap {
    pub fn resolve(location: &str, headers: &StringRecord) -> Result<Self, ParserError> {
        let mut found: Vec<(ColumnRole, usize)> = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            if let Some(role) = ColumnRole::classify(header) {
                if !found.iter().any(|(existing, _)| *existing == role) {
                    found.push((role, idx));
                }
            }
        }

        let position = |role: ColumnRole| {
            found
                .iter()
                .find(|(candidate, _)| *candidate == role)
                .map(|(_, idx)| *idx)
        };

        let missing: Vec<&'static str> = ColumnRole::REQUIRED
            .iter()
            .filter(|role| position(**role).is_none())
            .map(|role| role.canonical_name())
            .collect();

        match (
            position(ColumnRole::EntityCode),
            position(ColumnRole::EntityName),
            position(ColumnRole::Date),
            position(ColumnRole::TotalCases),
            position(ColumnRole::TotalDeaths),
            position(ColumnRole::TotalVaccinations),
            position(ColumnRole::Population),
        ) {
            (
                Some(entity_code),
                Some(entity_name),
                Some(date),
                Some(total_cases),
                Some(total_deaths),
                Some(total_vaccinations),
                Some(population),
            ) => Ok(Self {
                entity_code,
                entity_name,
                date,
                total_cases,
                total_deaths,
                total_vaccinations,
                population,
                continent: position(ColumnRole::Continent),
            }),
            _ => Err(ParserError::SchemaMismatch {
                location: location.to_string(),
                missing,
            }),
        }
    }
}
