//! Country, redenomination and equity tables.
//!
//! Any undecodable row aborts the whole run: a silently dropped redenomination
//! would shift every later price of that country by orders of magnitude.

use crate::core::error::BuildError;
use crate::core::model::{Country, Equity, RedenominationEvent, parse_date};
use crate::core::redenomination::Redenominations;
use crate::source::DataSource;
use anyhow::Result;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const COUNTRIES_FILE: &str = "countries.csv";
pub const REDENOMINATIONS_FILE: &str = "redenominations.csv";
pub const STOCKS_FILE: &str = "stocks.csv";

#[derive(Debug, Deserialize)]
struct CountryRow {
    country_code: String,
    country_name: String,
    currency_code: String,
}

#[derive(Debug, Deserialize)]
struct RedenominationRow {
    date: String,
    country_code: String,
    new_currency_code: String,
    from_amount: f64,
    to_amount: f64,
}

#[derive(Debug, Deserialize)]
struct EquityRow {
    symbol: String,
    name: String,
    filename: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub countries: BTreeMap<String, Country>,
    pub redenominations: Redenominations,
    pub equities: Vec<Equity>,
}

pub async fn load(source: &dyn DataSource, excluded: &[String]) -> Result<ReferenceData> {
    let (countries, redenominations, stocks) = futures::try_join!(
        source.read(COUNTRIES_FILE),
        source.read(REDENOMINATIONS_FILE),
        source.read(STOCKS_FILE)
    )?;

    let countries = countries.ok_or_else(|| {
        BuildError::Configuration(format!("{COUNTRIES_FILE} not found in data directory"))
    })?;
    let countries = parse_countries(&countries, excluded)?;

    let redenominations = match redenominations {
        Some(content) => parse_redenominations(&content, excluded)?,
        None => {
            warn!("{REDENOMINATIONS_FILE} not found, assuming no redenominations");
            Vec::new()
        }
    };

    let equities = match stocks {
        Some(content) => parse_equities(&content)?,
        None => {
            debug!("{STOCKS_FILE} not found, no equity stores");
            Vec::new()
        }
    };

    info!(
        "Loaded {} countries, {} redenominations, {} equities",
        countries.len(),
        redenominations.len(),
        equities.len()
    );

    Ok(ReferenceData {
        countries,
        redenominations: Redenominations::new(redenominations),
        equities,
    })
}

fn read_rows<T: DeserializeOwned>(file: &str, content: &str) -> Result<Vec<T>, BuildError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    reader
        .deserialize::<T>()
        .enumerate()
        .map(|(i, row)| row.map_err(|e| BuildError::malformed(file, format!("row {}: {e}", i + 1))))
        .collect()
}

fn required(file: &str, row: usize, column: &str, value: String) -> Result<String, BuildError> {
    if value.is_empty() {
        return Err(BuildError::malformed(
            file,
            format!("row {row}: empty {column}"),
        ));
    }
    Ok(value)
}

pub fn parse_countries(
    content: &str,
    excluded: &[String],
) -> Result<BTreeMap<String, Country>, BuildError> {
    let mut countries = BTreeMap::new();
    for (i, row) in read_rows::<CountryRow>(COUNTRIES_FILE, content)?
        .into_iter()
        .enumerate()
    {
        let code = required(COUNTRIES_FILE, i + 1, "country_code", row.country_code)?;
        let currency_code = required(COUNTRIES_FILE, i + 1, "currency_code", row.currency_code)?;
        if excluded.iter().any(|e| e.eq_ignore_ascii_case(&code)) {
            debug!("Skipping excluded country {}", code);
            continue;
        }
        let country = Country {
            code: code.clone(),
            name: row.country_name,
            currency_code: currency_code.to_uppercase(),
        };
        if countries.insert(code.clone(), country).is_some() {
            warn!("Duplicate country {} in {}, keeping the last row", code, COUNTRIES_FILE);
        }
    }
    Ok(countries)
}

pub fn parse_redenominations(
    content: &str,
    excluded: &[String],
) -> Result<Vec<RedenominationEvent>, BuildError> {
    let mut events = Vec::new();
    for (i, row) in read_rows::<RedenominationRow>(REDENOMINATIONS_FILE, content)?
        .into_iter()
        .enumerate()
    {
        let row_no = i + 1;
        let effective = parse_date(&row.date).ok_or_else(|| {
            BuildError::malformed(
                REDENOMINATIONS_FILE,
                format!("row {row_no}: invalid date '{}'", row.date),
            )
        })?;
        if !(row.from_amount > 0.0 && row.to_amount > 0.0) {
            return Err(BuildError::malformed(
                REDENOMINATIONS_FILE,
                format!("row {row_no}: amounts must be positive"),
            ));
        }
        let country_code =
            required(REDENOMINATIONS_FILE, row_no, "country_code", row.country_code)?;
        let new_currency_code = required(
            REDENOMINATIONS_FILE,
            row_no,
            "new_currency_code",
            row.new_currency_code,
        )?;
        if excluded.iter().any(|e| e.eq_ignore_ascii_case(&country_code)) {
            continue;
        }
        events.push(RedenominationEvent {
            country_code,
            effective,
            new_currency_code: new_currency_code.to_uppercase(),
            from_amount: row.from_amount,
            to_amount: row.to_amount,
        });
    }
    Ok(events)
}

pub fn parse_equities(content: &str) -> Result<Vec<Equity>, BuildError> {
    read_rows::<EquityRow>(STOCKS_FILE, content)?
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            Ok(Equity {
                symbol: required(STOCKS_FILE, i + 1, "symbol", row.symbol)?,
                name: row.name,
                filename: required(STOCKS_FILE, i + 1, "filename", row.filename)?,
            })
        })
        .collect()
}
