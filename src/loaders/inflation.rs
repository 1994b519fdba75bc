//! Monthly inflation index series (CPI or broad money), one JSON file per country.
use crate::core::error::BuildError;
use crate::core::model::{Country, InflationKind, InflationPoint, InflationSeries, parse_year_month};
use crate::source::DataSource;
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use futures::future::try_join_all;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Values arrive as numbers, numeric strings (IMF `@OBS_VALUE`) or null.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(f64),
    Text(String),
}

/// Which months of a series are kept.
#[derive(Debug, Clone)]
pub struct SeriesFilter {
    pub start_year: i32,
    pub warmup: HashSet<NaiveDate>,
}

impl SeriesFilter {
    pub fn new(start_year: i32, warmup: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            start_year,
            warmup: warmup.into_iter().collect(),
        }
    }

    fn keeps(&self, month: NaiveDate) -> bool {
        month.year() >= self.start_year && !self.warmup.contains(&month)
    }
}

pub fn series_path(kind: InflationKind, country_code: &str) -> String {
    format!("_collected/{}/{}.json", kind.dir_name(), country_code)
}

/// Parses and filters one country's series. `None` when nothing usable remains.
pub fn parse_series(
    country_code: &str,
    kind: InflationKind,
    content: &str,
    filter: &SeriesFilter,
) -> Result<Option<InflationSeries>, BuildError> {
    let file = series_path(kind, country_code);
    let raw: Vec<(String, Option<RawValue>)> = serde_json::from_str(content)
        .map_err(|e| BuildError::malformed(&file, e.to_string()))?;

    let mut points = Vec::with_capacity(raw.len());
    for (month_str, value) in raw {
        let month = parse_year_month(&month_str).ok_or_else(|| {
            BuildError::malformed(&file, format!("invalid month '{month_str}'"))
        })?;
        if !filter.keeps(month) {
            continue;
        }
        let value = match value {
            None => None,
            Some(RawValue::Number(n)) => Some(n),
            Some(RawValue::Text(text)) if text.trim().is_empty() => None,
            Some(RawValue::Text(text)) => Some(
                text.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| {
                        BuildError::malformed(
                            &file,
                            format!("invalid value '{text}' for {month_str}"),
                        )
                    })?,
            ),
        };
        points.push(InflationPoint { month, value });
    }

    // Input is expected sorted, but the leading trim needs chronological order.
    // Zero counts as empty, so a series never starts without a measured value.
    points.sort_by_key(|point| point.month);
    let Some(first_measured) = points
        .iter()
        .position(|point| point.value.is_some_and(|value| value != 0.0))
    else {
        debug!("{} {} series has no values after filtering", country_code, kind);
        return Ok(None);
    };
    points.drain(..first_measured);

    Ok(Some(InflationSeries {
        country_code: country_code.to_string(),
        kind,
        points,
    }))
}

/// Loads every country's series of `kind`, reading files concurrently.
pub async fn load_all(
    source: &dyn DataSource,
    kind: InflationKind,
    countries: &BTreeMap<String, Country>,
    filter: &SeriesFilter,
) -> Result<BTreeMap<String, InflationSeries>> {
    let reads = countries.keys().map(|code| async move {
        let content = source.read(&series_path(kind, code)).await?;
        Ok::<_, anyhow::Error>((code, content))
    });
    let contents = try_join_all(reads).await?;

    let mut all_series = BTreeMap::new();
    for (code, content) in contents {
        let Some(content) = content else {
            debug!("No {} data for {}", kind, code);
            continue;
        };
        if let Some(series) = parse_series(code, kind, &content, filter)? {
            all_series.insert(code.clone(), series);
        }
    }
    info!(
        "Loaded {} series for {} of {} countries",
        kind,
        all_series.len(),
        countries.len()
    );
    Ok(all_series)
}
