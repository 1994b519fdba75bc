//! USD exchange-rate snapshots and equity price series.
use crate::core::error::BuildError;
use crate::core::market::{ExchangeRates, MarketData, StorePrices};
use crate::core::model::{Equity, parse_date, parse_year_month};
use crate::source::DataSource;
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use futures::future::try_join_all;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub const RATES_DIR: &str = "_collected/usd-rates";
pub const STOCKS_DIR: &str = "_collected/stocks";
pub const LATEST_FILE: &str = "latest.json";

#[derive(Debug, Deserialize)]
struct LatestSnapshot {
    date: String,
    rates: HashMap<String, f64>,
}

enum Snapshot {
    Monthly(NaiveDate, HashMap<String, f64>),
    Latest(NaiveDate, HashMap<String, f64>),
}

fn rate_path(name: &str) -> String {
    format!("{RATES_DIR}/{name}")
}

fn stock_path(filename: &str) -> String {
    format!("{STOCKS_DIR}/{filename}.json")
}

/// Drops non-positive rates so no conversion ever divides by zero.
fn positive_rates(file: &str, rates: HashMap<String, f64>) -> HashMap<String, f64> {
    rates
        .into_iter()
        .filter(|(code, rate)| {
            let keep = *rate > 0.0;
            if !keep {
                debug!("Ignoring non-positive {} rate {} in {}", code, rate, file);
            }
            keep
        })
        .collect()
}

fn parse_snapshot(
    name: &str,
    content: &str,
    start_year: i32,
) -> Result<Option<Snapshot>, BuildError> {
    let file = rate_path(name);
    if name == LATEST_FILE {
        let latest: LatestSnapshot =
            serde_json::from_str(content).map_err(|e| BuildError::malformed(&file, e.to_string()))?;
        let date = parse_date(&latest.date).ok_or_else(|| {
            BuildError::malformed(&file, format!("invalid date '{}'", latest.date))
        })?;
        return Ok(Some(Snapshot::Latest(date, positive_rates(&file, latest.rates))));
    }

    let Some(month) = name.strip_suffix(".json").and_then(parse_year_month) else {
        debug!("Ignoring unrecognised rate file {}", file);
        return Ok(None);
    };
    if month.year() < start_year {
        debug!("Discarding {} snapshot before {}", month, start_year);
        return Ok(None);
    }
    let rates: HashMap<String, f64> =
        serde_json::from_str(content).map_err(|e| BuildError::malformed(&file, e.to_string()))?;
    Ok(Some(Snapshot::Monthly(month, positive_rates(&file, rates))))
}

pub async fn load_rates(source: &dyn DataSource, start_year: i32) -> Result<ExchangeRates> {
    let names = source.list(RATES_DIR).await?;
    let reads = names.iter().map(|name| async move {
        let content = source.read(&rate_path(name)).await?;
        Ok::<_, anyhow::Error>((name, content))
    });
    let contents = try_join_all(reads).await?;

    let mut rates = ExchangeRates::new();
    let mut latest = None;
    for (name, content) in contents {
        let Some(content) = content else { continue };
        match parse_snapshot(name, &content, start_year)? {
            Some(Snapshot::Monthly(date, snapshot)) => rates.insert_snapshot(date, &snapshot),
            Some(Snapshot::Latest(date, snapshot)) => latest = Some((date, snapshot)),
            None => {}
        }
    }

    // Applied last so the daily snapshot wins over a monthly one on the same date.
    match latest {
        Some((date, snapshot)) => {
            rates.insert_snapshot(date, &snapshot);
            rates.set_as_of(date);
        }
        None if !rates.is_empty() => {
            warn!("{LATEST_FILE} not found, estimates end at the newest monthly snapshot");
        }
        None => {}
    }

    if rates.is_empty() {
        return Err(BuildError::Configuration(format!(
            "no exchange-rate snapshots in {RATES_DIR}"
        ))
        .into());
    }
    info!(
        "Loaded {} rate snapshots, as of {}",
        rates.snapshot_count(),
        rates
            .as_of()
            .map_or_else(|| "unknown".to_string(), |d| d.to_string())
    );
    Ok(rates)
}

pub fn parse_stock_series(
    filename: &str,
    content: &str,
) -> Result<Vec<(NaiveDate, f64)>, BuildError> {
    let file = stock_path(filename);
    let raw: Vec<(String, Option<f64>)> =
        serde_json::from_str(content).map_err(|e| BuildError::malformed(&file, e.to_string()))?;
    let mut prices = Vec::with_capacity(raw.len());
    for (date_str, price) in raw {
        let date = parse_date(&date_str)
            .ok_or_else(|| BuildError::malformed(&file, format!("invalid date '{date_str}'")))?;
        match price {
            Some(price) if price > 0.0 => prices.push((date, price)),
            _ => debug!("Skipping empty {} price on {}", filename, date),
        }
    }
    Ok(prices)
}

pub async fn load_store_prices(
    source: &dyn DataSource,
    equities: &[Equity],
) -> Result<StorePrices> {
    let reads = equities.iter().map(|equity| async move {
        let content = source.read(&stock_path(&equity.filename)).await?;
        Ok::<_, anyhow::Error>((equity, content))
    });
    let contents = try_join_all(reads).await?;

    let mut prices = StorePrices::new();
    for (equity, content) in contents {
        let Some(content) = content else {
            warn!(
                "No price series for {} ({}), dropping it",
                equity.symbol, equity.filename
            );
            continue;
        };
        for (date, price) in parse_stock_series(&equity.filename, &content)? {
            prices.insert(&equity.symbol, date, price);
        }
    }
    Ok(prices)
}

/// Loads rates and equity prices together; both must finish before pricing starts.
pub async fn load(
    source: &dyn DataSource,
    start_year: i32,
    equities: &[Equity],
) -> Result<MarketData> {
    let (rates, prices) = futures::try_join!(
        load_rates(source, start_year),
        load_store_prices(source, equities)
    )?;
    Ok(MarketData { rates, prices })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_load_rates_with_latest() {
        let source = MemorySource::new();
        source
            .insert("_collected/usd-rates/2012-12.json", r#"{"AAA": 1.5}"#)
            .await;
        source
            .insert("_collected/usd-rates/2013-04.json", r#"{"AAA": 2.0, "BTC": 0.01, "ZZZ": 0}"#)
            .await;
        source
            .insert(
                "_collected/usd-rates/latest.json",
                r#"{"date": "2013-04-10", "rates": {"AAA": 2.2}}"#,
            )
            .await;
        source.insert("_collected/usd-rates/README.md", "notes").await;

        let rates = load_rates(&source, 2013).await.unwrap();
        assert_eq!(rates.as_of(), Some(date(2013, 4, 10)));
        assert_eq!(rates.rate_on("AAA", date(2013, 4, 1)), Some(2.0));
        assert_eq!(rates.rate_on("AAA", date(2013, 4, 10)), Some(2.2));
        assert_eq!(rates.rate_on("BTC", date(2013, 4, 1)), Some(0.01));
        assert_eq!(rates.rate_on("ZZZ", date(2013, 4, 1)), None);
        // The 2012 snapshot is before the start year.
        assert_eq!(rates.rate_as_of("AAA", date(2013, 3, 31)), None);
        assert_eq!(rates.snapshot_count(), 2);
    }

    #[tokio::test]
    async fn test_load_rates_without_latest_uses_newest_month() {
        let source = MemorySource::new();
        source
            .insert("_collected/usd-rates/2013-04.json", r#"{"AAA": 2.0}"#)
            .await;
        source
            .insert("_collected/usd-rates/2013-05.json", r#"{"AAA": 2.0}"#)
            .await;

        let rates = load_rates(&source, 2013).await.unwrap();
        assert_eq!(rates.as_of(), Some(date(2013, 5, 1)));
    }

    #[tokio::test]
    async fn test_load_rates_errors() {
        let source = MemorySource::new();
        let err = load_rates(&source, 2013).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::Configuration(_))
        ));

        source
            .insert("_collected/usd-rates/2013-04.json", r#"{"AAA": "two"}"#)
            .await;
        let err = load_rates(&source, 2013).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::MalformedInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_store_prices() {
        let source = MemorySource::new();
        source
            .insert(
                "_collected/stocks/apple.json",
                r#"[["2013-04-01", 15.5], ["2013-05-01", null], ["2013-06-03", 16.0]]"#,
            )
            .await;
        let equities = vec![
            Equity {
                symbol: "AAPL".to_string(),
                name: "Apple Inc.".to_string(),
                filename: "apple".to_string(),
            },
            Equity {
                symbol: "MSFT".to_string(),
                name: "Microsoft".to_string(),
                filename: "msft".to_string(),
            },
        ];

        let prices = load_store_prices(&source, &equities).await.unwrap();
        assert_eq!(prices.symbols(), vec!["AAPL".to_string()]);
        assert_eq!(
            prices.price_as_of("AAPL", date(2013, 5, 15)),
            Some((date(2013, 4, 1), 15.5))
        );
        assert_eq!(
            prices.price_as_of("AAPL", date(2013, 6, 3)),
            Some((date(2013, 6, 3), 16.0))
        );
    }
}
