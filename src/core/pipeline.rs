//! Drives a build: every loader runs to completion before any country is priced.
use crate::core::config::AppConfig;
use crate::core::engine;
use crate::core::error::BuildError;
use crate::core::market::MarketData;
use crate::core::model::{Equity, InflationKind, InflationSeries, StoreOfValue, ThingPriceSeries};
use crate::loaders::inflation::{self, SeriesFilter};
use crate::loaders::reference::{self, ReferenceData};
use crate::source::DataSource;
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryFailure {
    pub country_code: String,
    pub reason: String,
}

/// Result of pricing every country against one inflation kind.
#[derive(Debug, Clone)]
pub struct KindReport {
    pub kind: InflationKind,
    pub as_of: Option<NaiveDate>,
    pub series: BTreeMap<String, ThingPriceSeries>,
    pub failures: Vec<CountryFailure>,
}

/// Reference tables and market data shared by every inflation kind.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub reference: ReferenceData,
    pub market: MarketData,
    pub stores: Vec<StoreOfValue>,
}

impl Dataset {
    pub async fn load(config: &AppConfig, source: &dyn DataSource) -> Result<Self> {
        let reference = reference::load(source, &config.excluded_countries).await?;
        let market =
            crate::loaders::market::load(source, config.start_year, &reference.equities).await?;
        let stores = stores_for(config, &market, &reference.equities);
        debug!(
            "Pricing against stores: {:?}",
            stores.iter().map(StoreOfValue::key).collect::<Vec<_>>()
        );
        Ok(Self {
            reference,
            market,
            stores,
        })
    }

    /// Loads the inflation series of `kind` for every known country.
    pub async fn inflation(
        &self,
        config: &AppConfig,
        source: &dyn DataSource,
        kind: InflationKind,
    ) -> Result<BTreeMap<String, InflationSeries>> {
        let filter = SeriesFilter::new(config.start_year, config.warmup_dates()?);
        let series =
            inflation::load_all(source, kind, &self.reference.countries, &filter).await?;
        if series.is_empty() {
            return Err(BuildError::Configuration(format!(
                "no usable {kind} data for any country"
            ))
            .into());
        }
        Ok(series)
    }

    /// Prices a single country, or `None` when it has no usable series of `kind`.
    pub async fn price_country(
        &self,
        config: &AppConfig,
        source: &dyn DataSource,
        kind: InflationKind,
        country_code: &str,
    ) -> Result<Option<ThingPriceSeries>> {
        let country = self
            .reference
            .countries
            .get(country_code)
            .ok_or_else(|| anyhow!("Unknown or excluded country: {}", country_code))?;
        let Some(content) = source
            .read(&inflation::series_path(kind, &country.code))
            .await?
        else {
            return Ok(None);
        };
        let filter = SeriesFilter::new(config.start_year, config.warmup_dates()?);
        let Some(series) = inflation::parse_series(&country.code, kind, &content, &filter)? else {
            return Ok(None);
        };
        let prices = engine::reconstruct(
            country,
            &series,
            &self.reference.redenominations,
            &self.market,
            &self.stores,
        )?;
        Ok(Some(prices))
    }

    /// Prices every country in code order. Coverage gaps fail only their country.
    pub fn reconstruct(
        &self,
        kind: InflationKind,
        inflation: &BTreeMap<String, InflationSeries>,
        on_country: &(dyn Fn(&str)),
    ) -> Result<KindReport, BuildError> {
        let mut report = KindReport {
            kind,
            as_of: self.market.rates.as_of(),
            series: BTreeMap::new(),
            failures: Vec::new(),
        };

        for (code, series) in inflation {
            let Some(country) = self.reference.countries.get(code) else {
                debug!("Skipping {} series for unknown country {}", kind, code);
                continue;
            };
            match engine::reconstruct(
                country,
                series,
                &self.reference.redenominations,
                &self.market,
                &self.stores,
            ) {
                Ok(prices) => {
                    report.series.insert(code.clone(), prices);
                }
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping {} ({}): {}", code, kind, e);
                    report.failures.push(CountryFailure {
                        country_code: code.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
            on_country(code);
        }

        info!(
            "Priced {} countries for {}, {} failed",
            report.series.len(),
            kind,
            report.failures.len()
        );
        Ok(report)
    }
}

/// `local` and `USD` first, then configured currencies, then equities with prices.
/// A key already taken by an earlier store is dropped.
fn stores_for(config: &AppConfig, market: &MarketData, equities: &[Equity]) -> Vec<StoreOfValue> {
    let mut stores = vec![StoreOfValue::Local, StoreOfValue::Usd];
    let mut seen: HashSet<String> = stores.iter().map(|s| s.key().to_string()).collect();

    for code in config.store_currencies() {
        if !market.rates.contains(&code) {
            warn!("Store {} has no exchange rates, its series will be empty", code);
        }
        seen.insert(code.clone());
        stores.push(StoreOfValue::Currency(code));
    }
    for equity in equities {
        if !market.prices.contains(&equity.symbol) {
            continue;
        }
        if !seen.insert(equity.symbol.clone()) {
            warn!(
                "Equity {} clashes with an existing store of the same name, dropping it",
                equity.symbol
            );
            continue;
        }
        stores.push(StoreOfValue::Equity(equity.symbol.clone()));
    }
    stores
}

/// Loads everything once and prices every configured inflation kind.
pub async fn build(config: &AppConfig, source: &dyn DataSource) -> Result<Vec<KindReport>> {
    let dataset = Dataset::load(config, source).await?;
    let mut reports = Vec::with_capacity(config.inflation_kinds.len());
    for kind in &config.inflation_kinds {
        let inflation = dataset.inflation(config, source, *kind).await?;
        reports.push(dataset.reconstruct(*kind, &inflation, &|_| ())?);
    }
    Ok(reports)
}
