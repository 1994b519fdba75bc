//! In-memory exchange-rate and store-price tables.

use crate::core::model::PIVOT_CURRENCY;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Units of each currency per 1 USD, keyed by snapshot date.
#[derive(Debug, Clone, Default)]
pub struct ExchangeRates {
    rates: HashMap<String, BTreeMap<NaiveDate, f64>>,
    snapshot_dates: BTreeSet<NaiveDate>,
    as_of: Option<NaiveDate>,
}

impl ExchangeRates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a snapshot. Later calls for the same date override earlier values.
    pub fn insert_snapshot<'a>(
        &mut self,
        date: NaiveDate,
        rates: impl IntoIterator<Item = (&'a String, &'a f64)>,
    ) {
        self.snapshot_dates.insert(date);
        for (code, rate) in rates {
            self.rates
                .entry(code.to_uppercase())
                .or_default()
                .insert(date, *rate);
        }
    }

    pub fn set_as_of(&mut self, date: NaiveDate) {
        self.as_of = Some(date);
    }

    /// The most recent date rates are known for.
    pub fn as_of(&self) -> Option<NaiveDate> {
        self.as_of.or_else(|| self.snapshot_dates.last().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot_dates.is_empty()
    }

    pub fn contains(&self, currency: &str) -> bool {
        currency == PIVOT_CURRENCY || self.rates.contains_key(currency)
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshot_dates.len()
    }

    /// Rate on exactly `date`. The pivot is 1 on every snapshot date even when the
    /// snapshot omits it.
    pub fn rate_on(&self, currency: &str, date: NaiveDate) -> Option<f64> {
        let rate = self
            .rates
            .get(currency)
            .and_then(|by_date| by_date.get(&date))
            .copied();
        match rate {
            Some(rate) => Some(rate),
            None if currency == PIVOT_CURRENCY && self.snapshot_dates.contains(&date) => {
                Some(1.0)
            }
            None => None,
        }
    }

    /// Latest rate at or before `date`.
    pub fn rate_as_of(&self, currency: &str, date: NaiveDate) -> Option<(NaiveDate, f64)> {
        self.rates
            .get(currency)
            .and_then(|by_date| by_date.range(..=date).next_back())
            .map(|(d, rate)| (*d, *rate))
    }

    /// All rates for `currency` dated within `from..=to`, ascending.
    pub fn rates_between(
        &self,
        currency: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<(NaiveDate, f64)> {
        if from > to {
            return Vec::new();
        }
        if currency == PIVOT_CURRENCY {
            return self
                .snapshot_dates
                .range(from..=to)
                .filter_map(|d| self.rate_on(currency, *d).map(|rate| (*d, rate)))
                .collect();
        }
        self.rates
            .get(currency)
            .map(|by_date| {
                by_date
                    .range(from..=to)
                    .map(|(d, rate)| (*d, *rate))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// USD price per unit of each equity or commodity symbol, keyed by date.
#[derive(Debug, Clone, Default)]
pub struct StorePrices {
    prices: HashMap<String, BTreeMap<NaiveDate, f64>>,
}

impl StorePrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: &str, date: NaiveDate, price: f64) {
        self.prices
            .entry(symbol.to_string())
            .or_default()
            .insert(date, price);
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.prices.contains_key(symbol)
    }

    /// Sorted symbols with at least one price.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.prices.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Latest price at or before `date`.
    pub fn price_as_of(&self, symbol: &str, date: NaiveDate) -> Option<(NaiveDate, f64)> {
        self.prices
            .get(symbol)
            .and_then(|by_date| by_date.range(..=date).next_back())
            .map(|(d, price)| (*d, *price))
    }
}

/// Everything the engine prices against.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    pub rates: ExchangeRates,
    pub prices: StorePrices,
}
