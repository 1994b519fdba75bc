//! Domain types shared by the loaders, the reconstruction engine and the output writer.

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// Key of the store holding the price in the country's own currency.
pub const LOCAL_STORE: &str = "local";

/// The intermediate unit every conversion is routed through.
pub const PIVOT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub code: String,
    pub name: String,
    /// Currency in effect at the start of the series. Redenominations move it forward.
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RedenominationEvent {
    pub country_code: String,
    pub effective: NaiveDate,
    pub new_currency_code: String,
    pub from_amount: f64,
    pub to_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equity {
    pub symbol: String,
    pub name: String,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum InflationKind {
    #[serde(rename = "cpi")]
    Cpi,
    #[serde(rename = "bm")]
    BroadMoney,
}

impl InflationKind {
    /// Directory under the collected data tree holding this kind's series.
    pub fn dir_name(&self) -> &'static str {
        match self {
            InflationKind::Cpi => "cpi",
            InflationKind::BroadMoney => "bm",
        }
    }
}

impl Display for InflationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

impl FromStr for InflationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpi" => Ok(InflationKind::Cpi),
            "bm" | "broad-money" => Ok(InflationKind::BroadMoney),
            _ => Err(anyhow!("Invalid inflation kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InflationPoint {
    /// First day of the measured month.
    pub month: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InflationSeries {
    pub country_code: String,
    pub kind: InflationKind,
    pub points: Vec<InflationPoint>,
}

/// A unit the thing's price is re-expressed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOfValue {
    Local,
    Usd,
    /// Quoted as units per USD in the exchange-rate table (BTC, XAU, XAG, ...).
    Currency(String),
    /// Quoted as USD per unit in the equity price table.
    Equity(String),
}

impl StoreOfValue {
    pub fn key(&self) -> &str {
        match self {
            StoreOfValue::Local => LOCAL_STORE,
            StoreOfValue::Usd => PIVOT_CURRENCY,
            StoreOfValue::Currency(code) => code,
            StoreOfValue::Equity(symbol) => symbol,
        }
    }
}

/// One output sample. Serializes as `[date, amount, is_actual]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint(pub NaiveDate, pub f64, pub bool);

impl PricePoint {
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn amount(&self) -> f64 {
        self.1
    }

    pub fn is_actual(&self) -> bool {
        self.2
    }
}

/// Price history of the thing for one country, per store of value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThingPriceSeries {
    pub country_code: String,
    pub country_name: String,
    pub kind: InflationKind,
    /// Local currency in effect from each date on.
    pub currencies: Vec<(NaiveDate, String)>,
    pub stores: BTreeMap<String, Vec<PricePoint>>,
}

impl ThingPriceSeries {
    pub fn new(country: &Country, kind: InflationKind, stores: &[StoreOfValue]) -> Self {
        Self {
            country_code: country.code.clone(),
            country_name: country.name.clone(),
            kind,
            currencies: Vec::new(),
            stores: stores
                .iter()
                .map(|store| (store.key().to_string(), Vec::new()))
                .collect(),
        }
    }

    pub fn store(&self, key: &str) -> Option<&[PricePoint]> {
        self.stores.get(key).map(Vec::as_slice)
    }

    pub fn latest(&self, key: &str) -> Option<&PricePoint> {
        self.stores.get(key).and_then(|points| points.last())
    }

    /// Currency code of the local store in effect on `date`.
    pub fn currency_at(&self, date: NaiveDate) -> Option<&str> {
        self.currencies
            .iter()
            .take_while(|(from, _)| *from <= date)
            .last()
            .map(|(_, code)| code.as_str())
    }

    pub fn current_currency(&self) -> Option<&str> {
        self.currencies.last().map(|(_, code)| code.as_str())
    }

    pub(crate) fn record_currency(&mut self, date: NaiveDate, code: &str) {
        if self.current_currency() != Some(code) {
            self.currencies.push((date, code.to_string()));
        }
    }

    pub(crate) fn push(&mut self, key: &str, point: PricePoint) {
        self.stores.entry(key.to_string()).or_default().push(point);
    }
}

/// Parses a `YYYY-MM` month into its first day.
pub fn parse_year_month(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d").ok()
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_parse_year_month() {
        assert_eq!(parse_year_month("2013-04"), Some(date("2013-04-01")));
        assert_eq!(parse_year_month(" 2020-12 "), Some(date("2020-12-01")));
        assert_eq!(parse_year_month("2020-13"), None);
        assert_eq!(parse_year_month("April"), None);
    }

    #[test]
    fn test_inflation_kind_from_str() {
        assert_eq!("CPI".parse::<InflationKind>().unwrap(), InflationKind::Cpi);
        assert_eq!(
            "bm".parse::<InflationKind>().unwrap(),
            InflationKind::BroadMoney
        );
        assert!("gdp".parse::<InflationKind>().is_err());
        assert_eq!(InflationKind::BroadMoney.to_string(), "bm");
    }

    #[test]
    fn test_price_point_serializes_as_tuple() {
        let point = PricePoint(date("2013-04-01"), 50.0, true);
        let json = serde_json::to_string(&point).unwrap();
        assert_eq!(json, r#"["2013-04-01",50.0,true]"#);
    }

    #[test]
    fn test_currency_at() {
        let country = Country {
            code: "XX".to_string(),
            name: "Example".to_string(),
            currency_code: "AAA".to_string(),
        };
        let mut series = ThingPriceSeries::new(&country, InflationKind::Cpi, &[]);
        series.record_currency(date("2013-04-01"), "AAA");
        series.record_currency(date("2013-05-01"), "AAA");
        series.record_currency(date("2013-06-01"), "BBB");

        assert_eq!(series.currencies.len(), 2);
        assert_eq!(series.currency_at(date("2013-03-01")), None);
        assert_eq!(series.currency_at(date("2013-05-15")), Some("AAA"));
        assert_eq!(series.currency_at(date("2014-01-01")), Some("BBB"));
        assert_eq!(series.current_currency(), Some("BBB"));
    }
}
