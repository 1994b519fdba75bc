//! Rebuilds a country's thing price in every store of value.
//!
//! Phase A walks the inflation series: each non-null value is redenominated to the
//! currency in effect on its month and flagged as measured; null or zero values
//! carry the previous amount forward as estimates. Phase B re-prices the last
//! known local amount on every later day that has an exchange rate, up to the
//! market's as-of date.
use crate::core::error::BuildError;
use crate::core::market::MarketData;
use crate::core::model::{Country, InflationSeries, PricePoint, StoreOfValue, ThingPriceSeries};
use crate::core::redenomination::{Redenominations, Resolved};
use chrono::NaiveDate;
use tracing::{debug, trace};

pub fn reconstruct(
    country: &Country,
    series: &InflationSeries,
    redenominations: &Redenominations,
    market: &MarketData,
    stores: &[StoreOfValue],
) -> Result<ThingPriceSeries, BuildError> {
    let mut output = ThingPriceSeries::new(country, series.kind, stores);
    let mut current: Option<Resolved> = None;

    // Phase A: one point per inflation month.
    for point in &series.points {
        let (resolved, is_actual) = match point.value.filter(|value| *value != 0.0) {
            Some(value) => {
                let resolved = redenominations.resolve(country, value, point.month);
                current = Some(resolved.clone());
                (resolved, true)
            }
            None => match &current {
                Some(previous) => (previous.clone(), false),
                None => {
                    return Err(BuildError::Configuration(format!(
                        "{} series for {} starts with an empty value at {}",
                        series.kind, country.code, point.month
                    )));
                }
            },
        };

        let rate = market
            .rates
            .rate_on(&resolved.currency, point.month)
            .filter(|rate| *rate > 0.0)
            .ok_or_else(|| BuildError::MissingCoverage {
                country: country.code.clone(),
                currency: resolved.currency.clone(),
                date: point.month,
            })?;
        emit(&mut output, market, stores, point.month, &resolved, rate, is_actual);
    }

    let (Some(last_point), Some(resolved)) = (series.points.last(), current) else {
        return Err(BuildError::Configuration(format!(
            "no usable {} values for {}",
            series.kind, country.code
        )));
    };

    // Phase B: estimated tail up to the latest known rate.
    if let (Some(first_day), Some(as_of)) = (last_point.month.succ_opt(), market.rates.as_of()) {
        let tail = market.rates.rates_between(&resolved.currency, first_day, as_of);
        debug!(
            "{}: {} estimate days between {} and {} in {}",
            country.code,
            tail.len(),
            first_day,
            as_of,
            resolved.currency
        );
        for (day, rate) in tail.into_iter().filter(|(_, rate)| *rate > 0.0) {
            emit(&mut output, market, stores, day, &resolved, rate, false);
        }
    }

    Ok(output)
}

/// Appends one point per store for `date`. `rate` converts the local amount to USD.
fn emit(
    output: &mut ThingPriceSeries,
    market: &MarketData,
    stores: &[StoreOfValue],
    date: NaiveDate,
    local: &Resolved,
    rate: f64,
    is_actual: bool,
) {
    output.record_currency(date, &local.currency);
    let usd = local.amount / rate;

    for store in stores {
        match store_amount(store, market, date, local.amount, usd) {
            Some(amount) => output.push(store.key(), PricePoint(date, amount, is_actual)),
            None => trace!("No {} quote on or before {}", store.key(), date),
        }
    }
}

fn store_amount(
    store: &StoreOfValue,
    market: &MarketData,
    date: NaiveDate,
    local: f64,
    usd: f64,
) -> Option<f64> {
    match store {
        StoreOfValue::Local => Some(local),
        StoreOfValue::Usd => Some(usd),
        StoreOfValue::Currency(code) => market
            .rates
            .rate_as_of(code, date)
            .map(|(_, rate)| usd * rate),
        StoreOfValue::Equity(symbol) => market
            .prices
            .price_as_of(symbol, date)
            .filter(|(_, price)| *price > 0.0)
            .map(|(_, price)| usd / price),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{InflationKind, InflationPoint, RedenominationEvent};
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn country() -> Country {
        Country {
            code: "XX".to_string(),
            name: "Example".to_string(),
            currency_code: "AAA".to_string(),
        }
    }

    fn series(points: &[(NaiveDate, Option<f64>)]) -> InflationSeries {
        InflationSeries {
            country_code: "XX".to_string(),
            kind: InflationKind::Cpi,
            points: points
                .iter()
                .map(|(month, value)| InflationPoint {
                    month: *month,
                    value: *value,
                })
                .collect(),
        }
    }

    fn market(rates: &[(NaiveDate, &str, f64)]) -> MarketData {
        let mut market = MarketData::default();
        for (d, code, rate) in rates {
            let snapshot = HashMap::from([(code.to_string(), *rate)]);
            market.rates.insert_snapshot(*d, &snapshot);
        }
        market
    }

    fn basic_stores() -> Vec<StoreOfValue> {
        vec![StoreOfValue::Local, StoreOfValue::Usd]
    }

    #[test]
    fn test_measured_points_convert_through_pivot() {
        let market = market(&[
            (date(2013, 4, 1), "AAA", 2.0),
            (date(2013, 5, 1), "AAA", 2.0),
        ]);
        let series = series(&[(date(2013, 4, 1), Some(100.0)), (date(2013, 5, 1), Some(110.0))]);

        let output = reconstruct(
            &country(),
            &series,
            &Redenominations::default(),
            &market,
            &basic_stores(),
        )
        .unwrap();

        assert_eq!(
            output.store("USD").unwrap(),
            &[
                PricePoint(date(2013, 4, 1), 50.0, true),
                PricePoint(date(2013, 5, 1), 55.0, true)
            ]
        );
        assert_eq!(
            output.store("local").unwrap(),
            &[
                PricePoint(date(2013, 4, 1), 100.0, true),
                PricePoint(date(2013, 5, 1), 110.0, true)
            ]
        );
        assert_eq!(output.currencies, vec![(date(2013, 4, 1), "AAA".to_string())]);
    }

    #[test]
    fn test_redenomination_switches_currency_forward() {
        let market = market(&[
            (date(2013, 4, 1), "AAA", 2.0),
            (date(2013, 5, 1), "AAA", 2.0),
            (date(2013, 5, 1), "BBB", 0.002),
        ]);
        let redenominations = Redenominations::new(vec![RedenominationEvent {
            country_code: "XX".to_string(),
            effective: date(2013, 5, 1),
            new_currency_code: "BBB".to_string(),
            from_amount: 1000.0,
            to_amount: 1.0,
        }]);
        let series = series(&[(date(2013, 4, 1), Some(100.0)), (date(2013, 5, 1), Some(110.0))]);

        let output =
            reconstruct(&country(), &series, &redenominations, &market, &basic_stores()).unwrap();

        let local = output.store("local").unwrap();
        assert_eq!(local[0], PricePoint(date(2013, 4, 1), 100.0, true));
        assert_eq!(local[1], PricePoint(date(2013, 5, 1), 0.11, true));
        assert_eq!(output.currency_at(date(2013, 4, 1)), Some("AAA"));
        assert_eq!(output.currency_at(date(2013, 5, 1)), Some("BBB"));

        let usd = output.store("USD").unwrap();
        assert_eq!(usd[0].amount(), 50.0);
        assert!((usd[1].amount() - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimated_tail_uses_last_local_amount() {
        let market = {
            let mut market = market(&[
                (date(2020, 5, 1), "AAA", 2.0),
                (date(2020, 6, 1), "AAA", 2.0),
                (date(2020, 6, 5), "BBB", 9.0),
                (date(2020, 6, 10), "AAA", 4.0),
            ]);
            market.rates.set_as_of(date(2020, 6, 10));
            market
        };
        let series = series(&[(date(2020, 5, 1), Some(90.0)), (date(2020, 6, 1), Some(100.0))]);

        let output = reconstruct(
            &country(),
            &series,
            &Redenominations::default(),
            &market,
            &basic_stores(),
        )
        .unwrap();

        // 2020-06-05 has no AAA rate, so only 06-10 is estimated.
        assert_eq!(
            output.store("USD").unwrap(),
            &[
                PricePoint(date(2020, 5, 1), 45.0, true),
                PricePoint(date(2020, 6, 1), 50.0, true),
                PricePoint(date(2020, 6, 10), 25.0, false)
            ]
        );
        assert_eq!(
            output.latest("local"),
            Some(&PricePoint(date(2020, 6, 10), 100.0, false))
        );
    }

    #[test]
    fn test_no_tail_when_as_of_precedes_next_day() {
        let mut market = market(&[(date(2020, 6, 1), "AAA", 2.0)]);
        market.rates.set_as_of(date(2020, 6, 1));
        let series = series(&[(date(2020, 6, 1), Some(100.0))]);

        let output = reconstruct(
            &country(),
            &series,
            &Redenominations::default(),
            &market,
            &basic_stores(),
        )
        .unwrap();
        assert_eq!(output.store("USD").unwrap().len(), 1);
    }

    #[test]
    fn test_null_and_zero_values_carry_forward_as_estimates() {
        let market = market(&[
            (date(2013, 4, 1), "AAA", 2.0),
            (date(2013, 5, 1), "AAA", 4.0),
            (date(2013, 6, 1), "AAA", 5.0),
            (date(2013, 7, 1), "AAA", 5.0),
        ]);
        let series = series(&[
            (date(2013, 4, 1), Some(100.0)),
            (date(2013, 5, 1), None),
            (date(2013, 6, 1), Some(0.0)),
            (date(2013, 7, 1), Some(120.0)),
        ]);

        let output = reconstruct(
            &country(),
            &series,
            &Redenominations::default(),
            &market,
            &basic_stores(),
        )
        .unwrap();

        let flags: Vec<bool> = output
            .store("USD")
            .unwrap()
            .iter()
            .map(PricePoint::is_actual)
            .collect();
        assert_eq!(flags, vec![true, false, false, true]);
        let usd: Vec<f64> = output
            .store("USD")
            .unwrap()
            .iter()
            .map(PricePoint::amount)
            .collect();
        assert_eq!(usd, vec![50.0, 25.0, 20.0, 24.0]);
    }

    #[test]
    fn test_missing_rate_is_coverage_error() {
        let market = market(&[(date(2013, 4, 1), "AAA", 2.0)]);
        let series = series(&[(date(2013, 4, 1), Some(100.0)), (date(2013, 5, 1), Some(110.0))]);

        let err = reconstruct(
            &country(),
            &series,
            &Redenominations::default(),
            &market,
            &basic_stores(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            BuildError::MissingCoverage {
                country: "XX".to_string(),
                currency: "AAA".to_string(),
                date: date(2013, 5, 1),
            }
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_leading_null_is_configuration_error() {
        let market = market(&[(date(2013, 4, 1), "AAA", 2.0)]);
        let series = series(&[(date(2013, 4, 1), None)]);

        let err = reconstruct(
            &country(),
            &series,
            &Redenominations::default(),
            &market,
            &basic_stores(),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));
    }

    #[test]
    fn test_currency_and_equity_stores() {
        let mut market = market(&[
            (date(2013, 4, 1), "AAA", 2.0),
            (date(2013, 4, 1), "XAU", 0.5),
            (date(2013, 4, 1), "USD", 1.0),
            (date(2013, 5, 1), "AAA", 2.0),
        ]);
        market.prices.insert("AAPL", date(2013, 4, 2), 25.0);
        let stores = vec![
            StoreOfValue::Local,
            StoreOfValue::Usd,
            StoreOfValue::Currency("XAU".to_string()),
            StoreOfValue::Equity("AAPL".to_string()),
        ];
        let series = series(&[(date(2013, 4, 1), Some(100.0)), (date(2013, 5, 1), Some(100.0))]);

        let output =
            reconstruct(&country(), &series, &Redenominations::default(), &market, &stores)
                .unwrap();

        // XAU is carried from the April snapshot into May.
        assert_eq!(
            output.store("XAU").unwrap(),
            &[
                PricePoint(date(2013, 4, 1), 25.0, true),
                PricePoint(date(2013, 5, 1), 25.0, true)
            ]
        );
        // No AAPL quote on or before 2013-04-01.
        assert_eq!(
            output.store("AAPL").unwrap(),
            &[PricePoint(date(2013, 5, 1), 2.0, true)]
        );
    }

    #[test]
    fn test_usd_country_prices_against_pivot() {
        let market = market(&[
            (date(2013, 4, 1), "EUR", 0.8),
            (date(2013, 5, 1), "EUR", 0.9),
        ]);
        let us = Country {
            code: "US".to_string(),
            name: "United States".to_string(),
            currency_code: "USD".to_string(),
        };
        let series = series(&[(date(2013, 4, 1), Some(100.0))]);

        let output =
            reconstruct(&us, &series, &Redenominations::default(), &market, &basic_stores())
                .unwrap();
        assert_eq!(
            output.store("USD").unwrap(),
            &[
                PricePoint(date(2013, 4, 1), 100.0, true),
                PricePoint(date(2013, 5, 1), 100.0, false)
            ]
        );
        assert_eq!(output.store("USD"), output.store("local"));
    }

    #[test]
    fn test_dates_strictly_increase_in_every_store() {
        let mut market = market(&[
            (date(2013, 4, 1), "AAA", 2.0),
            (date(2013, 4, 1), "BTC", 0.01),
            (date(2013, 5, 1), "AAA", 2.0),
            (date(2013, 5, 1), "BTC", 0.02),
            (date(2013, 6, 1), "AAA", 3.0),
            (date(2013, 6, 1), "BTC", 0.02),
            (date(2013, 6, 20), "AAA", 3.5),
            (date(2013, 6, 20), "BTC", 0.03),
        ]);
        market.rates.set_as_of(date(2013, 6, 20));
        let stores = vec![
            StoreOfValue::Local,
            StoreOfValue::Usd,
            StoreOfValue::Currency("BTC".to_string()),
        ];
        let series = series(&[
            (date(2013, 4, 1), Some(100.0)),
            (date(2013, 5, 1), None),
            (date(2013, 6, 1), Some(130.0)),
        ]);

        let output =
            reconstruct(&country(), &series, &Redenominations::default(), &market, &stores)
                .unwrap();

        for (key, points) in &output.stores {
            assert_eq!(points.len(), 4, "store {key}");
            assert!(
                points.windows(2).all(|w| w[0].date() < w[1].date()),
                "store {key} is not strictly increasing"
            );
            let actual = points.iter().filter(|p| p.is_actual()).count();
            assert_eq!(actual, 2, "store {key}");
        }
    }
}
