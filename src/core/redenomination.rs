//! Point-in-time currency substitution.
//!
//! Amounts are converted *forward*: a value expressed in a country's original
//! currency is re-expressed in the currency in effect at the query date. An event
//! applies when its effective date is on or before the query date, scaling the
//! amount by `to_amount / from_amount`. A 1000:1 redenomination with
//! `from_amount = 1000, to_amount = 1` turns 110 old units into 0.11 new ones.

use crate::core::model::{Country, RedenominationEvent};
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub amount: f64,
    pub currency: String,
}

/// Redenomination events grouped by country, each group in ascending date order.
#[derive(Debug, Clone, Default)]
pub struct Redenominations {
    by_country: HashMap<String, Vec<RedenominationEvent>>,
}

impl Redenominations {
    pub fn new(events: Vec<RedenominationEvent>) -> Self {
        let mut by_country: HashMap<String, Vec<RedenominationEvent>> = HashMap::new();
        for event in events {
            by_country
                .entry(event.country_code.clone())
                .or_default()
                .push(event);
        }
        // Stable, so same-day events keep their table order.
        for events in by_country.values_mut() {
            events.sort_by_key(|event| event.effective);
        }
        Self { by_country }
    }

    pub fn events_for(&self, country_code: &str) -> &[RedenominationEvent] {
        self.by_country
            .get(country_code)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_country.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn resolve(&self, country: &Country, base_amount: f64, at: NaiveDate) -> Resolved {
        resolve(
            self.events_for(&country.code),
            &country.currency_code,
            base_amount,
            at,
        )
    }
}

/// Applies every event effective on or before `at`, in order.
///
/// `events` must be sorted ascending by effective date; the scan stops at the
/// first event that is not yet effective.
pub fn resolve(
    events: &[RedenominationEvent],
    base_currency: &str,
    base_amount: f64,
    at: NaiveDate,
) -> Resolved {
    let mut resolved = Resolved {
        amount: base_amount,
        currency: base_currency.to_string(),
    };
    for event in events {
        if event.effective > at {
            break;
        }
        resolved.amount = resolved.amount * event.to_amount / event.from_amount;
        resolved.currency = event.new_currency_code.clone();
    }
    resolved
}
