use super::ui;
use crate::core::config::AppConfig;
use crate::core::{Dataset, KindReport, StoreOfValue};
use crate::source::DataSource;
use anyhow::Result;
use comfy_table::Cell;

impl KindReport {
    /// Latest price of the thing per country, one column per store of value.
    pub fn display_as_table(&self, stores: &[StoreOfValue]) -> String {
        let mut table = ui::new_styled_table();

        let mut header = vec![
            ui::header_cell("Country"),
            ui::header_cell("Currency"),
            ui::header_cell("Date"),
        ];
        header.extend(stores.iter().map(|store| ui::header_cell(store.key())));
        table.set_header(header);

        for series in self.series.values() {
            let latest_date = series
                .latest(StoreOfValue::Local.key())
                .map(|point| point.date().to_string());
            let mut row = vec![
                Cell::new(format!("{} ({})", series.country_name, series.country_code)),
                Cell::new(series.current_currency().unwrap_or("N/A")),
                latest_date.map_or_else(|| ui::na_cell(false), Cell::new),
            ];
            row.extend(
                stores
                    .iter()
                    .map(|store| ui::amount_cell(series.latest(store.key()))),
            );
            table.add_row(row);
        }

        for failure in &self.failures {
            let mut row = vec![
                Cell::new(&failure.country_code),
                ui::na_cell(true),
                ui::na_cell(true),
            ];
            row.extend(stores.iter().map(|_| ui::na_cell(true)));
            table.add_row(row);
        }

        let as_of = self
            .as_of
            .map_or_else(|| "N/A".to_string(), |d| d.to_string());
        let mut output = format!(
            "Thing price by {}: {}\n\n",
            ui::style_text(&self.kind.to_string(), ui::StyleType::Title),
            ui::style_text(&format!("as of {as_of}"), ui::StyleType::Subtle)
        );
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text(
                "~ marks estimates past the last inflation figure",
                ui::StyleType::Subtle
            )
        ));
        output
    }
}

/// Prices every configured kind in memory and prints the latest prices.
pub async fn run(config: &AppConfig, source: &dyn DataSource) -> Result<()> {
    let dataset = Dataset::load(config, source).await?;

    let num_kinds = config.inflation_kinds.len();
    for (i, kind) in config.inflation_kinds.iter().enumerate() {
        let inflation = dataset.inflation(config, source, *kind).await?;

        let pb = ui::new_progress_bar(inflation.len() as u64);
        pb.set_message(format!("Pricing {kind}..."));
        let report = dataset.reconstruct(*kind, &inflation, &|_| pb.inc(1))?;
        pb.finish_and_clear();

        println!("{}", report.display_as_table(&dataset.stores));
        if i < num_kinds - 1 {
            ui::print_separator();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::core::model::{Country, InflationKind, PricePoint, StoreOfValue, ThingPriceSeries};
    use crate::core::{CountryFailure, KindReport};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    #[test]
    fn test_display_as_table() {
        let date = NaiveDate::from_ymd_opt(2020, 6, 10).unwrap();
        let stores = vec![StoreOfValue::Local, StoreOfValue::Usd];
        let country = Country {
            code: "XX".to_string(),
            name: "Example".to_string(),
            currency_code: "AAA".to_string(),
        };
        let mut series = ThingPriceSeries::new(&country, InflationKind::Cpi, &stores);
        series.record_currency(date, "AAA");
        series.push("local", PricePoint(date, 100.0, false));
        series.push("USD", PricePoint(date, 25.0, false));

        let report = KindReport {
            kind: InflationKind::Cpi,
            as_of: Some(date),
            series: BTreeMap::from([("XX".to_string(), series)]),
            failures: vec![CountryFailure {
                country_code: "YY".to_string(),
                reason: "missing".to_string(),
            }],
        };

        let output = report.display_as_table(&stores);
        assert!(output.contains("Example (XX)"));
        assert!(output.contains("2020-06-10"));
        assert!(output.contains("~25.00"));
        assert!(output.contains("YY"));
    }
}
