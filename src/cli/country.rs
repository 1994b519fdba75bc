use super::ui;
use crate::core::config::AppConfig;
use crate::core::{Dataset, InflationKind, PricePoint, StoreOfValue, ThingPriceSeries};
use crate::source::DataSource;
use anyhow::{Result, bail};
use chrono::NaiveDate;
use comfy_table::Cell;
use std::collections::BTreeMap;

impl ThingPriceSeries {
    /// Full history of one country, one row per date and one column per store.
    pub fn display_as_table(&self, stores: &[StoreOfValue]) -> String {
        let mut table = ui::new_styled_table();

        let mut header = vec![ui::header_cell("Date"), ui::header_cell("Currency")];
        header.extend(stores.iter().map(|store| ui::header_cell(store.key())));
        table.set_header(header);

        let mut rows: BTreeMap<NaiveDate, Vec<Option<&PricePoint>>> = BTreeMap::new();
        for (column, store) in stores.iter().enumerate() {
            for point in self.store(store.key()).unwrap_or_default() {
                rows.entry(point.date())
                    .or_insert_with(|| vec![None; stores.len()])[column] = Some(point);
            }
        }

        for (date, points) in rows {
            let mut row = vec![
                Cell::new(date.to_string()),
                Cell::new(self.currency_at(date).unwrap_or("N/A")),
            ];
            row.extend(points.into_iter().map(ui::amount_cell));
            table.add_row(row);
        }

        format!(
            "{} ({}), {}\n\n{}",
            ui::style_text(&self.country_name, ui::StyleType::Title),
            self.country_code,
            self.kind,
            table
        )
    }
}

/// Prices one country on demand and prints its history.
pub async fn run(
    config: &AppConfig,
    source: &dyn DataSource,
    country_code: &str,
    kind: Option<InflationKind>,
) -> Result<()> {
    let country_code = country_code.to_uppercase();
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => config.inflation_kinds.clone(),
    };

    let dataset = Dataset::load(config, source).await?;

    let mut printed = 0;
    for kind in kinds {
        match dataset
            .price_country(config, source, kind, &country_code)
            .await?
        {
            Some(series) => {
                if printed > 0 {
                    ui::print_separator();
                }
                println!("{}", series.display_as_table(&dataset.stores));
                printed += 1;
            }
            None => println!(
                "{}",
                ui::style_text(
                    &format!("No {kind} data for {country_code}"),
                    ui::StyleType::Subtle
                )
            ),
        }
    }

    if printed == 0 {
        bail!("No inflation data available for {}", country_code);
    }
    Ok(())
}
