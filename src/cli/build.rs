use super::ui;
use crate::core::config::AppConfig;
use crate::core::{Dataset, KindReport};
use crate::output;
use crate::source::DataSource;
use anyhow::Result;
use comfy_table::Cell;
use tracing::info;

impl KindReport {
    /// One-line outcome plus a table of the countries that could not be priced.
    pub fn display_outcome(&self) -> String {
        let as_of = self
            .as_of
            .map_or_else(|| "N/A".to_string(), |d| d.to_string());
        let mut output = format!(
            "{} {} countries priced, as of {}",
            ui::style_text(&format!("[{}]", self.kind), ui::StyleType::TotalLabel),
            ui::style_text(&self.series.len().to_string(), ui::StyleType::TotalValue),
            as_of
        );

        if !self.failures.is_empty() {
            let mut table = ui::new_styled_table();
            table.set_header(vec![ui::header_cell("Country"), ui::header_cell("Reason")]);
            for failure in &self.failures {
                table.add_row(vec![
                    Cell::new(&failure.country_code),
                    Cell::new(&failure.reason),
                ]);
            }
            output.push_str(&format!(
                "\n{}\n{}",
                ui::style_text(
                    &format!("{} countries skipped", self.failures.len()),
                    ui::StyleType::Error
                ),
                table
            ));
        }
        output
    }
}

/// Prices every configured inflation kind and writes the results to the output directory.
pub async fn run(config: &AppConfig, source: &dyn DataSource) -> Result<()> {
    let output_dir = config.output_path()?;
    info!("Building into {}", output_dir.display());

    let dataset = Dataset::load(config, source).await?;

    for kind in &config.inflation_kinds {
        let inflation = dataset.inflation(config, source, *kind).await?;

        let pb = ui::new_progress_bar(inflation.len() as u64);
        pb.set_message(format!("Pricing {kind}..."));
        let report = dataset.reconstruct(*kind, &inflation, &|_| pb.inc(1))?;
        pb.finish_and_clear();

        let written = output::write_report(&report, &output_dir).await?;
        println!("{}", report.display_outcome());
        println!(
            "{}",
            ui::style_text(
                &format!(
                    "{} files written to {}",
                    written.len(),
                    output_dir.join(kind.dir_name()).display()
                ),
                ui::StyleType::Subtle
            )
        );
    }

    Ok(())
}
