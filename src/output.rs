//! Writes priced series for the presentation layer.
//!
//! Layout: `<output>/<kind>/<CC>.json` per country and `<output>/<kind>/index.json`
//! aggregating the latest prices and the countries that failed.
use crate::core::model::{InflationKind, LOCAL_STORE, PIVOT_CURRENCY, PricePoint};
use crate::core::pipeline::{CountryFailure, KindReport};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::future::try_join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize)]
pub struct IndexEntry {
    pub code: String,
    pub name: String,
    pub currency: Option<String>,
    pub latest_local: Option<PricePoint>,
    pub latest_usd: Option<PricePoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KindIndex {
    pub kind: InflationKind,
    pub as_of: Option<NaiveDate>,
    pub countries: Vec<IndexEntry>,
    pub failures: Vec<CountryFailure>,
}

pub fn build_index(report: &KindReport) -> KindIndex {
    KindIndex {
        kind: report.kind,
        as_of: report.as_of,
        countries: report
            .series
            .values()
            .map(|series| IndexEntry {
                code: series.country_code.clone(),
                name: series.country_name.clone(),
                currency: series.current_currency().map(str::to_string),
                latest_local: series.latest(LOCAL_STORE).copied(),
                latest_usd: series.latest(PIVOT_CURRENCY).copied(),
            })
            .collect(),
        failures: report.failures.clone(),
    }
}

async fn write_json<T: Serialize>(path: PathBuf, value: &T) -> Result<PathBuf> {
    let content = serde_json::to_string(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    tokio::fs::write(&path, content)
        .await
        .with_context(|| format!("Failed to write file: {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(path)
}

/// Writes one report. Country files are written concurrently; returns every path written.
pub async fn write_report(report: &KindReport, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let kind_dir = output_dir.join(report.kind.dir_name());
    tokio::fs::create_dir_all(&kind_dir)
        .await
        .with_context(|| format!("Failed to create directory: {}", kind_dir.display()))?;

    let writes = report
        .series
        .iter()
        .map(|(code, series)| write_json(kind_dir.join(format!("{code}.json")), series));
    let mut written = try_join_all(writes).await?;

    written.push(write_json(kind_dir.join(INDEX_FILE), &build_index(report)).await?);
    info!(
        "Wrote {} files for {} to {}",
        written.len(),
        report.kind,
        kind_dir.display()
    );
    Ok(written)
}
