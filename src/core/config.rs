use crate::core::error::BuildError;
use crate::core::model::{InflationKind, PIVOT_CURRENCY, parse_year_month};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

fn default_start_year() -> i32 {
    2013
}

fn default_stores() -> Vec<String> {
    vec!["BTC".to_string(), "XAU".to_string(), "XAG".to_string()]
}

fn default_inflation_kinds() -> Vec<InflationKind> {
    vec![InflationKind::Cpi, InflationKind::BroadMoney]
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Rate snapshots and inflation months before this year are ignored.
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    #[serde(default)]
    pub excluded_countries: Vec<String>,
    /// Currency-like stores quoted per USD in the rate table.
    #[serde(default = "default_stores")]
    pub stores: Vec<String>,
    /// `YYYY-MM` months dropped from every inflation series.
    #[serde(default)]
    pub warmup_months: Vec<String>,
    #[serde(default = "default_inflation_kinds")]
    pub inflation_kinds: Vec<InflationKind>,
    pub data_dir: Option<String>,
    pub output_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            start_year: default_start_year(),
            excluded_countries: Vec::new(),
            stores: default_stores(),
            warmup_months: Vec::new(),
            inflation_kinds: default_inflation_kinds(),
            data_dir: None,
            output_dir: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "thingprice", "thingprice")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    /// Root of the input tree (reference tables and `_collected/`).
    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_dir {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("org", "thingprice", "thingprice")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn output_path(&self) -> Result<PathBuf> {
        match &self.output_dir {
            Some(custom_path) => Ok(PathBuf::from(custom_path)),
            None => Ok(self.data_path()?.join("build")),
        }
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if self.inflation_kinds.is_empty() {
            return Err(BuildError::Configuration(
                "at least one inflation kind is required".to_string(),
            ));
        }
        self.warmup_dates()?;
        Ok(())
    }

    pub fn warmup_dates(&self) -> Result<Vec<NaiveDate>, BuildError> {
        self.warmup_months
            .iter()
            .map(|month| {
                parse_year_month(month).ok_or_else(|| {
                    BuildError::Configuration(format!("invalid warm-up month '{month}'"))
                })
            })
            .collect()
    }

    /// Store currencies with the pivot removed and duplicates dropped, in configured order.
    pub fn store_currencies(&self) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for code in &self.stores {
            let code = code.trim().to_uppercase();
            if code != PIVOT_CURRENCY && !codes.contains(&code) {
                codes.push(code);
            }
        }
        codes
    }

    pub fn is_excluded(&self, country_code: &str) -> bool {
        self.excluded_countries
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(country_code))
    }
}
