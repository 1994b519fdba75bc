pub mod cli;
pub mod core;
pub mod loaders;
pub mod output;
pub mod source;

use crate::core::InflationKind;
use crate::core::config::AppConfig;
use crate::source::DiskSource;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Build,
    Summary,
    Country {
        code: String,
        kind: Option<InflationKind>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("thingprice starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let source = DiskSource::new(config.data_path()?);

    match command {
        AppCommand::Build => cli::build::run(&config, &source).await,
        AppCommand::Summary => cli::summary::run(&config, &source).await,
        AppCommand::Country { code, kind } => {
            cli::country::run(&config, &source, &code, kind).await
        }
    }
}
