use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use thingprice::cli::setup::setup;
use thingprice::core::InflationKind;
use thingprice::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for thingprice::AppCommand {
    fn from(cmd: Commands) -> thingprice::AppCommand {
        match cmd {
            Commands::Build => thingprice::AppCommand::Build,
            Commands::Summary => thingprice::AppCommand::Summary,
            Commands::Country { code, kind } => thingprice::AppCommand::Country { code, kind },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Price the thing for every country and write the JSON output
    Build,
    /// Display the latest price per country
    Summary,
    /// Display the full price history of one country
    Country {
        /// ISO country code, e.g. VE
        code: String,
        /// Only this inflation kind (cpi or bm)
        #[arg(short, long)]
        kind: Option<InflationKind>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => thingprice::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
