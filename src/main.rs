use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use usdtwd::core::log::init_logging;

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

impl From<Commands> for usdtwd::AppCommand {
    fn from(cmd: Commands) -> usdtwd::AppCommand {
        match cmd {
            Commands::Serve => usdtwd::AppCommand::Serve,
            Commands::Fetch => usdtwd::AppCommand::Fetch,
            Commands::Query { start, end, json } => usdtwd::AppCommand::Query { start, end, json },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Serve the HTTP API and run the daily ingestion
    Serve,
    /// Fetch today's feed and store new rates
    Fetch,
    /// Query stored rates for a date range
    Query {
        /// First day, yyyy/MM/dd
        #[arg(long)]
        start: String,
        /// Last day, yyyy/MM/dd
        #[arg(long)]
        end: String,
        /// Print the raw JSON envelope
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => usdtwd::cli::setup::setup(),
        Some(cmd) => usdtwd::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
