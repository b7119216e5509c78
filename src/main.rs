use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use kurs_emas::core::log::init_logging;

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

impl From<Commands> for kurs_emas::AppCommand {
    fn from(cmd: Commands) -> kurs_emas::AppCommand {
        match cmd {
            Commands::Run => kurs_emas::AppCommand::Run,
            Commands::History { limit } => kurs_emas::AppCommand::History { limit },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch today's rate and gold price and store them
    Run,
    /// Show the most recently stored records
    History {
        /// Number of records to show
        #[arg(short = 'n', long, default_value_t = 7)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => kurs_emas::cli::setup::setup(),
        Some(cmd) => kurs_emas::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!("Application failed: {e:#}");
    }
    result
}
