use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxtrack::core::log::init_logging;

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

impl From<Commands> for fxtrack::AppCommand {
    fn from(cmd: Commands) -> fxtrack::AppCommand {
        match cmd {
            Commands::Serve => fxtrack::AppCommand::Serve,
            Commands::Sample => fxtrack::AppCommand::Sample,
            Commands::Report => fxtrack::AppCommand::Report,
            Commands::Show { report } => fxtrack::AppCommand::Show { daily: report },
            Commands::Rate { base, target } => fxtrack::AppCommand::Rate { base, target },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the HTTP API together with the sampling and report schedulers
    Serve,
    /// Fetch the latest rates once and record the ones that changed
    Sample,
    /// Regenerate the daily report from the recorded history
    Report,
    /// Display the recorded history
    Show {
        /// Display the last daily report instead
        #[arg(long)]
        report: bool,
    },
    /// Display the current rate of TARGET in units of BASE
    Rate { base: String, target: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, matches!(cli.command, Some(Commands::Serve)));

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => fxtrack::cli::setup::setup_at_path(path),
            None => fxtrack::cli::setup::setup(),
        },
        Some(cmd) => fxtrack::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
