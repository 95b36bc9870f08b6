use crate::report::{run_assess, run_tables, AssessArgs, TablesArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use crime_risk::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Crime Risk Assessment",
    about = "Score recidivism risk and forecast crime time windows from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score every person in a CSV export and print a triage summary
    Assess(AssessArgs),
    /// Print the validated reference tables used for scoring
    Tables(TablesArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// JSON file overriding the embedded reference tables
    #[arg(long)]
    pub(crate) tables: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Assess(args) => run_assess(args),
        Command::Tables(args) => run_tables(args),
    }
}
