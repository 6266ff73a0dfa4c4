use assess_core::error::AppError;
use clap::{Args, Parser, Subcommand};

use crate::demo::{run_coverage_report, run_demo, CoverageReportArgs, DemoArgs};
use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "Cybersecurity Assessment Platform",
    about = "Run the assessment platform API or generate coverage reports from the command line",
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
    /// Generate a hierarchy coverage report for stakeholder demos
    Report(CoverageReportArgs),
    /// Run an end-to-end CLI demo covering the approval and reporting flows
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Report(args) => run_coverage_report(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
