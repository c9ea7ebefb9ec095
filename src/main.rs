use clap::Parser;
use std::process::ExitCode;
use testreport::cli::{Cli, Output, setup_logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match cli.run().await {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => {
            Output::new(false, false).error(&format!("{e:#}"));
            ExitCode::from(2)
        }
    }
}
