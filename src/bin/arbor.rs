//! Arbor CLI Binary
//!
//! Command-line interface for the arbor tree view.

use arbor::logging::init_logging;
use arbor::tooling::cli::{Cli, CliContext};
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let context = match CliContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error initializing workspace: {}", e);
            process::exit(1);
        }
    };

    let logging = context.config().logging.clone().with_overrides(
        cli.log_level.clone(),
        cli.log_format.clone(),
        cli.log_output.clone(),
    );
    if let Err(e) = init_logging(
        Some(&logging),
        cli.log_file.as_deref(),
        Some(context.workspace_root()),
    ) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    match context.execute(&cli.command).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
