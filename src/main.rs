//! Bunker - sealed, versioned deployment workspaces.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bunker::cli::{execute, hint_for, output, Cli};
use bunker::core::constants;

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env(constants::LOG_ENV).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("bunker=debug")
        } else {
            EnvFilter::new("bunker=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time())
        .init();

    match execute(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output::error(&e.to_string());
            if let Some(hint) = hint_for(&e) {
                output::hint(hint);
            }
            std::process::exit(1);
        }
    }
}
