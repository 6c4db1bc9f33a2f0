use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use trove::config::{Cli, MANIFEST_FILE};
use trove::TroveError;

/// Exit status for manifest and storage URL problems
const CONFIG_ERROR_EXIT: u8 = 2;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cwd = std::env::current_dir()?;
    match trove::commands::run(cli.command, &cwd) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => match err.downcast_ref::<TroveError>() {
            Some(trove_err) if trove_err.is_config_error() => {
                eprintln!("Error: {trove_err}");
                eprintln!("Check {MANIFEST_FILE}, or run `trove init` to create one");
                Ok(ExitCode::from(CONFIG_ERROR_EXIT))
            }
            _ => Err(err),
        },
    }
}
