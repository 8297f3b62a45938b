use clap::Parser;
use clap::error::ErrorKind;
use file_sorter::cli::{self, Cli, CliError};
use file_sorter::config::{LOG_ENV, SortOptions};
use file_sorter::output::OutputFormatter;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            if let Some(reason) = e.to_string().lines().next() {
                OutputFormatter::plain(reason);
            }
            OutputFormatter::plain(&CliError::Usage.to_string());
            return ExitCode::FAILURE;
        }
    };

    let options = SortOptions::from(cli).progress(io::stderr().is_terminal());

    // Logs go to stderr so the report on stdout stays clean.
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(options.log_level().as_str().to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let result = cli::run(&options).and_then(|report| cli::print_report(&report, options.format));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
