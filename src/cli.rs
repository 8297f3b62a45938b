//! Command-line interface for file-sorter.
//!
//! Parses arguments into [`SortOptions`], validates the target folder, runs
//! the concurrent walk over it and prints the resulting report.

use crate::config::{JOBS_ENV, ReportFormat, SortOptions};
use crate::file_organizer::{FileOrganizer, OrganizeError};
use crate::ledger::RunState;
use crate::output::OutputFormatter;
use crate::report::RunReport;
use crate::walker::TreeWalker;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Usage line printed for any argument error.
pub const USAGE: &str = "Usage: file-sorter <path_to_folder>";

#[derive(Debug, Parser)]
#[command(name = "file-sorter")]
#[command(about = "Sort a folder into images, video, documents, music, archives and unknown")]
#[command(version)]
pub struct Cli {
    /// Folder to sort in place
    #[arg(value_name = "FOLDER")]
    pub folder: PathBuf,

    /// Number of worker threads (defaults to the number of CPUs)
    #[arg(short, long, env = JOBS_ENV, value_name = "N")]
    pub jobs: Option<usize>,

    /// Show where files would go without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Move archives without unpacking them
    #[arg(long)]
    pub no_extract: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl From<Cli> for SortOptions {
    fn from(cli: Cli) -> Self {
        let mut options = SortOptions::new(cli.folder)
            .dry_run(cli.dry_run)
            .extract_archives(!cli.no_extract)
            .format(if cli.json {
                ReportFormat::Json
            } else {
                ReportFormat::Text
            })
            .verbosity(cli.verbose);
        if let Some(jobs) = cli.jobs {
            options = options.jobs(jobs);
        }
        options
    }
}

/// Fatal errors that end a run with exit status 1.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Usage: file-sorter <path_to_folder>")]
    Usage,

    #[error("The provided path is not a valid directory.")]
    NotADirectory { path: PathBuf },

    #[error(transparent)]
    Walk(#[from] OrganizeError),

    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Sorts the folder named by `options` and returns the report.
///
/// Per-file failures are carried in the report. Only an invalid folder or a
/// walker that cannot start is an error.
///
/// # Examples
///
/// ```no_run
/// use file_sorter::cli::run;
/// use file_sorter::config::SortOptions;
///
/// let report = run(&SortOptions::new("/home/me/Downloads")).unwrap();
/// report.print();
/// ```
pub fn run(options: &SortOptions) -> Result<RunReport, CliError> {
    let root = options.root();
    if !root.is_dir() {
        return Err(CliError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    info!(
        "sorting {} (jobs={}, dry_run={}, extract={})",
        root.display(),
        options.jobs,
        options.dry_run,
        options.extract_archives
    );

    let organizer = FileOrganizer::new()
        .dry_run(options.dry_run)
        .extract_archives(options.extract_archives)
        .print_warnings(options.format == ReportFormat::Text);

    let mut walker = TreeWalker::new(organizer).workers(options.jobs);
    if options.progress {
        walker = walker.progress(OutputFormatter::create_spinner());
    }

    let state = Arc::new(RunState::new());
    let stats = walker.walk(root, root, &state)?;

    Ok(RunReport::from_state(&state, stats, options.dry_run))
}

/// Prints `report` in the configured format.
pub fn print_report(report: &RunReport, format: ReportFormat) -> Result<(), CliError> {
    match format {
        ReportFormat::Text => report.print(),
        ReportFormat::Json => OutputFormatter::plain(&report.to_json()?),
    }
    Ok(())
}
