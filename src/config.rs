//! Run configuration.
//!
//! There is no configuration file. A `SortOptions` value is resolved once from
//! the command line (with environment fallbacks handled by clap) and passed to
//! [`crate::cli::run`].

use std::path::{Path, PathBuf};
use tracing::Level;

/// Environment variable read for the worker count when `--jobs` is absent.
pub const JOBS_ENV: &str = "FILE_SORTER_JOBS";

/// Environment variable holding an `EnvFilter` directive that overrides `-v`.
pub const LOG_ENV: &str = "FILE_SORTER_LOG";

/// How the final report is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Everything one sorting run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOptions {
    /// Folder to sort in place.
    pub root: PathBuf,
    /// Worker pool size, at least one.
    pub jobs: usize,
    pub dry_run: bool,
    pub extract_archives: bool,
    pub format: ReportFormat,
    /// Number of `-v` flags given.
    pub verbosity: u8,
    /// Draw the progress spinner on stderr.
    pub progress: bool,
}

impl SortOptions {
    /// Options for sorting `root` with the default settings.
    ///
    /// # Examples
    ///
    /// ```
    /// use file_sorter::config::{ReportFormat, SortOptions};
    ///
    /// let options = SortOptions::new("/tmp/inbox").jobs(0).dry_run(true);
    /// assert_eq!(options.jobs, 1);
    /// assert!(options.dry_run);
    /// assert_eq!(options.format, ReportFormat::Text);
    /// ```
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            jobs: num_cpus::get().max(1),
            dry_run: false,
            extract_archives: true,
            format: ReportFormat::Text,
            verbosity: 0,
            progress: false,
        }
    }

    /// Sets the worker count. Zero is raised to one.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn extract_archives(mut self, extract: bool) -> Self {
        self.extract_archives = extract;
        self
    }

    pub fn format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maximum tracing level for the configured verbosity.
    pub fn log_level(&self) -> Level {
        match self.verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}
