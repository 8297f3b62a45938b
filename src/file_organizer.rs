//! Per-file processing: classify, rename, move, unpack.
//!
//! A file is classified by its extension, renamed to its normalized stem plus
//! the lower-cased extension, and moved into `root/<category>/`. Archives are
//! then unpacked into `root/archives/<normalized stem>/`.
//!
//! Moves overwrite an existing file of the same name at the destination; no
//! collision resolution is attempted.

use crate::archive;
use crate::file_category::{Category, ExtensionMapper};
use crate::ledger::RunState;
use crate::normalize::normalize;
use crate::output::OutputFormatter;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Where a single file is going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    /// The file as found during the walk.
    pub source: PathBuf,
    /// `root/<category>/<new_name>`.
    pub destination: PathBuf,
    /// The category the file belongs to.
    pub category: Category,
    /// Lower-cased extension without the dot, empty if there is none.
    pub extension: String,
    /// Normalized stem, a dot, and the extension.
    pub new_name: String,
}

impl PlannedMove {
    /// Directory an archive is unpacked into: the new name minus its extension.
    pub fn extraction_dir(&self) -> PathBuf {
        let stem = self
            .new_name
            .rsplit_once('.')
            .map_or(self.new_name.as_str(), |(stem, _)| stem);
        self.destination.with_file_name(stem)
    }
}

/// Errors that can occur while organizing a file or walking a directory.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// Failed to create a category directory.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to move a file to its category directory.
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The path has no file name component.
    #[error("Path {} has no file name", path.display())]
    InvalidFileName { path: PathBuf },

    /// The base directory path is invalid or doesn't exist.
    #[error("Invalid base path {}: {source}", path.display())]
    InvalidBasePath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A directory could not be listed.
    #[error("Failed to read directory {}: {source}", path.display())]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A worker thread could not be started.
    #[error("Failed to start worker thread: {source}")]
    WorkerSpawnFailed {
        #[source]
        source: io::Error,
    },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Moves files into category subdirectories of a destination root.
#[derive(Debug, Clone)]
pub struct FileOrganizer {
    mapper: ExtensionMapper,
    dry_run: bool,
    extract_archives: bool,
    print_warnings: bool,
}

impl Default for FileOrganizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FileOrganizer {
    /// Creates an organizer that moves files, unpacks archives and prints
    /// warnings.
    pub fn new() -> Self {
        Self {
            mapper: ExtensionMapper::new(),
            dry_run: false,
            extract_archives: true,
            print_warnings: true,
        }
    }

    /// When set, files are classified and recorded but never touched.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn extract_archives(mut self, extract: bool) -> Self {
        self.extract_archives = extract;
        self
    }

    /// Controls whether unpack warnings are printed to stdout.
    pub fn print_warnings(mut self, print: bool) -> Self {
        self.print_warnings = print;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Works out the category and destination of `file_path` without side
    /// effects.
    ///
    /// # Examples
    ///
    /// ```
    /// use file_sorter::file_category::Category;
    /// use file_sorter::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let plan = FileOrganizer::new()
    ///     .plan(Path::new("/in/Мій звіт.PDF"), Path::new("/out"))
    ///     .unwrap();
    /// assert_eq!(plan.category, Category::Documents);
    /// assert_eq!(plan.new_name, "Miy_zvit.pdf");
    /// assert_eq!(plan.destination, Path::new("/out/documents/Miy_zvit.pdf"));
    /// ```
    pub fn plan(&self, file_path: &Path, destination_root: &Path) -> OrganizeResult<PlannedMove> {
        let stem = file_path
            .file_stem()
            .ok_or_else(|| OrganizeError::InvalidFileName {
                path: file_path.to_path_buf(),
            })?
            .to_string_lossy();
        let extension = file_path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let category = self.mapper.classify(&extension);
        let new_name = format!("{}.{}", normalize(&stem), extension);
        let destination = destination_root.join(category.dir_name()).join(&new_name);

        Ok(PlannedMove {
            source: file_path.to_path_buf(),
            destination,
            category,
            extension,
            new_name,
        })
    }

    /// Processes one file: classify, record its extension, move it, record
    /// it in the ledger, and unpack it if it is an archive.
    ///
    /// A failed unpack is recorded as a failure and printed as a warning; it
    /// does not make this function fail.
    pub fn process(
        &self,
        file_path: &Path,
        destination_root: &Path,
        state: &RunState,
    ) -> OrganizeResult<Category> {
        let plan = self.plan(file_path, destination_root)?;
        state.extensions.record(&plan.extension, plan.category);

        if self.dry_run {
            debug!(
                "would move {} -> {}",
                plan.source.display(),
                plan.destination.display()
            );
            state.ledger.record(plan.category, plan.new_name);
            return Ok(plan.category);
        }

        let category_path = destination_root.join(plan.category.dir_name());
        ensure_dir(&category_path)?;
        state.mark_placed(&plan.destination);
        move_file(&plan.source, &plan.destination)?;
        debug!(
            "moved {} -> {}",
            plan.source.display(),
            plan.destination.display()
        );
        state.ledger.record(plan.category, plan.new_name.clone());

        if plan.category == Category::Archives && self.extract_archives {
            self.unpack(&plan, state)?;
        }

        Ok(plan.category)
    }

    fn unpack(&self, plan: &PlannedMove, state: &RunState) -> OrganizeResult<()> {
        let target = plan.extraction_dir();
        state.mark_placed(&target);
        ensure_dir(&target)?;

        if let Err(e) = archive::extract(&plan.destination, &target) {
            warn!("{}", e);
            if self.print_warnings {
                OutputFormatter::warning(&format!(
                    "Warning: Unable to unpack archive {}",
                    plan.destination.display()
                ));
            }
            state.record_failure(&plan.destination, e.to_string());
            remove_empty_extraction_dir(&target);
        }

        Ok(())
    }
}

/// Removes the extraction directory of a failed unpack, unless it already
/// holds partial output.
fn remove_empty_extraction_dir(path: &Path) {
    match fs::remove_dir(path) {
        Ok(()) => debug!("removed empty extraction directory {}", path.display()),
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::DirectoryNotEmpty | io::ErrorKind::NotFound
            ) => {}
        Err(e) => debug!("could not remove {}: {}", path.display(), e),
    }
}

/// Creates `path` and its parents. An already existing directory, including
/// one created concurrently by another worker, is not an error.
fn ensure_dir(path: &Path) -> OrganizeResult<()> {
    fs::create_dir_all(path).map_err(|e| OrganizeError::DirectoryCreationFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Moves `source` to `destination`, replacing any file already there.
///
/// Falls back to copy and delete when the two paths are on different
/// filesystems.
fn move_file(source: &Path, destination: &Path) -> OrganizeResult<()> {
    let failure = |e: io::Error| OrganizeError::FileMoveFailure {
        from: source.to_path_buf(),
        to: destination.to_path_buf(),
        source: e,
    };

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(source, destination).map_err(failure)?;
            fs::remove_file(source).map_err(failure)
        }
        Err(e) => Err(failure(e)),
    }
}
