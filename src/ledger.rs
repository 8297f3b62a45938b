//! Shared per-run state mutated by every worker.
//!
//! The ledger, the extension sets and the failure list each sit behind their
//! own mutex. A `RunState` is built once per run, shared with the walker by
//! `Arc`, and handed to the reporter after the walk has drained.

use crate::file_category::Category;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Record of which new file names ended up in which category.
///
/// Append-only while the walk runs.
#[derive(Debug, Default)]
pub struct ProcessedFileLedger {
    files: Mutex<HashMap<Category, Vec<String>>>,
}

impl ProcessedFileLedger {
    /// Appends `name` to the list for `category`.
    pub fn record(&self, category: Category, name: impl Into<String>) {
        self.files.lock().entry(category).or_default().push(name.into());
    }

    /// Returns a copy of the names recorded under `category`, in append order.
    pub fn files_in(&self, category: Category) -> Vec<String> {
        self.files
            .lock()
            .get(&category)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of recorded files across all categories.
    pub fn total(&self) -> usize {
        self.files.lock().values().map(Vec::len).sum()
    }

    /// Copies the ledger into a map ordered by category.
    pub fn snapshot(&self) -> BTreeMap<Category, Vec<String>> {
        self.files
            .lock()
            .iter()
            .map(|(category, names)| (*category, names.clone()))
            .collect()
    }
}

/// Sets of extensions seen during the run, split by whether they matched a
/// category. Only used for reporting.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    known: Mutex<BTreeSet<String>>,
    unknown: Mutex<BTreeSet<String>>,
}

impl ExtensionRegistry {
    /// Records `ext` as known or unknown depending on how it was classified.
    pub fn record(&self, ext: &str, category: Category) {
        let set = if category == Category::Unknown {
            &self.unknown
        } else {
            &self.known
        };
        set.lock().insert(ext.to_string());
    }

    pub fn known(&self) -> BTreeSet<String> {
        self.known.lock().clone()
    }

    pub fn unknown(&self) -> BTreeSet<String> {
        self.unknown.lock().clone()
    }
}

/// All mutable state of one sorting run.
#[derive(Debug, Default)]
pub struct RunState {
    /// Files placed into each category.
    pub ledger: ProcessedFileLedger,
    /// Known and unknown extensions.
    pub extensions: ExtensionRegistry,
    failures: Mutex<Vec<(PathBuf, String)>>,
    placed: Mutex<HashSet<PathBuf>>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a path this run is about to create: a moved file's destination
    /// or an archive's extraction directory.
    pub fn mark_placed(&self, path: &Path) {
        self.placed.lock().insert(path.to_path_buf());
    }

    /// Whether `path` was created by this run. The walker never descends
    /// into or reprocesses such paths.
    pub fn is_placed(&self, path: &Path) -> bool {
        self.placed.lock().contains(path)
    }

    /// Runs `f` unless `path` is placed, and returns its result.
    ///
    /// The placed set stays locked while `f` runs, so `mark_placed(path)`
    /// from another thread lands either before the check or after `f`.
    pub fn unless_placed<T>(&self, path: &Path, f: impl FnOnce() -> T) -> Option<T> {
        let placed = self.placed.lock();
        if placed.contains(path) {
            return None;
        }
        let result = f();
        drop(placed);
        Some(result)
    }

    /// Records a per-file failure that did not stop the run.
    pub fn record_failure(&self, path: &Path, reason: impl Into<String>) {
        self.failures.lock().push((path.to_path_buf(), reason.into()));
    }

    /// Returns the recorded failures sorted by path.
    pub fn failures(&self) -> Vec<(PathBuf, String)> {
        let mut failures = self.failures.lock().clone();
        failures.sort();
        failures
    }
}
