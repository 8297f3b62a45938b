//! End-of-run report.
//!
//! A `RunReport` is taken from the shared [`RunState`] once the walk has
//! drained. It renders as plain text (categories with their files, then the
//! known and unknown extension sets) or as JSON.

use crate::file_category::Category;
use crate::ledger::RunState;
use crate::output::OutputFormatter;
use crate::walker::WalkStats;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;

/// Files recorded under one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryFiles {
    pub category: Category,
    pub files: Vec<String>,
}

/// A file that could not be fully processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    pub path: String,
    pub reason: String,
}

/// Everything printed at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dry_run: bool,
    /// Non-empty categories in report order.
    pub categories: Vec<CategoryFiles>,
    pub known_extensions: BTreeSet<String>,
    pub unknown_extensions: BTreeSet<String>,
    pub failures: Vec<FailureEntry>,
    pub stats: WalkStats,
}

impl RunReport {
    /// Builds the report from the final run state.
    pub fn from_state(state: &RunState, stats: WalkStats, dry_run: bool) -> Self {
        let mut ledger = state.ledger.snapshot();
        let categories = Category::ALL
            .iter()
            .filter_map(|category| {
                ledger
                    .remove(category)
                    .filter(|files| !files.is_empty())
                    .map(|files| CategoryFiles {
                        category: *category,
                        files,
                    })
            })
            .collect();

        let failures = state
            .failures()
            .into_iter()
            .map(|(path, reason)| FailureEntry {
                path: path.display().to_string(),
                reason,
            })
            .collect();

        Self {
            dry_run,
            categories,
            known_extensions: state.extensions.known(),
            unknown_extensions: state.extensions.unknown(),
            failures,
            stats,
        }
    }

    /// Files recorded under `category`, empty if none.
    pub fn files_in(&self, category: Category) -> &[String] {
        self.categories
            .iter()
            .find(|entry| entry.category == category)
            .map(|entry| entry.files.as_slice())
            .unwrap_or_default()
    }

    pub fn total_files(&self) -> usize {
        self.categories.iter().map(|entry| entry.files.len()).sum()
    }

    /// Renders the category listing and the extension sets as plain text.
    ///
    /// # Examples
    ///
    /// ```
    /// use file_sorter::file_category::Category;
    /// use file_sorter::ledger::RunState;
    /// use file_sorter::report::RunReport;
    /// use file_sorter::walker::WalkStats;
    ///
    /// let state = RunState::new();
    /// state.ledger.record(Category::Images, "Foto.jpg");
    /// state.extensions.record("jpg", Category::Images);
    ///
    /// let text = RunReport::from_state(&state, WalkStats::default(), false).render_text();
    /// assert_eq!(
    ///     text,
    ///     "Images:\n - Foto.jpg\nKnown extensions: {'jpg'}\nUnknown extensions: {}\n"
    /// );
    /// ```
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.categories {
            let _ = writeln!(out, "{}:", entry.category.label());
            for file in &entry.files {
                let _ = writeln!(out, " - {}", file);
            }
        }
        let _ = writeln!(out, "Known extensions: {}", format_set(&self.known_extensions));
        let _ = writeln!(
            out,
            "Unknown extensions: {}",
            format_set(&self.unknown_extensions)
        );
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Prints the text report, the per-category summary and any failures.
    pub fn print(&self) {
        if self.dry_run {
            OutputFormatter::dry_run_notice("Files would be organized as follows:");
        }

        for line in self.render_text().lines() {
            OutputFormatter::plain(line);
        }

        let rows: Vec<(String, usize)> = self
            .categories
            .iter()
            .map(|entry| (entry.category.label().to_string(), entry.files.len()))
            .collect();
        OutputFormatter::summary_table(&rows, self.total_files());

        if !self.dry_run && self.stats.pruned > 0 {
            OutputFormatter::info(&format!(
                "Removed {} empty {}",
                self.stats.pruned,
                if self.stats.pruned == 1 {
                    "directory"
                } else {
                    "directories"
                }
            ));
        }

        if self.failures.is_empty() {
            OutputFormatter::success(if self.dry_run {
                "Dry run complete. No files were modified."
            } else {
                "Sorting complete!"
            });
        } else {
            OutputFormatter::warning(&format!(
                "{} file(s) could not be fully processed:",
                self.failures.len()
            ));
            for failure in &self.failures {
                OutputFormatter::plain(&format!("    - {}: {}", failure.path, failure.reason));
            }
        }
    }
}

/// Formats a set as `{'a', 'b'}`. Items are quoted so an empty extension
/// still shows up as `''`.
fn format_set(set: &BTreeSet<String>) -> String {
    let items: Vec<String> = set.iter().map(|item| format!("'{item}'")).collect();
    format!("{{{}}}", items.join(", "))
}
