//! file-sorter - sorts a folder by file type
//!
//! Every file below a folder is renamed with a Cyrillic-to-Latin
//! transliteration, classified by extension, and moved into one of the
//! `images`, `video`, `documents`, `music`, `archives` or `unknown` folders
//! at the top level. Archives are unpacked next to themselves, and
//! directories left empty are removed. Files are processed concurrently on a
//! bounded worker pool.

pub mod archive;
pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod ledger;
pub mod normalize;
pub mod output;
pub mod report;
pub mod walker;

pub use config::{ReportFormat, SortOptions};
pub use file_category::{Category, ExtensionMapper};
pub use file_organizer::{FileOrganizer, OrganizeError, OrganizeResult};
pub use ledger::RunState;
pub use normalize::normalize;
pub use report::RunReport;
pub use walker::{TreeWalker, WalkStats};

pub use cli::{CliError, run};
