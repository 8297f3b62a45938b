//! File categorization by extension.
//!
//! This module maps a file extension to one of a fixed set of categories.
//! The per-category extension lists are flattened once into a lookup map;
//! when an extension is listed under two categories the category that comes
//! first in [`Category::CLASSIFIED`] keeps it.
//!
//! # Examples
//!
//! ```
//! use file_sorter::file_category::{Category, ExtensionMapper};
//!
//! let mapper = ExtensionMapper::default();
//! assert_eq!(mapper.classify("jpg"), Category::Images);
//! assert_eq!(mapper.classify("MP3"), Category::Music);
//! assert_eq!(mapper.classify("xyz"), Category::Unknown);
//! ```

use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Represents a file category.
///
/// Every category except `Unknown` owns a fixed list of extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Image files (JPEG, PNG, SVG)
    Images,
    /// Video files (AVI, MP4, MOV, MKV)
    Video,
    /// Document files (DOC, TXT, PDF, office formats)
    Documents,
    /// Audio files (MP3, OGG, WAV, AMR)
    Music,
    /// Archive files (ZIP, RAR, GZ, TAR)
    Archives,
    /// Anything not matched by the other categories
    Unknown,
}

impl Category {
    /// Categories that own an extension list, in match order.
    pub const CLASSIFIED: [Category; 5] = [
        Category::Images,
        Category::Video,
        Category::Documents,
        Category::Music,
        Category::Archives,
    ];

    /// Every category in report order.
    pub const ALL: [Category; 6] = [
        Category::Images,
        Category::Video,
        Category::Documents,
        Category::Music,
        Category::Archives,
        Category::Unknown,
    ];

    /// Returns the directory name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use file_sorter::file_category::Category;
    ///
    /// assert_eq!(Category::Images.dir_name(), "images");
    /// assert_eq!(Category::Unknown.dir_name(), "unknown");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Images => "images",
            Category::Video => "video",
            Category::Documents => "documents",
            Category::Music => "music",
            Category::Archives => "archives",
            Category::Unknown => "unknown",
        }
    }

    /// Returns the heading used for this category in the report.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Images => "Images",
            Category::Video => "Video",
            Category::Documents => "Documents",
            Category::Music => "Music",
            Category::Archives => "Archives",
            Category::Unknown => "Unknown",
        }
    }

    /// Returns the extensions owned by this category, lower-case and without
    /// the leading dot.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Category::Images => &["jpeg", "png", "jpg", "svg"],
            Category::Video => &["avi", "mp4", "mov", "mkv"],
            Category::Documents => &["doc", "docx", "txt", "pdf", "xlsx", "pptx"],
            Category::Music => &["mp3", "ogg", "wav", "amr"],
            Category::Archives => &["zip", "rar", "gz", "tar"],
            Category::Unknown => &[],
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Maps file extensions to categories.
///
/// Built once per run from the fixed per-category tables.
#[derive(Debug, Clone)]
pub struct ExtensionMapper {
    extension_map: HashMap<String, Category>,
}

impl ExtensionMapper {
    /// Creates a new `ExtensionMapper` with the built-in tables.
    pub fn new() -> Self {
        let mut mapper = Self {
            extension_map: HashMap::new(),
        };
        for category in Category::CLASSIFIED {
            for ext in category.extensions() {
                mapper.add_extension_mapping(ext, category);
            }
        }
        mapper
    }

    /// Adds a mapping unless the extension is already claimed.
    fn add_extension_mapping(&mut self, ext: &str, category: Category) {
        if let Entry::Vacant(slot) = self.extension_map.entry(ext.to_lowercase()) {
            slot.insert(category);
        }
    }

    /// Maps a file extension to a category, case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use file_sorter::file_category::{Category, ExtensionMapper};
    ///
    /// let mapper = ExtensionMapper::default();
    /// assert_eq!(mapper.extension_to_category("pdf"), Some(Category::Documents));
    /// assert_eq!(mapper.extension_to_category("PNG"), Some(Category::Images));
    /// assert_eq!(mapper.extension_to_category("xyz"), None);
    /// ```
    pub fn extension_to_category(&self, ext: &str) -> Option<Category> {
        self.extension_map.get(&ext.to_lowercase()).copied()
    }

    /// Determines the category for an extension, falling back to `Unknown`.
    pub fn classify(&self, ext: &str) -> Category {
        self.extension_to_category(ext).unwrap_or(Category::Unknown)
    }
}

impl Default for ExtensionMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_dir_names() {
        assert_eq!(Category::Images.dir_name(), "images");
        assert_eq!(Category::Video.dir_name(), "video");
        assert_eq!(Category::Documents.dir_name(), "documents");
        assert_eq!(Category::Music.dir_name(), "music");
        assert_eq!(Category::Archives.dir_name(), "archives");
        assert_eq!(Category::Unknown.dir_name(), "unknown");
    }

    #[test]
    fn test_every_table_extension_maps_to_owner() {
        let mapper = ExtensionMapper::default();
        for category in Category::CLASSIFIED {
            for ext in category.extensions() {
                assert_eq!(mapper.classify(ext), category, "extension {ext}");
            }
        }
    }

    #[test]
    fn test_classify_case_insensitive() {
        let mapper = ExtensionMapper::default();
        assert_eq!(mapper.classify("JPG"), Category::Images);
        assert_eq!(mapper.classify("Mkv"), Category::Video);
        assert_eq!(mapper.classify("DOCX"), Category::Documents);
    }

    #[test]
    fn test_classify_unknown() {
        let mapper = ExtensionMapper::default();
        assert_eq!(mapper.classify("xyz"), Category::Unknown);
        assert_eq!(mapper.classify(""), Category::Unknown);
        assert_eq!(mapper.classify("tar.gz"), Category::Unknown);
    }

    #[test]
    fn test_first_mapping_wins() {
        let mut mapper = ExtensionMapper::default();
        mapper.add_extension_mapping("zip", Category::Documents);
        mapper.add_extension_mapping("ZIP", Category::Music);
        assert_eq!(mapper.classify("zip"), Category::Archives);
    }

    #[test]
    fn test_tables_are_disjoint() {
        let mut seen = std::collections::HashSet::new();
        for category in Category::CLASSIFIED {
            for ext in category.extensions() {
                assert!(seen.insert(*ext), "{ext} listed twice");
            }
        }
    }

    #[test]
    fn test_report_order_ends_with_unknown() {
        assert_eq!(Category::ALL.last(), Some(&Category::Unknown));
        assert_eq!(&Category::ALL[..5], &Category::CLASSIFIED[..]);
    }
}
