//! File name normalization.
//!
//! Cyrillic letters (Russian and Ukrainian alphabets) are transliterated to
//! Latin, then every character that is not an ASCII letter, an ASCII digit or
//! an underscore becomes an underscore.
//!
//! ```
//! use file_sorter::normalize::normalize;
//!
//! assert_eq!(normalize("Фото"), "Foto");
//! assert_eq!(normalize("Щука і риба"), "SHCHuka_i_riba");
//! assert_eq!(normalize("report (final)"), "report__final_");
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

/// Lower-case Cyrillic letters and their Latin replacements.
///
/// `ъ` and `ь` transliterate to nothing.
const CYRILLIC_TO_LATIN: [(char, &str); 36] = [
    ('а', "a"),
    ('б', "b"),
    ('в', "v"),
    ('г', "g"),
    ('д', "d"),
    ('е', "e"),
    ('ё', "e"),
    ('ж', "zh"),
    ('з', "z"),
    ('и', "i"),
    ('й', "y"),
    ('к', "k"),
    ('л', "l"),
    ('м', "m"),
    ('н', "n"),
    ('о', "o"),
    ('п', "p"),
    ('р', "r"),
    ('с', "s"),
    ('т', "t"),
    ('у', "u"),
    ('ф', "f"),
    ('х', "kh"),
    ('ц', "ts"),
    ('ч', "ch"),
    ('ш', "sh"),
    ('щ', "shch"),
    ('ъ', ""),
    ('ы', "y"),
    ('ь', ""),
    ('э', "e"),
    ('ю', "yu"),
    ('я', "ya"),
    ('є', "ye"),
    ('і', "i"),
    ('ї', "yi"),
];

static TABLE: LazyLock<TransliterationTable> = LazyLock::new(TransliterationTable::new);

/// Static mapping from single Cyrillic code points to Latin strings.
///
/// Both cases are present: an upper-case letter maps to the upper-cased form
/// of its replacement, so `Ж` becomes `ZH` and `Щ` becomes `SHCH`.
#[derive(Debug)]
pub struct TransliterationTable {
    map: HashMap<char, String>,
}

impl TransliterationTable {
    fn new() -> Self {
        let mut map = HashMap::with_capacity(CYRILLIC_TO_LATIN.len() * 2);
        for (cyr, lat) in CYRILLIC_TO_LATIN {
            map.insert(cyr, lat.to_string());
            for upper in cyr.to_uppercase() {
                map.insert(upper, lat.to_uppercase());
            }
        }
        Self { map }
    }

    /// Returns the process-wide table.
    pub fn global() -> &'static Self {
        &TABLE
    }

    /// Looks up the Latin replacement for `c`, if `c` is a covered letter.
    pub fn get(&self, c: char) -> Option<&str> {
        self.map.get(&c).map(String::as_str)
    }

    /// Iterates over every covered letter, both cases.
    pub fn letters(&self) -> impl Iterator<Item = char> + '_ {
        self.map.keys().copied()
    }
}

/// Maps an arbitrary file name to an ASCII-safe, underscore-delimited string.
pub fn normalize(name: &str) -> String {
    let table = TransliterationTable::global();
    let mut out = String::with_capacity(name.len());

    for c in name.chars() {
        if let Some(latin) = table.get(c) {
            out.push_str(latin);
        } else if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
    }

    out
}
