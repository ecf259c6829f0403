// Text normalization for transcripts and target tokens
// Lowercases, keeps only the practice script plus basic alphanumerics, trims

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Writing system whose Unicode block survives normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Script {
    /// U+0C00..U+0C7F
    #[default]
    Telugu,
    /// U+0900..U+097F
    Devanagari,
    /// U+0C80..U+0CFF
    Kannada,
    /// U+0B80..U+0BFF
    Tamil,
    /// Basic alphanumerics only
    Latin,
}

static TELUGU: LazyLock<Regex> = LazyLock::new(|| disallowed_outside(r"\x{0C00}-\x{0C7F}"));
static DEVANAGARI: LazyLock<Regex> = LazyLock::new(|| disallowed_outside(r"\x{0900}-\x{097F}"));
static KANNADA: LazyLock<Regex> = LazyLock::new(|| disallowed_outside(r"\x{0C80}-\x{0CFF}"));
static TAMIL: LazyLock<Regex> = LazyLock::new(|| disallowed_outside(r"\x{0B80}-\x{0BFF}"));
static LATIN: LazyLock<Regex> = LazyLock::new(|| disallowed_outside(""));

/// Build a regex matching every character outside `block`, ASCII lowercase
/// letters, digits and whitespace.
fn disallowed_outside(block: &str) -> Regex {
    Regex::new(&format!(r"[^{block}a-z0-9\s]")).expect("static character class is valid")
}

impl Script {
    fn disallowed(self) -> &'static Regex {
        match self {
            Script::Telugu => &TELUGU,
            Script::Devanagari => &DEVANAGARI,
            Script::Kannada => &KANNADA,
            Script::Tamil => &TAMIL,
            Script::Latin => &LATIN,
        }
    }
}

/// Normalize text for the default (Telugu) script
pub fn normalize(text: &str) -> String {
    normalize_for(text, Script::default())
}

/// Normalize text for comparison
///
/// Lowercasing happens before filtering so that characters whose lowercase
/// form falls outside the class are removed too; this keeps the function
/// idempotent.
pub fn normalize_for(text: &str, script: Script) -> String {
    let lowered = text.to_lowercase();
    script
        .disallowed()
        .replace_all(&lowered, "")
        .trim()
        .to_string()
}
