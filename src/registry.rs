//! Extension-based language detection and the extractor table.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use thiserror::Error;

use crate::outline::{
    JavaScriptExtractor, OutlineExtractor, PythonExtractor, RustExtractor, SolidityExtractor,
};

/// Languages with an outline extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Python,
    JavaScript,
    Solidity,
    Rust,
}

static PYTHON: PythonExtractor = PythonExtractor;
static JAVASCRIPT: JavaScriptExtractor = JavaScriptExtractor;
static SOLIDITY: SolidityExtractor = SolidityExtractor;
static RUST: RustExtractor = RustExtractor;

impl Language {
    /// Every supported language, in lookup order.
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::JavaScript,
        Language::Solidity,
        Language::Rust,
    ];

    /// The shared extractor instance for this language.
    pub fn extractor(self) -> &'static dyn OutlineExtractor {
        match self {
            Language::Python => &PYTHON,
            Language::JavaScript => &JAVASCRIPT,
            Language::Solidity => &SOLIDITY,
            Language::Rust => &RUST,
        }
    }

    /// Lower-case extensions, with the leading dot.
    pub fn extensions(self) -> &'static [&'static str] {
        self.extractor().extensions()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extractor().language_name())
    }
}

#[derive(Debug, Error)]
#[error("no outline extractor for extension: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    /// Parse an extension, with or without the leading dot.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = format!(".{}", s.trim_start_matches('.').to_lowercase());
        extension_table()
            .get(key.as_str())
            .copied()
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

fn extension_table() -> &'static HashMap<&'static str, Language> {
    static TABLE: OnceLock<HashMap<&'static str, Language>> = OnceLock::new();
    TABLE.get_or_init(|| {
        Language::ALL
            .iter()
            .flat_map(|&lang| lang.extensions().iter().map(move |&ext| (ext, lang)))
            .collect()
    })
}

/// Detect the outline language of a path from its extension.
pub fn detect_language(path: &Path) -> Option<Language> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse().ok())
}

/// Extractor for a file name, or `None` when the file has no outline support.
pub fn extractor_for_file(path: &Path) -> Option<&'static dyn OutlineExtractor> {
    detect_language(path).map(Language::extractor)
}

/// Code-fence info string for a file extension (without the dot). Unknown
/// extensions get an empty tag.
pub fn fence_language(extension: &str) -> &'static str {
    match extension.trim_start_matches('.').to_lowercase().as_str() {
        "py" => "python",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "java" => "java",
        "c" => "c",
        "cpp" | "cc" | "h" | "hpp" => "cpp",
        "cs" => "csharp",
        "go" => "go",
        "rs" => "rust",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "m" | "mm" => "objectivec",
        "pl" => "perl",
        "sh" | "bash" | "zsh" => "bash",
        "fish" => "fish",
        "sql" => "sql",
        "r" => "r",
        "json" => "json",
        "xml" => "xml",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "md" => "markdown",
        "css" => "css",
        "scss" => "scss",
        "less" => "less",
        "html" => "html",
        "vue" => "vue",
        "svelte" => "svelte",
        "sol" => "solidity",
        _ => "",
    }
}

/// Fence tag for a path.
pub fn fence_language_for(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or("", fence_language)
}
