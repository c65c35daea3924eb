//! Output formatting for codecat.
//!
//! Renders collected files as a full-content markdown document, as an
//! outline tree, or as JSON.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::builder::FileEntry;
use crate::clipboard::ClipboardError;
use crate::outline::FunctionRecord;
use crate::registry;
use crate::tokens::count_tokens;
use crate::tree::{self, display_path};

/// Errors that can occur while rendering or delivering output.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("clipboard: {0}")]
    Clipboard(#[from] ClipboardError),
}

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Every file's outline bullets followed by its fenced content.
    #[default]
    Full,
    /// One fenced tree of directories, files and their outlines.
    Tree,
    /// Machine-readable outlines.
    Json,
}

/// Render `files` in the given mode.
pub fn render(files: &BTreeMap<PathBuf, FileEntry>, mode: OutputMode) -> Result<String, OutputError> {
    match mode {
        OutputMode::Full => Ok(format_content(files)),
        OutputMode::Tree => Ok(format_tree(files)),
        OutputMode::Json => format_json(files),
    }
}

/// Full-content document.
///
/// Per file: `# path`, a `## Functions` bullet list when the outline has
/// any non-class records, then `## Content` with the text fenced and tagged
/// by extension. Files with empty content get only their header.
pub fn format_content(files: &BTreeMap<PathBuf, FileEntry>) -> String {
    let mut lines: Vec<String> = Vec::new();

    for (path, entry) in files {
        lines.push(format!("# {}", display_path(path)));
        lines.push(String::new());

        let functions: Vec<&FunctionRecord> =
            entry.outline.iter().filter(|r| !r.is_class()).collect();
        if !functions.is_empty() {
            lines.push("## Functions".to_string());
            lines.extend(functions.iter().map(|r| format!("- {}", r.name)));
            lines.push(String::new());
        }

        if !entry.content.is_empty() {
            lines.push("## Content".to_string());
            lines.push(format!("```{}", registry::fence_language_for(path)));
            lines.push(entry.content.strip_suffix('\n').unwrap_or(&entry.content).to_string());
            lines.push("```".to_string());
            lines.push(String::new());
        }
    }

    let mut output = lines.join("\n");
    if !output.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
    output
}

/// Fenced outline tree. Files without an outline are still listed.
pub fn format_tree(files: &BTreeMap<PathBuf, FileEntry>) -> String {
    let outlines: BTreeMap<PathBuf, Vec<FunctionRecord>> = files
        .iter()
        .map(|(path, entry)| (path.clone(), entry.outline.clone()))
        .collect();
    tree::format_tree(&outlines)
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    files: Vec<JsonFile<'a>>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonFile<'a> {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    lines: usize,
    tokens: usize,
    outline: &'a [FunctionRecord],
}

#[derive(Serialize)]
struct JsonSummary {
    files: usize,
    lines: usize,
    tokens: usize,
    functions: usize,
    classes: usize,
}

/// Outlines and per-file sizes as pretty-printed JSON.
pub fn format_json(files: &BTreeMap<PathBuf, FileEntry>) -> Result<String, OutputError> {
    let json_files: Vec<JsonFile> = files
        .iter()
        .map(|(path, entry)| JsonFile {
            path: display_path(path),
            language: entry.language.map(|l| l.to_string()),
            lines: entry.lines(),
            tokens: count_tokens(&entry.content),
            outline: &entry.outline,
        })
        .collect();

    let records = files.values().flat_map(|entry| entry.outline.iter());
    let classes = records.clone().filter(|r| r.is_class()).count();
    let summary = JsonSummary {
        files: json_files.len(),
        lines: json_files.iter().map(|f| f.lines).sum(),
        tokens: json_files.iter().map(|f| f.tokens).sum(),
        functions: records.count() - classes,
        classes,
    };

    let mut json = serde_json::to_string_pretty(&JsonOutput {
        files: json_files,
        summary,
    })?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Language;

    fn entry(path: &str, content: &str, outline: Vec<FunctionRecord>) -> (PathBuf, FileEntry) {
        let path = PathBuf::from(path);
        let entry = FileEntry {
            language: registry::detect_language(&path),
            content: content.to_string(),
            outline,
        };
        (path, entry)
    }

    fn sample() -> BTreeMap<PathBuf, FileEntry> {
        [
            entry(
                "app.py",
                "class C:\n    def a(self): pass\n",
                vec![FunctionRecord::class("C"), FunctionRecord::method("C", "a")],
            ),
            entry("notes.txt", "", vec![]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_full_content() {
        let output = format_content(&sample());
        let expected = "\
# app.py

## Functions
- C.a

## Content
```python
class C:
    def a(self): pass
```

# notes.txt
";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_full_content_untagged_fence() {
        let files: BTreeMap<_, _> = [entry("LICENSE", "MIT\n", vec![])].into_iter().collect();
        assert_eq!(format_content(&files), "# LICENSE\n\n## Content\n```\nMIT\n```\n");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(format_content(&BTreeMap::new()), "");
        assert_eq!(
            render(&BTreeMap::new(), OutputMode::Tree).unwrap(),
            "```\nNo files found.\n```\n"
        );
    }

    #[test]
    fn test_tree_mode() {
        let output = render(&sample(), OutputMode::Tree).unwrap();
        assert_eq!(
            output,
            "```\n├── app.py\n│   └── C\n│       └── a()\n└── notes.txt\n```\n"
        );
    }

    #[test]
    fn test_json_mode() {
        let output = render(&sample(), OutputMode::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        let files = value["files"].as_array().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0]["path"], "app.py");
        assert_eq!(files[0]["language"], Language::Python.to_string());
        assert_eq!(files[0]["outline"][1]["name"], "C.a");
        assert!(files[1].get("language").is_none());

        assert_eq!(value["summary"]["files"], 2);
        assert_eq!(value["summary"]["functions"], 1);
        assert_eq!(value["summary"]["classes"], 1);
        assert_eq!(value["summary"]["lines"], 2);
    }
}
