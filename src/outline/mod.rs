//! Lightweight function/class outlines.
//!
//! Each supported language has a small heuristic extractor that turns raw
//! source text into a flat, source-ordered list of [`FunctionRecord`]s.
//! Methods are named `Parent.member`; containers (classes, contracts,
//! structs, traits) appear as `NodeType::Class` placeholder records so the
//! tree renderer can nest members beneath them.

mod javascript;
mod python;
mod rust;
pub(crate) mod scan;
mod solidity;

use std::cell::RefCell;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tree_sitter::{Node, Parser};

pub use javascript::JavaScriptExtractor;
pub use python::PythonExtractor;
pub use rust::RustExtractor;
pub use solidity::SolidityExtractor;

// Thread-local parser cache. Parser initialization can fail (grammar load),
// so the slot stays empty and the caller gets an error instead of a panic.
thread_local! {
    static PYTHON_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

fn init_python_parser() -> Result<Parser, ()> {
    let mut p = Parser::new();
    p.set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|_| ())?;
    Ok(p)
}

/// Execute a function with a cached Python parser.
pub(crate) fn with_python_parser<F, R>(f: F) -> Result<R, String>
where
    F: FnOnce(&mut Parser) -> R,
{
    PYTHON_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(init_python_parser().map_err(|()| "failed to initialize parser".to_string())?);
        }

        let parser = slot
            .as_mut()
            .ok_or_else(|| "failed to initialize parser".to_string())?;
        Ok(f(parser))
    })
}

/// Find a child node by kind.
pub(crate) fn find_child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    node.children(&mut node.walk()).find(|c| c.kind() == kind)
}

/// Extract node text from content.
pub(crate) fn node_text(node: Node, content: &str) -> String {
    content[node.byte_range()].to_string()
}

/// Compile a pattern once per process.
///
/// A pattern that fails to compile stays cached as `None` and surfaces as an
/// extraction error rather than a panic.
pub(crate) fn cached_regex(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &str,
) -> Result<&'static Regex, String> {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .ok_or_else(|| format!("invalid pattern: {pattern}"))
}

/// Kind of outline record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    #[default]
    Function,
    /// Container placeholder (class, contract, struct, trait).
    Class,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeType::Function => write!(f, "function"),
            NodeType::Class => write!(f, "class"),
        }
    }
}

/// Names that unittest-style suites use for fixtures.
const TEST_FIXTURE_NAMES: &[&str] = &["setUp", "tearDown", "setUpClass", "tearDownClass"];

/// One discovered function, method or container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionRecord {
    /// `name` for free functions and containers, `Parent.member` for members.
    pub name: String,
    /// 1-based line where the declaration starts.
    pub line_number: Option<usize>,
    /// Raw parameter list text, without the surrounding parentheses.
    pub parameters: Option<String>,
    pub leading_comment: Option<String>,
    pub is_export: bool,
    pub is_default_export: bool,
    pub node_type: NodeType,
}

impl FunctionRecord {
    /// Create a function record.
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            line_number: None,
            parameters: None,
            leading_comment: None,
            is_export: false,
            is_default_export: false,
            node_type: NodeType::Function,
        }
    }

    /// Create a container placeholder record.
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            node_type: NodeType::Class,
            ..Self::function(name)
        }
    }

    /// Create a `Parent.member` record.
    pub fn method(parent: &str, member: &str) -> Self {
        Self::function(format!("{parent}.{member}"))
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line_number = Some(line);
        self
    }

    pub fn with_parameters(mut self, parameters: impl Into<String>) -> Self {
        self.parameters = Some(parameters.into());
        self
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.leading_comment = comment;
        self
    }

    /// Mark as exported; `default` also marks it as the default export.
    pub fn exported(mut self, default: bool) -> Self {
        self.is_export = true;
        self.is_default_export = default;
        self
    }

    pub fn is_class(&self) -> bool {
        self.node_type == NodeType::Class
    }

    /// Split `Parent.member` on the first dot.
    pub fn split_member(&self) -> Option<(&str, &str)> {
        self.name.split_once('.')
    }

    /// Name without any `Parent.` qualifier.
    pub fn short_name(&self) -> &str {
        self.split_member().map_or(self.name.as_str(), |(_, member)| member)
    }
}

/// Whether a declaration name is worth keeping.
///
/// Empty names and `_`-prefixed (private/internal) names never are. With
/// `skip_tests`, `test_*` functions and unittest fixture methods are dropped
/// as well. Only the last `.` segment is inspected.
pub fn is_real_name(name: &str, skip_tests: bool) -> bool {
    let member = name.rsplit('.').next().unwrap_or(name);
    if member.is_empty() || member.starts_with('_') {
        return false;
    }
    if skip_tests && (member.starts_with("test_") || TEST_FIXTURE_NAMES.contains(&member)) {
        return false;
    }
    true
}

/// Options for outline extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Keep `_`-prefixed and fixture names that extractors drop by default.
    pub include_private: bool,
}

impl ExtractOptions {
    pub fn with_private() -> Self {
        Self {
            include_private: true,
        }
    }
}

/// Errors raised inside an extractor. Never surfaced past
/// [`OutlineExtractor::extract_functions`].
#[derive(Debug, Error)]
pub enum OutlineError {
    #[error("failed to initialize {language} parser")]
    ParserInit { language: &'static str },

    #[error("{language} parse failed: {message}")]
    Parse {
        language: &'static str,
        message: String,
    },
}

/// Capability shared by every language extractor.
pub trait OutlineExtractor: Send + Sync {
    /// Display name of the language.
    fn language_name(&self) -> &'static str;

    /// Lower-case extensions, with the leading dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Scan `source` and return records in source order.
    fn try_extract(
        &self,
        source: &str,
        options: &ExtractOptions,
    ) -> Result<Vec<FunctionRecord>, OutlineError>;

    /// Case-insensitive suffix match against [`Self::extensions`].
    fn supports_file(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        self.extensions().iter().any(|ext| lower.ends_with(ext))
    }

    /// Scan `source`, swallowing failures into an empty outline.
    fn extract_functions(&self, source: &str, options: &ExtractOptions) -> Vec<FunctionRecord> {
        match self.try_extract(source, options) {
            Ok(records) => records,
            Err(e) => {
                tracing::debug!("outline extraction failed: {e}");
                Vec::new()
            }
        }
    }

    /// Display string for one tree entry. `record.name` is already the
    /// member name when rendering a class child.
    fn format_for_tree(&self, record: &FunctionRecord) -> String {
        default_tree_label(record)
    }
}

/// `name(parameters)`, or `name()` when no parameters were captured.
pub fn default_tree_label(record: &FunctionRecord) -> String {
    format!("{}({})", record.name, record.parameters.as_deref().unwrap_or(""))
}

/// Append `record` unless its name was already seen in this file.
pub(crate) fn push_unique(
    records: &mut Vec<FunctionRecord>,
    seen: &mut std::collections::HashSet<String>,
    record: FunctionRecord,
) {
    if record.name.is_empty() || !seen.insert(record.name.clone()) {
        return;
    }
    records.push(record);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builders() {
        let rec = FunctionRecord::method("Foo", "bar")
            .at_line(3)
            .with_parameters("x, y");
        assert_eq!(rec.name, "Foo.bar");
        assert_eq!(rec.line_number, Some(3));
        assert_eq!(rec.node_type, NodeType::Function);
        assert_eq!(rec.split_member(), Some(("Foo", "bar")));
        assert_eq!(rec.short_name(), "bar");

        let class = FunctionRecord::class("Foo");
        assert!(class.is_class());
        assert_eq!(class.split_member(), None);
    }

    #[test]
    fn test_split_on_first_dot() {
        let rec = FunctionRecord::function("A.b.c");
        assert_eq!(rec.split_member(), Some(("A", "b.c")));
    }

    #[test]
    fn test_is_real_name() {
        assert!(is_real_name("run", false));
        assert!(is_real_name("Foo.run", true));
        assert!(!is_real_name("", false));
        assert!(!is_real_name("_helper", false));
        assert!(!is_real_name("Foo._helper", false));
        assert!(is_real_name("test_parse", false));
        assert!(!is_real_name("test_parse", true));
        assert!(!is_real_name("Case.setUp", true));
        assert!(!is_real_name("tearDown", true));
    }

    #[test]
    fn test_default_tree_label() {
        let rec = FunctionRecord::function("f");
        assert_eq!(default_tree_label(&rec), "f()");
        let rec = rec.with_parameters("a, b");
        assert_eq!(default_tree_label(&rec), "f(a, b)");
    }

    #[test]
    fn test_node_type_display() {
        assert_eq!(NodeType::Function.to_string(), "function");
        assert_eq!(NodeType::Class.to_string(), "class");
    }

    const SAMPLES: &[&str] = &[
        "import os\n\n@dataclass\nclass Outer:\n    \"\"\"Doc with \\\"quotes\\\" and ünïcode.\"\"\"\n    class Inner:\n        def m(self, x=\"{\"):\n            return f\"{x!r}\\n\"\n\n    async def run(self, *args, **kw):\n        s = '\\''  # comment {\n        return b'\\x00'\n\ndef _private(): pass\n",
        "/** Greets 👋 */\nexport default class Greeter {\n  constructor(name = 'a\\'b') { this.name = name; }\n  greet() { return `Hi ${this.name} {`; }\n}\nexport const add = (a, b) => a + b;\nconst re = /[{}]/g;\nfunction tail(s = \"\\\"}\") { return s; }\n",
        "// SPDX\npragma solidity ^0.8.0;\n/* block { */\ncontract Token {\n    string name = \"Tøken \\\"{\";\n    constructor() {}\n    function transfer(address to, uint256 v) public returns (bool) { return true; }\n    function _burn() internal {}\n}\nfunction free(uint x) pure returns (uint) { return x; }\n",
        "/// Docs with é.\nimpl<'a, T: Clone> Trait<'a> for Foo<T> where T: 'a {\n    pub fn new(s: &'a str) -> Self { let c = '\\u{1F600}'; let d = '\\''; Foo(r#\"{ \"raw\" }\"#, b\"\\x7b\") }\n    /* outer /* nested { */ */\n    fn esc(&self) -> char { '\\\\' }\n}\nfn free<'b>(x: &'b [u8]) -> &'b [u8] { x }\n",
    ];

    fn prefixes(source: &str) -> impl Iterator<Item = &str> {
        source
            .char_indices()
            .map(move |(i, _)| &source[..i])
            .chain(std::iter::once(source))
    }

    #[test]
    fn test_every_prefix_extracts_without_panicking() {
        let options = [ExtractOptions::default(), ExtractOptions::with_private()];
        for lang in crate::registry::Language::ALL {
            let extractor = lang.extractor();
            for sample in SAMPLES {
                for prefix in prefixes(sample) {
                    for opts in &options {
                        let first = extractor.extract_functions(prefix, opts);
                        let second = extractor.extract_functions(prefix, opts);
                        assert_eq!(first, second, "{lang} not repeatable on {prefix:?}");
                        assert!(first.iter().all(|r| !r.name.is_empty()));
                    }
                }
            }
        }
    }

    #[test]
    fn test_full_samples_produce_outlines() {
        use crate::registry::Language;

        for (lang, sample) in Language::ALL.into_iter().zip(SAMPLES) {
            let records = lang.extractor().extract_functions(sample, &ExtractOptions::default());
            assert!(!records.is_empty(), "{lang} found nothing");
        }
    }

    #[test]
    fn test_push_unique() {
        let mut records = Vec::new();
        let mut seen = std::collections::HashSet::new();
        push_unique(&mut records, &mut seen, FunctionRecord::function("a"));
        push_unique(&mut records, &mut seen, FunctionRecord::function("a").at_line(9));
        push_unique(&mut records, &mut seen, FunctionRecord::function(""));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line_number, None);
    }
}
