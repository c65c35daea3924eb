//! Rust outlines: free functions, `impl` and `trait` members, and
//! placeholders for structs, enums and traits. Inline `mod` blocks are
//! scanned like the top level.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::scan::{self, Abandoned, Depths, Syntax};
use super::{
    cached_regex, is_real_name, push_unique, ExtractOptions, FunctionRecord, OutlineError,
    OutlineExtractor,
};

const LANGUAGE: &str = "rust";

const ITEM_PATTERN: &str = r#"(?m)(?:^|[;{}\]])\s*(?P<decl>(?:pub(?:\s*\([^)]*\))?\s+)?(?:(?:default|unsafe|async|const|extern(?:\s+"[^"]*")?)\s+)*(?P<kind>fn|impl|trait|struct|enum|mod)\b)"#;

const NAME_PATTERN: &str = r"^\s*(?:r#)?(?P<name>[A-Za-z_]\w*)";

/// Outline extractor for `.rs` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustExtractor;

impl OutlineExtractor for RustExtractor {
    fn language_name(&self) -> &'static str {
        LANGUAGE
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".rs"]
    }

    fn try_extract(
        &self,
        source: &str,
        options: &ExtractOptions,
    ) -> Result<Vec<FunctionRecord>, OutlineError> {
        let masked = scan::mask(source, Syntax::Rust).map_err(parse_error)?;
        let (masked, unclosed) = scan::seal_unclosed(masked).map_err(parse_error)?;
        let depths = Depths::new(&masked);

        let headers = block_headers(&masked, &depths)?;
        let abandoned = Abandoned::new(&unclosed, &headers, masked.len());

        let mut scanner = Scanner {
            source,
            masked: &masked,
            depths: &depths,
            abandoned: &abandoned,
            options,
            found: Vec::new(),
        };
        scanner.module(0, masked.len(), 0)?;

        let mut found = scanner.found;
        found.sort_by_key(|(pos, _)| *pos);
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        for (_, record) in found {
            push_unique(&mut records, &mut seen, record);
        }
        Ok(records)
    }
}

fn parse_error(message: String) -> OutlineError {
    OutlineError::Parse {
        language: LANGUAGE,
        message,
    }
}

fn item_regex() -> Result<&'static Regex, OutlineError> {
    static ITEM: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&ITEM, ITEM_PATTERN).map_err(parse_error)
}

fn name_regex() -> Result<&'static Regex, OutlineError> {
    static NAME: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&NAME, NAME_PATTERN).map_err(parse_error)
}

/// Offsets of top-level block items; these end an abandoned region.
fn block_headers(masked: &str, depths: &Depths) -> Result<Vec<usize>, OutlineError> {
    Ok(item_regex()?
        .captures_iter(masked)
        .filter_map(|caps| {
            let decl = caps.name("decl")?;
            let kind = caps.name("kind")?;
            (kind.as_str() != "fn" && depths.at(decl.start()) == 0).then_some(decl.start())
        })
        .collect())
}

/// Index just past the `>` closing the generic list opened at `pos`.
fn skip_generics(text: &str, pos: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(pos) {
        match b {
            b'<' => depth += 1,
            b'>' if i > 0 && bytes[i - 1] == b'-' => {}
            b'>' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            b'{' | b';' => return None,
            _ => {}
        }
    }
    None
}

/// Self type of an `impl` header (the text between `impl` and `{`).
///
/// `impl<T> fmt::Display for Wrapper<T> where T: Clone` gives `Wrapper`.
fn impl_target(header: &str) -> Option<String> {
    let mut text = header.trim_start();
    if text.starts_with('<') {
        text = &text[skip_generics(text, 0)?..];
    }

    let tokens: Vec<&str> = text
        .split_whitespace()
        .take_while(|t| *t != "where")
        .collect();
    let tail = match tokens.iter().rposition(|t| *t == "for") {
        Some(i) => &tokens[i + 1..],
        None => &tokens[..],
    };

    let ty = tail.join(" ");
    let ty = ty.trim_start_matches('&').trim_start();
    let ty = ty.strip_prefix("mut ").unwrap_or(ty);
    let ty = ty.strip_prefix("dyn ").unwrap_or(ty);
    let path = ty.split('<').next().unwrap_or(ty).trim();
    let name = path.rsplit("::").next().unwrap_or(path);

    let valid = name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then(|| name.to_string())
}

struct Scanner<'a> {
    source: &'a str,
    masked: &'a str,
    depths: &'a Depths,
    abandoned: &'a Abandoned,
    options: &'a ExtractOptions,
    found: Vec<(usize, FunctionRecord)>,
}

impl Scanner<'_> {
    /// Items of a module body spanning `start..end` at brace depth `depth`.
    fn module(&mut self, start: usize, end: usize, depth: i32) -> Result<(), OutlineError> {
        let re = item_regex()?;
        let masked = self.masked;
        let hay = &masked[..end];
        let mut at = start;

        while let Some(caps) = re.captures_at(hay, at) {
            at = caps.get(0).map_or(hay.len(), |m| m.end());
            let (Some(decl), Some(kind)) = (caps.name("decl"), caps.name("kind")) else {
                continue;
            };
            if self.depths.at(decl.start()) != depth || self.abandoned.contains(decl.start()) {
                continue;
            }

            match kind.as_str() {
                "fn" => {
                    if let Some(record) = self.function(&caps, None)? {
                        self.found.push((decl.start(), record));
                    }
                }
                "impl" => {
                    let Some((open, close)) = self.body(kind.end()) else {
                        continue;
                    };
                    if let Some(target) = impl_target(&masked[kind.end()..open]) {
                        self.members(open, close, depth + 1, &target)?;
                    }
                    at = at.max(close);
                }
                "trait" => {
                    let Some(name) = self.name_after(kind.end())? else {
                        continue;
                    };
                    self.placeholder(&name, decl.start());
                    if let Some((open, close)) = self.body(kind.end()) {
                        self.members(open, close, depth + 1, &name)?;
                        at = at.max(close);
                    }
                }
                "struct" | "enum" => {
                    if let Some(name) = self.name_after(kind.end())? {
                        self.placeholder(&name, decl.start());
                    }
                }
                "mod" => {
                    let Some((open, close)) = self.body(kind.end()) else {
                        continue;
                    };
                    // `mod name;` has no body; the first brace must follow the name.
                    if !masked[kind.end()..open]
                        .trim()
                        .chars()
                        .all(|c| c.is_alphanumeric() || c == '_' || c == '#')
                    {
                        continue;
                    }
                    self.module(open + 1, close, depth + 1)?;
                    at = at.max(close);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Functions directly inside an `impl` or `trait` body.
    fn members(
        &mut self,
        open: usize,
        close: usize,
        depth: i32,
        owner: &str,
    ) -> Result<(), OutlineError> {
        let re = item_regex()?;
        let masked = self.masked;
        let hay = &masked[..close];
        let mut at = open;

        while let Some(caps) = re.captures_at(hay, at) {
            at = caps.get(0).map_or(hay.len(), |m| m.end());
            let (Some(decl), Some(kind)) = (caps.name("decl"), caps.name("kind")) else {
                continue;
            };
            if kind.as_str() != "fn" || self.depths.at(decl.start()) != depth {
                continue;
            }
            if let Some(record) = self.function(&caps, Some(owner))? {
                self.found.push((decl.start(), record));
            }
        }
        Ok(())
    }

    fn function(
        &self,
        caps: &Captures,
        owner: Option<&str>,
    ) -> Result<Option<FunctionRecord>, OutlineError> {
        let (Some(decl), Some(kind)) = (caps.name("decl"), caps.name("kind")) else {
            return Ok(None);
        };
        let Some(name_caps) = name_regex()?.captures(&self.masked[kind.end()..]) else {
            return Ok(None);
        };
        let Some(name) = name_caps.name("name") else {
            return Ok(None);
        };
        let name_end = kind.end() + name.end();
        let name = name.as_str();
        if !self.options.include_private && !is_real_name(name, false) {
            return Ok(None);
        }

        let mut pos = self.skip_ws(name_end);
        if self.masked.as_bytes().get(pos) == Some(&b'<') {
            let Some(after) = skip_generics(self.masked, pos) else {
                return Ok(None);
            };
            pos = self.skip_ws(after);
        }
        let Some(close) = scan::matching(self.masked, pos, b'(', b')') else {
            return Ok(None);
        };

        let mut record = match owner {
            Some(owner) => FunctionRecord::method(owner, name),
            None => FunctionRecord::function(name),
        }
        .at_line(scan::line_of(self.source, decl.start()))
        .with_comment(scan::leading_comment(self.source, decl.start()));

        let params = scan::parameters(self.source, pos, close);
        if !params.is_empty() {
            record = record.with_parameters(params);
        }
        Ok(Some(record))
    }

    fn placeholder(&mut self, name: &str, start: usize) {
        if !self.options.include_private && !is_real_name(name, false) {
            return;
        }
        let record = FunctionRecord::class(name)
            .at_line(scan::line_of(self.source, start))
            .with_comment(scan::leading_comment(self.source, start));
        self.found.push((start, record));
    }

    fn name_after(&self, pos: usize) -> Result<Option<String>, OutlineError> {
        Ok(name_regex()?
            .captures(&self.masked[pos..])
            .and_then(|caps| caps.name("name"))
            .map(|m| m.as_str().to_string()))
    }

    /// Braces of the block following a header that starts at `pos`.
    fn body(&self, pos: usize) -> Option<(usize, usize)> {
        let (open, b'{') = scan::find_any(self.masked, pos, b"{;")? else {
            return None;
        };
        let close = scan::matching(self.masked, open, b'{', b'}')?;
        Some((open, close))
    }

    fn skip_ws(&self, pos: usize) -> usize {
        let bytes = self.masked.as_bytes();
        let mut pos = pos;
        while bytes.get(pos).is_some_and(|b| b.is_ascii_whitespace()) {
            pos += 1;
        }
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::NodeType;

    fn extract(source: &str) -> Vec<FunctionRecord> {
        RustExtractor.extract_functions(source, &ExtractOptions::default())
    }

    fn names(records: &[FunctionRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_single_function() {
        let records = extract("fn f(x: u32) -> u32 { x }");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "f");
        assert_eq!(records[0].node_type, NodeType::Function);
        assert_eq!(records[0].parameters.as_deref(), Some("x: u32"));
    }

    #[test]
    fn test_impl_one_liner() {
        let records = extract("impl Foo { pub fn new() -> Self { Foo {} } }");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Foo.new");
        assert_eq!(records[0].parameters, None);
    }

    #[test]
    fn test_impl_methods() {
        let source = r#"
    impl MyStruct {
        pub fn new() -> Self {
            Self {}
        }

        pub fn method(&self) {
        }

        fn private_method(&self) {
        }
    }
    "#;
        let records = extract(source);
        assert_eq!(
            names(&records),
            vec!["MyStruct.new", "MyStruct.method", "MyStruct.private_method"]
        );
        assert_eq!(records[1].parameters.as_deref(), Some("&self"));
        assert_eq!(records[1].line_number, Some(7));
    }

    #[test]
    fn test_module_items() {
        let source = r#"
use std::fmt;

/// A point in space.
#[derive(Debug, Clone)]
pub struct Point {
    x: i32,
}

pub enum Shape { Circle, Square }

pub trait Area {
    fn area(&self) -> f64;
    fn describe(&self) -> String { String::from("{") }
}

impl<'a, T: fmt::Debug> fmt::Display for Wrapper<'a, T> where T: Clone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "}}")
    }
}

pub(crate) async fn load<P: AsRef<Path>>(path: P) -> io::Result<()> {
    let c = '{';
    Ok(())
}

fn _internal() {}

mod inner {
    pub fn helper() {}
    fn nested() { fn deeper() {} }
}

mod external;
"#;
        let records = extract(source);
        assert_eq!(
            names(&records),
            vec![
                "Point",
                "Shape",
                "Area",
                "Area.area",
                "Area.describe",
                "Wrapper.fmt",
                "load",
                "helper",
                "nested"
            ]
        );
        assert_eq!(records[0].leading_comment.as_deref(), Some("A point in space."));
        assert!(records[0].is_class());
        assert_eq!(records[6].parameters.as_deref(), Some("path: P"));
    }

    #[test]
    fn test_include_private() {
        let source = "fn _internal() {}\nstruct _Hidden;\n";
        assert!(extract(source).is_empty());
        let all = RustExtractor.extract_functions(source, &ExtractOptions::with_private());
        assert_eq!(names(&all), vec!["_internal", "_Hidden"]);
    }

    #[test]
    fn test_unclosed_impl_skips_members_and_recovers() {
        let source = "impl Broken {\n    fn lost(&self) {}\n\nimpl Fine {\n    fn kept(&self) {}\n}\n";
        let records = extract(source);
        assert_eq!(names(&records), vec!["Fine.kept"]);
    }

    #[test]
    fn test_truncated_char_escape() {
        let records = extract("fn f() {}\nlet c = '\\");
        assert_eq!(names(&records), vec!["f"]);

        extract("impl<'a> Foo<'a> { pub fn new(x: &'a str) -> Self { let c = '\\");
    }

    #[test]
    fn test_impl_target() {
        assert_eq!(impl_target(" Foo ").as_deref(), Some("Foo"));
        assert_eq!(impl_target("<T> Trait for Bar<T> ").as_deref(), Some("Bar"));
        assert_eq!(impl_target(" std::fmt::Debug for crate::a::Baz ").as_deref(), Some("Baz"));
        assert_eq!(impl_target(" Foo where T: Clone ").as_deref(), Some("Foo"));
        assert_eq!(impl_target(" Trait for (A, B) "), None);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let source = "struct A;\nimpl A { fn b(&self) {} }\nfn c() {}\n";
        assert_eq!(extract(source), extract(source));
    }
}
