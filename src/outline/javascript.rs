//! JavaScript and TypeScript outlines.
//!
//! Declarations are found with regexes over the masked source; parameter
//! lists and class bodies are delimited by explicit bracket matching. Only
//! declarations at the top level of the module (and members directly inside
//! a top-level class body) are reported.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::scan::{self, Depths, Syntax};
use super::{
    cached_regex, default_tree_label, push_unique, ExtractOptions, FunctionRecord, OutlineError,
    OutlineExtractor,
};

const LANGUAGE: &str = "javascript";

const FUNCTION_PATTERN: &str = r"(?m)(?:^|[;{}])\s*(?P<decl>(?P<export>export\s+(?P<default>default\s+)?)?(?:declare\s+)?(?:async\s+)?function\b\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)\s*(?:<[^<>(]*>)?\s*)\(";

const VARIABLE_PATTERN: &str = r"(?m)(?:^|[;{}])\s*(?P<decl>(?P<export>export\s+(?P<default>default\s+)?)?(?:declare\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::[^=;]+)?=)";

const CLASS_PATTERN: &str = r"(?m)(?:^|[;{}])\s*(?P<decl>(?P<export>export\s+(?P<default>default\s+)?)?(?:declare\s+)?(?:abstract\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*))";

const MEMBER_PATTERN: &str = r"(?m)(?:^|[;{}])\s*(?P<decl>(?:(?:public|private|protected|static|async|readonly|override|abstract|get|set|declare|accessor)\s+)*\*?\s*(?P<name>#?[A-Za-z_$][\w$]*)\s*(?:<[^<>(]*>)?\s*)(?P<tail>\(|(?::[^=;{}()]+)?=)";

/// Right-hand side of an assignment that defines a function.
const VALUE_PATTERN: &str = r"^\s*(?:async\b\s*)?(?:(?P<func>function\b\s*\*?\s*(?:[A-Za-z_$][\w$]*)?\s*)\(|(?P<paren>\()|(?P<bare>[A-Za-z_$][\w$]*)\s*=>)";

const EXPORT_DEFAULT_PATTERN: &str =
    r"(?m)(?:^|[;{}])\s*(?P<export>export)\s+default\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?:;|$)";

const EXPORT_LIST_PATTERN: &str = r"(?m)(?:^|[;{}])\s*(?P<export>export)\s*\{(?P<items>[^{}]*)\}";

const MEMBER_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "super", "new", "await",
    "typeof", "else", "do",
];

/// Outline extractor for JavaScript and TypeScript modules.
#[derive(Debug, Default, Clone, Copy)]
pub struct JavaScriptExtractor;

impl OutlineExtractor for JavaScriptExtractor {
    fn language_name(&self) -> &'static str {
        LANGUAGE
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs"]
    }

    fn try_extract(
        &self,
        source: &str,
        _options: &ExtractOptions,
    ) -> Result<Vec<FunctionRecord>, OutlineError> {
        let masked = scan::mask(source, Syntax::CLike { backticks: true }).map_err(parse_error)?;
        let depths = Depths::new(&masked);
        if !depths.is_balanced() {
            return Err(parse_error("unbalanced braces".to_string()));
        }

        let mut scanner = Scanner {
            source,
            masked: &masked,
            depths: &depths,
            found: Vec::new(),
        };
        scanner.functions()?;
        scanner.variables()?;
        scanner.classes()?;
        scanner.export_statements()?;

        let mut found = scanner.found;
        found.sort_by_key(|(pos, _)| *pos);

        let mut records = Vec::new();
        let mut seen = HashSet::new();
        for (_, record) in found {
            push_unique(&mut records, &mut seen, record);
        }
        Ok(records)
    }

    fn format_for_tree(&self, record: &FunctionRecord) -> String {
        let label = default_tree_label(record);
        match (record.is_export, record.is_default_export) {
            (true, true) => format!("export default {label}"),
            (true, false) => format!("export {label}"),
            _ => label,
        }
    }
}

fn parse_error(message: String) -> OutlineError {
    OutlineError::Parse {
        language: LANGUAGE,
        message,
    }
}

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Result<&'static Regex, OutlineError> {
    cached_regex(cell, pattern).map_err(parse_error)
}

/// Where the parameters of a function value sit in the source.
enum Params {
    /// Byte offsets of `(` and its matching `)`.
    Parens(usize, usize),
    /// A single unparenthesized arrow parameter.
    Bare(usize, usize),
}

struct Scanner<'a> {
    source: &'a str,
    masked: &'a str,
    depths: &'a Depths,
    found: Vec<(usize, FunctionRecord)>,
}

impl Scanner<'_> {
    fn functions(&mut self) -> Result<(), OutlineError> {
        static FUNCTION: OnceLock<Option<Regex>> = OnceLock::new();
        let re = compiled(&FUNCTION, FUNCTION_PATTERN)?;

        for caps in re.captures_iter(self.masked) {
            let (Some(decl), Some(name)) = (caps.name("decl"), caps.name("name")) else {
                continue;
            };
            if self.depths.at(decl.start()) != 0 {
                continue;
            }
            let open = caps.get(0).map_or(0, |m| m.end() - 1);
            let Some(close) = scan::matching(self.masked, open, b'(', b')') else {
                continue;
            };
            // Overloads and ambient declarations have no body.
            if scan::find_any(self.masked, close + 1, b"{;").map(|(_, b)| b) != Some(b'{') {
                continue;
            }

            let record = self
                .declared(FunctionRecord::function(name.as_str()), decl.start(), &caps)
                .with_parameters(scan::parameters(self.source, open, close));
            self.found.push((decl.start(), record));
        }
        Ok(())
    }

    fn variables(&mut self) -> Result<(), OutlineError> {
        static VARIABLE: OnceLock<Option<Regex>> = OnceLock::new();
        let re = compiled(&VARIABLE, VARIABLE_PATTERN)?;

        for caps in re.captures_iter(self.masked) {
            let (Some(decl), Some(name)) = (caps.name("decl"), caps.name("name")) else {
                continue;
            };
            if self.depths.at(decl.start()) != 0 {
                continue;
            }
            let Some(params) = self.function_value(decl.end())? else {
                continue;
            };

            let record = self.declared(FunctionRecord::function(name.as_str()), decl.start(), &caps);
            let record = self.with_params(record, params);
            self.found.push((decl.start(), record));
        }
        Ok(())
    }

    fn classes(&mut self) -> Result<(), OutlineError> {
        static CLASS: OnceLock<Option<Regex>> = OnceLock::new();
        let re = compiled(&CLASS, CLASS_PATTERN)?;

        for caps in re.captures_iter(self.masked) {
            let (Some(decl), Some(name)) = (caps.name("decl"), caps.name("name")) else {
                continue;
            };
            if self.depths.at(decl.start()) != 0 {
                continue;
            }
            let Some((open, b'{')) = scan::find_any(self.masked, name.end(), b"{;") else {
                continue;
            };
            let Some(close) = scan::matching(self.masked, open, b'{', b'}') else {
                continue;
            };

            let record = self.declared(FunctionRecord::class(name.as_str()), decl.start(), &caps);
            self.found.push((decl.start(), record));
            self.members(name.as_str(), open, close)?;
        }
        Ok(())
    }

    fn members(&mut self, class: &str, open: usize, close: usize) -> Result<(), OutlineError> {
        static MEMBER: OnceLock<Option<Regex>> = OnceLock::new();
        let re = compiled(&MEMBER, MEMBER_PATTERN)?;

        let masked = self.masked;
        let body = &masked[..close];
        let body_depth = self.depths.at(open) + 1;
        let mut at = open;

        while let Some(caps) = re.captures_at(body, at) {
            at = caps.get(0).map_or(body.len(), |m| m.end());
            let (Some(decl), Some(name), Some(tail)) =
                (caps.name("decl"), caps.name("name"), caps.name("tail"))
            else {
                continue;
            };
            if self.depths.at(decl.start()) != body_depth
                || MEMBER_KEYWORDS.contains(&name.as_str())
            {
                continue;
            }

            let params = if tail.as_str() == "(" {
                let Some(end) = scan::matching(self.masked, tail.start(), b'(', b')') else {
                    continue;
                };
                if scan::find_any(self.masked, end + 1, b"{;").map(|(_, b)| b) != Some(b'{') {
                    continue;
                }
                Params::Parens(tail.start(), end)
            } else {
                match self.function_value(tail.end())? {
                    Some(params) => params,
                    None => continue,
                }
            };

            let record = FunctionRecord::method(class, name.as_str())
                .at_line(scan::line_of(self.source, decl.start()))
                .with_comment(scan::leading_comment(self.source, decl.start()));
            let record = self.with_params(record, params);
            self.found.push((decl.start(), record));
        }
        Ok(())
    }

    /// `export default name;` and `export { a, b as default }` after the fact.
    fn export_statements(&mut self) -> Result<(), OutlineError> {
        static DEFAULT: OnceLock<Option<Regex>> = OnceLock::new();
        static LIST: OnceLock<Option<Regex>> = OnceLock::new();
        let default_re = compiled(&DEFAULT, EXPORT_DEFAULT_PATTERN)?;
        let list_re = compiled(&LIST, EXPORT_LIST_PATTERN)?;

        let mut exports: Vec<(String, bool)> = Vec::new();
        for caps in default_re.captures_iter(self.masked) {
            if self.top_level(&caps) {
                if let Some(name) = caps.name("name") {
                    exports.push((name.as_str().to_string(), true));
                }
            }
        }
        for caps in list_re.captures_iter(self.masked) {
            if !self.top_level(&caps) {
                continue;
            }
            let Some(items) = caps.name("items") else {
                continue;
            };
            for item in items.as_str().split(',') {
                let words: Vec<&str> = item.split_whitespace().collect();
                match words.as_slice() {
                    [local] => exports.push((local.to_string(), false)),
                    [local, "as", alias] => exports.push((local.to_string(), *alias == "default")),
                    _ => {}
                }
            }
        }

        for (name, default) in exports {
            for (_, record) in self.found.iter_mut() {
                if record.name == name && record.split_member().is_none() {
                    record.is_export = true;
                    record.is_default_export |= default;
                }
            }
        }
        Ok(())
    }

    fn top_level(&self, caps: &Captures) -> bool {
        caps.name("export")
            .is_some_and(|m| self.depths.at(m.start()) == 0)
    }

    /// Parameters of a function or arrow expression starting at `start`.
    fn function_value(&self, start: usize) -> Result<Option<Params>, OutlineError> {
        static VALUE: OnceLock<Option<Regex>> = OnceLock::new();
        let re = compiled(&VALUE, VALUE_PATTERN)?;

        let Some(caps) = re.captures(&self.masked[start..]) else {
            return Ok(None);
        };
        if let Some(bare) = caps.name("bare") {
            return Ok(Some(Params::Bare(start + bare.start(), start + bare.end())));
        }

        let open = start + caps.get(0).map_or(0, |m| m.end() - 1);
        let Some(close) = scan::matching(self.masked, open, b'(', b')') else {
            return Ok(None);
        };
        if caps.name("paren").is_some() && !arrow_follows(&self.masked[close + 1..]) {
            return Ok(None);
        }
        Ok(Some(Params::Parens(open, close)))
    }

    fn declared(&self, record: FunctionRecord, start: usize, caps: &Captures) -> FunctionRecord {
        let record = record
            .at_line(scan::line_of(self.source, start))
            .with_comment(scan::leading_comment(self.source, start));
        if caps.name("export").is_some() {
            record.exported(caps.name("default").is_some())
        } else {
            record
        }
    }

    fn with_params(&self, record: FunctionRecord, params: Params) -> FunctionRecord {
        match params {
            Params::Parens(open, close) => {
                record.with_parameters(scan::parameters(self.source, open, close))
            }
            Params::Bare(start, end) => record.with_parameters(&self.source[start..end]),
        }
    }
}

/// `=>`, optionally after a return type annotation.
fn arrow_follows(rest: &str) -> bool {
    let rest = rest.trim_start();
    if rest.starts_with("=>") {
        return true;
    }
    rest.starts_with(':')
        && rest
            .find("=>")
            .is_some_and(|i| !rest[..i].contains([';', '{', '}']))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::NodeType;

    fn extract(source: &str) -> Vec<FunctionRecord> {
        JavaScriptExtractor.extract_functions(source, &ExtractOptions::default())
    }

    fn find<'a>(records: &'a [FunctionRecord], name: &str) -> &'a FunctionRecord {
        records
            .iter()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("no record named {name}"))
    }

    #[test]
    fn test_single_function() {
        let records = extract("function f(a, b) { return a + b; }");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "f");
        assert_eq!(records[0].node_type, NodeType::Function);
        assert_eq!(records[0].parameters.as_deref(), Some("a, b"));
    }

    #[test]
    fn test_export_default_function() {
        let records = extract("export default function hello() {}");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "hello");
        assert!(records[0].is_export);
        assert!(records[0].is_default_export);
    }

    #[test]
    fn test_javascript_module() {
        let source = r#"
/**
 * User service for managing application users
 */
class UserService {
    constructor(config) {
        this.config = config;
    }

    /**
     * Add a new user to the system
     */
    addUser(user) {
        if (user) { this.save(user); }
    }
}

// Utility function
function formatUser(user) {
    return `${user.name} {`;
}

// Arrow function
const processUser = user => {
    console.log(formatUser(user));
};
"#;
        let records = extract(source);
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "UserService",
                "UserService.constructor",
                "UserService.addUser",
                "formatUser",
                "processUser"
            ]
        );

        let class = find(&records, "UserService");
        assert!(class.is_class());
        assert_eq!(
            class.leading_comment.as_deref(),
            Some("User service for managing application users")
        );
        assert_eq!(class.line_number, Some(5));

        let add = find(&records, "UserService.addUser");
        assert_eq!(add.parameters.as_deref(), Some("user"));
        assert_eq!(add.leading_comment.as_deref(), Some("Add a new user to the system"));
        assert_eq!(find(&records, "processUser").parameters.as_deref(), Some("user"));
        assert_eq!(
            find(&records, "formatUser").leading_comment.as_deref(),
            Some("Utility function")
        );
    }

    #[test]
    fn test_typescript_module() {
        let source = r#"
interface User {
    name: string;
    age: number;
}

export class UserService {
    private users: User[] = [];

    addUser(user: User): void {
        this.users.push(user);
    }

    getUsers(): User[] {
        return this.users;
    }

    private onChange = (event: Event): void => {
        this.users = [];
    };
}

export function formatUser(user: User): string {
    return `${user.name} (${user.age})`;
}

export function overloaded(a: string): string;
export function overloaded(a: any): any {
    return a;
}

const processUser = async (user: User): Promise<void> => {
    console.log(formatUser(user));
};
export default processUser;
"#;
        let records = extract(source);
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "UserService",
                "UserService.addUser",
                "UserService.getUsers",
                "UserService.onChange",
                "formatUser",
                "overloaded",
                "processUser"
            ]
        );

        let class = find(&records, "UserService");
        assert!(class.is_export && !class.is_default_export);
        assert!(!find(&records, "UserService.addUser").is_export);
        assert_eq!(
            find(&records, "UserService.addUser").parameters.as_deref(),
            Some("user: User")
        );
        assert_eq!(
            find(&records, "UserService.onChange").parameters.as_deref(),
            Some("event: Event")
        );
        assert_eq!(find(&records, "overloaded").parameters.as_deref(), Some("a: any"));

        let process = find(&records, "processUser");
        assert!(process.is_export && process.is_default_export);
        assert_eq!(process.parameters.as_deref(), Some("user: User"));
    }

    #[test]
    fn test_export_list() {
        let source = "function a() {}\nfunction b() {}\nexport { a, b as default };\n";
        let records = extract(source);
        assert!(records[0].is_export && !records[0].is_default_export);
        assert!(records[1].is_export && records[1].is_default_export);
    }

    #[test]
    fn test_nested_functions_are_not_listed() {
        let source = "function outer() {\n  function inner() {}\n  const x = () => 1;\n}\n";
        let records = extract(source);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "outer");
    }

    #[test]
    fn test_non_function_values_are_skipped() {
        let source = "const total = (a + b) * 2;\nlet name = 'x';\nconst run = function () {};\n";
        let records = extract(source);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "run");
    }

    #[test]
    fn test_declarations_in_strings_and_comments_are_ignored() {
        let source = "// function fake() {}\nconst s = \"function alsoFake() {}\";\nfunction real() {}\n";
        let records = extract(source);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "real");
    }

    #[test]
    fn test_unbalanced_braces_yield_nothing() {
        assert!(extract("function f() {\n  if (x) {\n").is_empty());
        assert!(extract("class A { m() {} } }").is_empty());
    }

    #[test]
    fn test_format_for_tree_prefixes_exports() {
        let plain = FunctionRecord::function("f").with_parameters("a");
        assert_eq!(JavaScriptExtractor.format_for_tree(&plain), "f(a)");
        let named = FunctionRecord::function("f").exported(false);
        assert_eq!(JavaScriptExtractor.format_for_tree(&named), "export f()");
        let default = FunctionRecord::function("f").exported(true);
        assert_eq!(JavaScriptExtractor.format_for_tree(&default), "export default f()");
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let source = "export class A { b() {} }\nconst c = () => {};\n";
        assert_eq!(extract(source), extract(source));
    }

    #[test]
    fn test_supports_file() {
        for name in ["a.js", "a.jsx", "a.ts", "B.TSX", "a.mjs"] {
            assert!(JavaScriptExtractor.supports_file(name), "{name}");
        }
        assert!(!JavaScriptExtractor.supports_file("a.py"));
    }
}
