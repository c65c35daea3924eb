//! Local import discovery and resolution.
//!
//! Reads the import statements of Python and JavaScript/TypeScript files and
//! maps them to files inside the project. Third-party and standard-library
//! modules simply fail to resolve. Results are memoized in an
//! [`ImportCache`] owned by the caller.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use smallvec::{smallvec, SmallVec};
use tracing::{debug, warn};
use tree_sitter::Node;

use crate::outline::scan::{self, Syntax};
use crate::outline::{cached_regex, node_text, with_python_parser};
use crate::registry::{detect_language, Language};

/// Extensions tried, in order, for an extensionless JS/TS specifier.
const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

const JS_IMPORT_PATTERN: &str = r#"\b(?:from|import|require)\s*\(?\s*["']"#;

/// Module names imported by a Python source, as written.
///
/// `from pkg import name` yields both `pkg` and `pkg.name`, since `name` may
/// be a submodule. Relative imports keep their leading dots. Sources that do
/// not parse yield what the parser could recover.
pub fn python_imports(source: &str) -> Vec<String> {
    let result = with_python_parser(|parser| {
        let Some(tree) = parser.parse(source, None) else {
            return Vec::new();
        };
        let mut modules = Vec::new();
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "import_statement" => {
                    let mut cursor = node.walk();
                    for name in node.children_by_field_name("name", &mut cursor) {
                        modules.push(dotted(name, source));
                    }
                }
                "import_from_statement" => {
                    let Some(module) = node.child_by_field_name("module_name") else {
                        continue;
                    };
                    let module = node_text(module, source);
                    let mut cursor = node.walk();
                    for name in node.children_by_field_name("name", &mut cursor) {
                        let name = dotted(name, source);
                        if module.ends_with('.') {
                            modules.push(format!("{module}{name}"));
                        } else {
                            modules.push(format!("{module}.{name}"));
                        }
                    }
                    modules.push(module);
                }
                _ => {
                    let mut cursor = node.walk();
                    stack.extend(node.named_children(&mut cursor));
                }
            }
        }
        modules
    });

    match result {
        Ok(mut modules) => {
            modules.sort();
            modules.dedup();
            modules
        }
        Err(err) => {
            debug!("python import scan failed: {err}");
            Vec::new()
        }
    }
}

/// The module path of an `import` target, without any `as` alias.
fn dotted(node: Node, source: &str) -> String {
    match node.kind() {
        "aliased_import" => node
            .child_by_field_name("name")
            .map_or_else(String::new, |name| node_text(name, source)),
        _ => node_text(node, source),
    }
}

/// Module specifiers of `import ... from`, bare `import`, `require()` and
/// dynamic `import()` in a JS/TS source. Comments are ignored.
pub fn javascript_imports(source: &str) -> Vec<String> {
    static IMPORT: OnceLock<Option<Regex>> = OnceLock::new();
    let (re, masked) = match (
        cached_regex(&IMPORT, JS_IMPORT_PATTERN),
        scan::mask(source, Syntax::CLike { backticks: true }),
    ) {
        (Ok(re), Ok(masked)) => (re, masked),
        (Err(err), _) | (_, Err(err)) => {
            debug!("javascript import scan failed: {err}");
            return Vec::new();
        }
    };

    let mut specifiers = Vec::new();
    for found in re.find_iter(&masked) {
        let open = found.end() - 1;
        let quote = masked.as_bytes()[open];
        // string interiors are blanked, so the next quote closes this one
        if let Some(len) = masked[open + 1..].bytes().position(|b| b == quote) {
            specifiers.push(source[open + 1..open + 1 + len].to_string());
        }
    }
    specifiers.sort();
    specifiers.dedup();
    specifiers
}

/// Memoized import lookups for one run.
#[derive(Debug, Default)]
pub struct ImportCache {
    imports: HashMap<PathBuf, Vec<String>>,
    resolved: HashMap<(PathBuf, String), Option<PathBuf>>,
}

impl ImportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files whose imports have been read.
    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }

    /// Imports of `path`, read and parsed on first use. Unreadable files and
    /// unsupported languages have none.
    pub fn imports_of(&mut self, path: &Path) -> &[String] {
        self.imports
            .entry(path.to_path_buf())
            .or_insert_with(|| read_imports(path))
    }

    /// Resolve `module` imported from `file` to a local file, searching no
    /// higher than `root`.
    pub fn resolve(&mut self, file: &Path, module: &str, root: &Path) -> Option<PathBuf> {
        let dir = normalize(file.parent().unwrap_or(Path::new("")));
        let key = (dir, module.to_string());
        if let Some(hit) = self.resolved.get(&key) {
            return hit.clone();
        }

        let found = match detect_language(file) {
            Some(Language::Python) => resolve_python(&key.0, module, &normalize(root)),
            Some(Language::JavaScript) => resolve_script(&key.0, module),
            _ => None,
        };
        self.resolved.insert(key, found.clone());
        found
    }

    /// Local files reachable from `files` through imports, transitively.
    /// The inputs themselves are not included; the result is sorted.
    pub fn related_files(&mut self, files: &[PathBuf], root: &Path) -> Vec<PathBuf> {
        let start: HashSet<PathBuf> = files.iter().map(|f| normalize(f)).collect();
        let mut visited = start.clone();
        let mut queue: VecDeque<PathBuf> = start.iter().cloned().collect();
        let mut related = BTreeSet::new();

        while let Some(file) = queue.pop_front() {
            let modules = self.imports_of(&file).to_vec();
            for module in modules {
                let Some(target) = self.resolve(&file, &module, root) else {
                    continue;
                };
                if visited.insert(target.clone()) {
                    debug!("{} imports {}", file.display(), target.display());
                    related.insert(target.clone());
                    queue.push_back(target);
                }
            }
        }

        related.into_iter().collect()
    }
}

fn read_imports(path: &Path) -> Vec<String> {
    let language = detect_language(path);
    if !matches!(language, Some(Language::Python | Language::JavaScript)) {
        return Vec::new();
    }
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            warn!("could not read {}: {err}", path.display());
            return Vec::new();
        }
    };
    match language {
        Some(Language::Python) => python_imports(&source),
        _ => javascript_imports(&source),
    }
}

fn resolve_python(dir: &Path, module: &str, root: &Path) -> Option<PathBuf> {
    let rest = module.trim_start_matches('.');
    let dots = module.len() - rest.len();

    let search: SmallVec<[PathBuf; 4]> = if dots > 0 {
        // `.` is the importing package, each further dot one level up
        let mut base = dir;
        for _ in 1..dots {
            base = base.parent()?;
        }
        smallvec![base.to_path_buf()]
    } else if dir.starts_with(root) {
        dir.ancestors()
            .take_while(|a| a.starts_with(root))
            .map(Path::to_path_buf)
            .collect()
    } else {
        smallvec![dir.to_path_buf()]
    };

    let relative: PathBuf = rest.split('.').filter(|p| !p.is_empty()).collect();
    for base in &search {
        if rest.is_empty() {
            let init = base.join("__init__.py");
            if init.is_file() {
                return Some(init);
            }
            continue;
        }
        let target = base.join(&relative);
        let module_file = target.with_extension("py");
        if module_file.is_file() {
            return Some(module_file);
        }
        let package = target.join("__init__.py");
        if package.is_file() {
            return Some(package);
        }
    }
    None
}

fn resolve_script(dir: &Path, specifier: &str) -> Option<PathBuf> {
    if !(specifier.starts_with("./") || specifier.starts_with("../")) {
        return None;
    }
    let target = normalize(&dir.join(specifier));
    if target.is_file() {
        return Some(target);
    }

    let name = target.file_name()?.to_string_lossy().into_owned();
    let with_ext = SCRIPT_EXTENSIONS
        .iter()
        .map(|ext| target.with_file_name(format!("{name}.{ext}")));
    let index = SCRIPT_EXTENSIONS
        .iter()
        .map(|ext| target.join(format!("index.{ext}")));
    with_ext.chain(index).find(|candidate| candidate.is_file())
}

/// Resolve `.` and `..` components lexically.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_python_imports() {
        let source = "\
import os, pkg.sub as s
from .sibling import helper
from .. import parent
from app.models import User

def f():
    import lazy
";
        assert_eq!(
            python_imports(source),
            vec![
                "..",
                "..parent",
                ".sibling",
                ".sibling.helper",
                "app.models",
                "app.models.User",
                "lazy",
                "os",
                "pkg.sub"
            ]
        );
    }

    #[test]
    fn test_javascript_imports() {
        let source = r#"
import React from "react";
import { a } from './a';
import './side-effect.css';
const b = require("../b");
// import ignored from './commented';
const lazy = () => import('./lazy');
export { c } from "./c";
"#;
        assert_eq!(
            javascript_imports(source),
            vec!["../b", "./a", "./c", "./lazy", "./side-effect.css", "react"]
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("./src/../lib/x.js")), PathBuf::from("lib/x.js"));
        assert_eq!(normalize(Path::new("../up")), PathBuf::from("../up"));
    }

    #[test]
    fn test_resolve_python_and_script() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app/models")).unwrap();
        fs::write(root.join("app/models/__init__.py"), "").unwrap();
        fs::write(root.join("app/util.py"), "").unwrap();
        fs::write(root.join("app/main.py"), "").unwrap();
        fs::create_dir_all(root.join("web/lib")).unwrap();
        fs::write(root.join("web/lib/index.ts"), "").unwrap();
        fs::write(root.join("web/app.js"), "").unwrap();

        let mut cache = ImportCache::new();
        let main = root.join("app/main.py");
        assert_eq!(cache.resolve(&main, "util", root), Some(root.join("app/util.py")));
        assert_eq!(cache.resolve(&main, ".util", root), Some(root.join("app/util.py")));
        assert_eq!(
            cache.resolve(&main, "app.models", root),
            Some(root.join("app/models/__init__.py"))
        );
        assert_eq!(cache.resolve(&main, "os", root), None);

        let app = root.join("web/app.js");
        assert_eq!(cache.resolve(&app, "./lib", root), Some(root.join("web/lib/index.ts")));
        assert_eq!(cache.resolve(&app, "react", root), None);
    }

    #[test]
    fn test_related_files_follows_transitively() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("main.py"), "from service import run\n").unwrap();
        fs::write(root.join("service.py"), "import helpers\nimport requests\n").unwrap();
        fs::write(root.join("helpers.py"), "import service\n").unwrap();
        fs::write(root.join("unused.py"), "").unwrap();

        let mut cache = ImportCache::new();
        let related = cache.related_files(&[root.join("main.py")], root);
        assert_eq!(related, vec![root.join("helpers.py"), root.join("service.py")]);
        assert_eq!(cache.len(), 3);
    }
}
