//! Python outlines from the tree-sitter syntax tree.

use std::collections::HashSet;

use tree_sitter::Node;

use super::{
    find_child_by_kind, is_real_name, node_text, push_unique, with_python_parser, ExtractOptions,
    FunctionRecord, OutlineError, OutlineExtractor, TEST_FIXTURE_NAMES,
};

const LANGUAGE: &str = "python";

/// Outline extractor for `.py` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonExtractor;

impl OutlineExtractor for PythonExtractor {
    fn language_name(&self) -> &'static str {
        LANGUAGE
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".py"]
    }

    fn try_extract(
        &self,
        source: &str,
        options: &ExtractOptions,
    ) -> Result<Vec<FunctionRecord>, OutlineError> {
        let parsed = with_python_parser(|parser| {
            let tree = parser.parse(source, None).ok_or_else(|| OutlineError::Parse {
                language: LANGUAGE,
                message: "parser returned no tree".to_string(),
            })?;

            let root = tree.root_node();
            if root.has_error() {
                return Err(OutlineError::Parse {
                    language: LANGUAGE,
                    message: format!("syntax error near line {}", first_error_line(root)),
                });
            }

            let mut walker = Walker {
                source,
                options,
                records: Vec::new(),
                seen: HashSet::new(),
            };
            walker.visit_block(root, None);
            Ok(walker.records)
        });

        parsed.map_err(|_| OutlineError::ParserInit { language: LANGUAGE })?
    }
}

fn first_error_line(root: Node) -> usize {
    let mut cursor = root.walk();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return node.start_position().row + 1;
        }
        stack.extend(node.children(&mut cursor).filter(|c| c.has_error()));
    }
    root.start_position().row + 1
}

struct Walker<'a> {
    source: &'a str,
    options: &'a ExtractOptions,
    records: Vec<FunctionRecord>,
    seen: HashSet<String>,
}

impl Walker<'_> {
    /// Visit the statements of a module or class body. `class` is the
    /// innermost enclosing class name.
    fn visit_block(&mut self, block: Node, class: Option<&str>) {
        let mut cursor = block.walk();
        for child in block.children(&mut cursor) {
            let definition = if child.kind() == "decorated_definition" {
                match child.child_by_field_name("definition") {
                    Some(def) => def,
                    None => continue,
                }
            } else {
                child
            };

            match definition.kind() {
                "function_definition" => self.visit_function(definition, class),
                "class_definition" => self.visit_class(definition),
                _ => {}
            }
        }
    }

    fn visit_function(&mut self, node: Node, class: Option<&str>) {
        let Some(name) = node
            .child_by_field_name("name")
            .map(|n| node_text(n, self.source))
        else {
            return;
        };
        if !self.keep(&name) {
            return;
        }

        let mut record = match class {
            Some(parent) => FunctionRecord::method(parent, &name),
            None => FunctionRecord::function(name),
        }
        .at_line(node.start_position().row + 1)
        .with_comment(docstring(node, self.source));

        if let Some(params) = node.child_by_field_name("parameters") {
            let text = parameter_list(params, self.source, class.is_some());
            if !text.is_empty() {
                record = record.with_parameters(text);
            }
        }

        push_unique(&mut self.records, &mut self.seen, record);
    }

    fn visit_class(&mut self, node: Node) {
        let Some(name) = node
            .child_by_field_name("name")
            .map(|n| node_text(n, self.source))
        else {
            return;
        };
        if !self.keep(&name) {
            return;
        }

        let record = FunctionRecord::class(name.as_str())
            .at_line(node.start_position().row + 1)
            .with_comment(docstring(node, self.source));
        push_unique(&mut self.records, &mut self.seen, record);

        if let Some(body) = node.child_by_field_name("body") {
            self.visit_block(body, Some(&name));
        }
    }

    fn keep(&self, name: &str) -> bool {
        self.options.include_private
            || (is_real_name(name, false) && !TEST_FIXTURE_NAMES.contains(&name))
    }
}

/// Parameters joined by `", "`, without a leading `self`/`cls` on methods.
fn parameter_list(params: Node, source: &str, is_method: bool) -> String {
    let mut cursor = params.walk();
    let mut parts: Vec<String> = params
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .map(|n| {
            node_text(n, source)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();

    if is_method && parts.first().is_some_and(|p| p == "self" || p == "cls") {
        parts.remove(0);
    }
    parts.join(", ")
}

/// First non-empty line of the docstring of a function or class.
fn docstring(node: Node, source: &str) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = find_child_by_kind(first, "string")?;
    let text = node_text(string, source);
    let inner = text
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .trim_start_matches("\"\"\"")
        .trim_start_matches("'''")
        .trim_end_matches("\"\"\"")
        .trim_end_matches("'''")
        .trim_matches(|c| c == '"' || c == '\'');

    inner
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
