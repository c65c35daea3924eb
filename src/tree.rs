//! Outline tree representation and rendering.
//!
//! Two layers: [`format_functions_as_tree`] renders one file's records
//! (standalone functions, then classes with their members), and
//! [`render_tree`] merges per-file outlines into a directory tree drawn with
//! box-drawing characters.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::outline::{default_tree_label, FunctionRecord, OutlineExtractor};
use crate::registry;

/// The type of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    /// A file and its pre-rendered outline (possibly empty).
    File { outline: String },
}

/// A node in the file tree.
#[derive(Debug, Clone)]
pub struct FileNode {
    /// File or directory name (not full path).
    pub name: String,
    /// Path from the tree root.
    pub path: PathBuf,
    pub kind: NodeKind,
    children: Vec<FileNode>,
}

impl FileNode {
    /// Create a new directory node.
    pub fn directory(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::Directory,
            children: Vec::new(),
        }
    }

    /// Create a new file node.
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>, outline: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::File {
                outline: outline.into(),
            },
            children: Vec::new(),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    /// Add a child node. Only valid for directories.
    pub fn add_child(&mut self, child: FileNode) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[FileNode] {
        &self.children
    }

    /// Sort children alphabetically (case-insensitive), recursively.
    pub fn sort_children(&mut self) {
        self.children.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        for child in &mut self.children {
            child.sort_children();
        }
    }

    /// Count total files in this tree.
    pub fn file_count(&self) -> usize {
        match &self.kind {
            NodeKind::File { .. } => 1,
            NodeKind::Directory => self.children.iter().map(|c| c.file_count()).sum(),
        }
    }

    /// Count directories below this node (excluding itself).
    pub fn directory_count(&self) -> usize {
        self.children
            .iter()
            .filter(|c| c.is_directory())
            .map(|c| 1 + c.directory_count())
            .sum()
    }

    /// Child directory `name`, created if missing.
    fn directory_entry(&mut self, name: &str) -> &mut FileNode {
        let index = match self
            .children
            .iter()
            .position(|c| c.is_directory() && c.name == name)
        {
            Some(index) => index,
            None => {
                let path = self.path.join(name);
                self.children.push(FileNode::directory(name, path));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }
}

/// Box-drawing characters for tree rendering.
const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const VERTICAL: &str = "│   ";
const SPACE: &str = "    ";

const NO_FILES: &str = "```\nNo files found.\n```\n";

fn connector(is_last: bool) -> &'static str {
    if is_last {
        LAST_BRANCH
    } else {
        BRANCH
    }
}

fn continuation(is_last: bool) -> &'static str {
    if is_last {
        SPACE
    } else {
        VERTICAL
    }
}

/// Render one file's records as a tree.
///
/// Standalone functions come first, then one node per class with its members
/// one level deeper; both groups sorted by name. Class placeholders without
/// members still get a node. Returns an empty string for an empty outline.
pub fn format_functions_as_tree(
    records: &[FunctionRecord],
    extractor: Option<&dyn OutlineExtractor>,
) -> String {
    let label = |record: &FunctionRecord| match extractor {
        Some(extractor) => extractor.format_for_tree(record),
        None => default_tree_label(record),
    };

    let mut standalone: Vec<&FunctionRecord> = Vec::new();
    let mut classes: BTreeMap<&str, Vec<FunctionRecord>> = BTreeMap::new();

    for record in records {
        match record.split_member() {
            Some((parent, member)) => {
                let mut child = record.clone();
                child.name = member.to_string();
                classes.entry(parent).or_default().push(child);
            }
            None if record.is_class() => {
                classes.entry(record.name.as_str()).or_default();
            }
            None => standalone.push(record),
        }
    }
    standalone.sort_by(|a, b| a.name.cmp(&b.name));

    let total = standalone.len() + classes.len();
    let mut lines: Vec<String> = Vec::with_capacity(records.len());
    let mut index = 0;

    for record in standalone {
        index += 1;
        lines.push(format!("{}{}", connector(index == total), label(record)));
    }

    for (class, mut members) in classes {
        index += 1;
        let is_last = index == total;
        lines.push(format!("{}{}", connector(is_last), class));

        members.sort_by(|a, b| a.name.cmp(&b.name));
        let count = members.len();
        for (i, member) in members.iter().enumerate() {
            lines.push(format!(
                "{}{}{}",
                continuation(is_last),
                connector(i + 1 == count),
                label(member)
            ));
        }
    }

    lines.join("\n")
}

/// Build a directory tree from per-file rendered outlines.
///
/// Paths are split into components; `.` components and root prefixes are
/// dropped, so `./src/a.py` and `src/a.py` land on the same node.
pub fn build_tree(outlines: &BTreeMap<PathBuf, String>) -> FileNode {
    let mut root = FileNode::directory("", "");

    for (path, outline) in outlines {
        let parts: Vec<String> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                Component::ParentDir => Some("..".to_string()),
                Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
            })
            .collect();
        let Some((file, dirs)) = parts.split_last() else {
            continue;
        };

        let mut current = &mut root;
        for dir in dirs {
            current = current.directory_entry(dir);
        }
        let file_path = current.path.join(file);
        current.add_child(FileNode::file(file.as_str(), file_path, outline.as_str()));
    }

    root.sort_children();
    root
}

/// Render the children of `root` with box-drawing connectors. File
/// outlines are indented beneath their file name.
pub fn render_tree(root: &FileNode) -> String {
    let mut output = String::with_capacity(4096);
    render_children(&mut output, root, "");
    output
}

fn render_children(output: &mut String, node: &FileNode, prefix: &str) {
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let is_last = i + 1 == count;

        output.push_str(prefix);
        output.push_str(connector(is_last));
        output.push_str(&child.name);
        if child.is_directory() {
            output.push('/');
        }
        output.push('\n');

        let nested = format!("{}{}", prefix, continuation(is_last));
        match &child.kind {
            NodeKind::Directory => render_children(output, child, &nested),
            NodeKind::File { outline } => {
                for line in outline.lines() {
                    output.push_str(&nested);
                    output.push_str(line);
                    output.push('\n');
                }
            }
        }
    }
}

/// Fenced project tree for a file → records mapping.
///
/// Every file is listed, including those whose outline is empty.
pub fn format_tree(files: &BTreeMap<PathBuf, Vec<FunctionRecord>>) -> String {
    if files.is_empty() {
        return NO_FILES.to_string();
    }

    let outlines: BTreeMap<PathBuf, String> = files
        .iter()
        .map(|(path, records)| {
            let extractor = registry::extractor_for_file(path);
            (path.clone(), format_functions_as_tree(records, extractor))
        })
        .collect();

    let root = build_tree(&outlines);
    format!("```\n{}```\n", render_tree(&root))
}

/// Display form of a path for headers and trees: forward slashes, no `./`.
pub fn display_path(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    text.strip_prefix("./").map(str::to_string).unwrap_or(text)
}
