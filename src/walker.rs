//! File selection: directory traversal plus include/exclude filtering.
//!
//! Directories are walked with the `ignore` crate, which honours
//! `.gitignore`, `.git/info/exclude`, the global gitignore and a
//! project-local `.codecatignore`. On top of that every candidate must pass
//! the exclude globs (built-in defaults plus user patterns), at least one
//! include glob, and the extension allow-list.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glob::{MatchOptions, Pattern};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;
use thiserror::Error;
use tracing::{debug, warn};

/// Project-local ignore file, gitignore syntax.
pub const IGNORE_FILE: &str = ".codecatignore";

/// Paths skipped unless `--all` is given.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    // build output and caches
    "**/build/**",
    "**/dist/**",
    "**/__pycache__/**",
    "**/.cache/**",
    "**/coverage/**",
    "**/.next/**",
    "**/out/**",
    "**/.nuxt/**",
    "**/.output/**",
    "**/*.egg-info/**",
    "**/target/**",
    // dependencies and virtualenvs
    "**/node_modules/**",
    "**/venv/**",
    "**/.venv/**",
    "**/virtualenv/**",
    "**/env/**",
    "**/.env/**",
    // tests
    "**/test/**",
    "**/tests/**",
    "**/__tests__/**",
    "**/*.test.*",
    "**/*.spec.*",
    // editors and VCS
    "**/.idea/**",
    "**/.vscode/**",
    "**/.DS_Store",
    "**/.git/**",
    "**/.svn/**",
    "**/.hg/**",
    // logs
    "**/*.log",
    "**/npm-debug.log*",
    "**/yarn-debug.log*",
    "**/yarn-error.log*",
    // environment and version pins
    "**/.env",
    "**/.envrc",
    "**/.env.*",
    "**/.python-version",
    "**/.ruby-version",
    "**/.node-version",
    // manifests and lock files
    "**/package.json",
    "**/package-lock.json",
    "**/yarn.lock",
    "**/tsconfig.json",
    "**/jsconfig.json",
    "**/*.config.js",
    "**/pyproject.toml",
    "**/setup.py",
    "**/setup.cfg",
    "**/requirements.txt",
    "**/Pipfile",
    "**/Pipfile.lock",
    "**/bower.json",
    "**/composer.json",
    "**/composer.lock",
    // generated and binary assets
    "**/*.min.js",
    "**/*.min.css",
    "**/*.map",
    "**/*.png",
    "**/*.jpg",
    "**/*.jpeg",
    "**/*.gif",
    "**/*.ico",
    "**/*.svg",
    "**/*.woff",
    "**/*.woff2",
    "**/*.ttf",
    "**/*.eot",
    "**/*.pdf",
    "**/*.zip",
    "**/*.tar.gz",
    "**/*.tgz",
    "**/*.mp3",
    "**/*.mp4",
    "**/*.mov",
    "**/*.avi",
];

/// Extensions included by default, lower-case with the leading dot.
pub const DEFAULT_FILE_EXTENSIONS: &[&str] = &[
    ".ts", ".js", ".py", ".rs", ".sol", ".go", ".jsx", ".tsx", ".css", ".scss", ".svelte", ".html",
    ".java", ".c", ".cpp", ".h", ".hpp", ".rb", ".php", ".swift", ".kt", ".scala", ".sh", ".bash",
    ".md", ".json", ".yaml", ".yml", ".toml",
];

/// Errors that can occur during file selection.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pattern {pattern:?}: {message}")]
    Pattern { pattern: String, message: String },
}

impl WalkError {
    fn from_io(path: &Path, source: std::io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            std::io::ErrorKind::NotFound => WalkError::NotFound { path },
            std::io::ErrorKind::PermissionDenied => WalkError::PermissionDenied { path },
            _ => WalkError::Io { path, source },
        }
    }
}

/// Options for file selection.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Include globs; a file must match at least one.
    pub include: Vec<String>,
    /// User exclude globs, applied after the defaults. `!pattern` re-includes.
    pub exclude: Vec<String>,
    /// Apply [`DEFAULT_EXCLUDE_PATTERNS`].
    pub default_excludes: bool,
    /// Extension allow-list; empty accepts every extension.
    pub file_extensions: Vec<String>,
    /// Drop markdown files.
    pub nodocs: bool,
    /// Include hidden files and directories.
    pub include_hidden: bool,
    /// Respect .gitignore patterns.
    pub respect_gitignore: bool,
    /// Follow symbolic links.
    pub follow_symlinks: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            include: vec!["**/*".to_string()],
            exclude: Vec::new(),
            default_excludes: true,
            file_extensions: DEFAULT_FILE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            nodocs: false,
            include_hidden: false,
            respect_gitignore: true,
            follow_symlinks: true,
        }
    }
}

impl WalkOptions {
    /// Options for `--all`: no default excludes, no extension filter, no
    /// ignore files, hidden entries included.
    pub fn all() -> Self {
        Self {
            default_excludes: false,
            file_extensions: Vec::new(),
            include_hidden: true,
            respect_gitignore: false,
            ..Default::default()
        }
    }

    /// Add user exclude patterns.
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn nodocs(mut self, nodocs: bool) -> Self {
        self.nodocs = nodocs;
        self
    }
}

/// One compiled include glob.
#[derive(Debug, Clone)]
struct IncludePattern {
    pattern: Pattern,
    /// Same glob without a leading `**/`, so top-level files match too.
    top_level: Option<Pattern>,
    /// No `/` in the glob: match the file name alone.
    basename: bool,
}

impl IncludePattern {
    fn new(text: &str) -> Result<Self, WalkError> {
        let compile = |text: &str| {
            Pattern::new(text).map_err(|e| WalkError::Pattern {
                pattern: text.to_string(),
                message: e.to_string(),
            })
        };
        let text = text.trim_start_matches("./");
        Ok(Self {
            pattern: compile(text)?,
            top_level: text.strip_prefix("**/").map(compile).transpose()?,
            basename: !text.contains('/'),
        })
    }

    fn matches(&self, rel: &str) -> bool {
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };
        if self.pattern.matches_with(rel, options) {
            return true;
        }
        if let Some(top) = &self.top_level {
            if top.matches_with(rel, options) {
                return true;
            }
        }
        self.basename
            && rel
                .rsplit('/')
                .next()
                .is_some_and(|name| self.pattern.matches_with(name, options))
    }
}

/// Compiled filters for one walked directory. Paths are given relative to
/// that directory.
#[derive(Debug, Clone)]
pub struct Selector {
    excludes: Gitignore,
    includes: Vec<IncludePattern>,
    extensions: Vec<String>,
}

impl Selector {
    pub fn new(root: &Path, options: &WalkOptions) -> Result<Self, WalkError> {
        let mut builder = GitignoreBuilder::new(root);
        let defaults = if options.default_excludes {
            DEFAULT_EXCLUDE_PATTERNS
        } else {
            &[]
        };
        let docs: &[&str] = if options.nodocs { &["**/*.md"] } else { &[] };
        let patterns = defaults
            .iter()
            .copied()
            .chain(docs.iter().copied())
            .chain(options.exclude.iter().map(String::as_str));
        for pattern in patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| WalkError::Pattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })?;
        }
        let excludes = builder.build().map_err(|e| WalkError::Pattern {
            pattern: options.exclude.join(", "),
            message: e.to_string(),
        })?;

        let includes = options
            .include
            .iter()
            .map(|p| IncludePattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        let extensions = options
            .file_extensions
            .iter()
            .map(|e| format!(".{}", e.trim_start_matches('.').to_lowercase()))
            .collect();

        Ok(Self {
            excludes,
            includes,
            extensions,
        })
    }

    /// Whether a relative file path is selected.
    pub fn accepts_file(&self, rel: &Path) -> bool {
        if self
            .excludes
            .matched_path_or_any_parents(rel, false)
            .is_ignore()
        {
            debug!("excluding {} (exclude pattern)", rel.display());
            return false;
        }

        let text = rel.to_string_lossy().replace('\\', "/");
        if !self.includes.iter().any(|p| p.matches(&text)) {
            debug!("excluding {} (no include pattern)", rel.display());
            return false;
        }

        if !self.extensions.is_empty() {
            let ext = rel
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{}", e.to_lowercase()));
            if !ext.is_some_and(|ext| self.extensions.contains(&ext)) {
                debug!("excluding {} (extension)", rel.display());
                return false;
            }
        }
        true
    }

    /// Whether a relative directory is excluded outright, i.e. anything
    /// directly inside it would be excluded.
    pub fn excludes_dir(&self, rel: &Path) -> bool {
        self.excludes.matched_path_or_any_parents(rel, true).is_ignore()
            || self
                .excludes
                .matched_path_or_any_parents(rel.join("\u{0}"), false)
                .is_ignore()
    }
}

/// Select the files to process from `paths`.
///
/// Explicit files are included as-is; directories are walked and filtered.
/// Walked files are returned as `dir/relative`, or just `relative` when the
/// directory is `.`. The result is sorted and de-duplicated.
///
/// # Examples
///
/// ```no_run
/// use codecat::walker::{collect_files, WalkOptions};
/// use std::path::PathBuf;
///
/// let files = collect_files(&[PathBuf::from(".")], &WalkOptions::default()).unwrap();
/// for file in files {
///     println!("{}", file.display());
/// }
/// ```
pub fn collect_files(paths: &[PathBuf], options: &WalkOptions) -> Result<Vec<PathBuf>, WalkError> {
    let mut files = Vec::new();

    for path in paths {
        let metadata = std::fs::metadata(path).map_err(|e| WalkError::from_io(path, e))?;
        if metadata.is_file() {
            debug!("including explicit file {}", path.display());
            files.push(path.clone());
        } else {
            files.extend(walk_dir(path, options)?);
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Walk one directory and return the selected files.
pub fn walk_dir(root: &Path, options: &WalkOptions) -> Result<Vec<PathBuf>, WalkError> {
    if !root.is_dir() {
        return Err(WalkError::NotFound {
            path: root.to_path_buf(),
        });
    }
    debug!("searching directory {}", root.display());

    let selector = Arc::new(Selector::new(root, options)?);
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(!options.include_hidden)
        .parents(options.respect_gitignore)
        .ignore(options.respect_gitignore)
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .require_git(false)
        .follow_links(options.follow_symlinks);
    if options.respect_gitignore {
        builder.add_custom_ignore_filename(IGNORE_FILE);
    }

    let filter_root = root.to_path_buf();
    let filter = Arc::clone(&selector);
    builder.filter_entry(move |entry| {
        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        match entry.path().strip_prefix(&filter_root) {
            Ok(rel) if is_dir && !rel.as_os_str().is_empty() => !filter.excludes_dir(rel),
            _ => true,
        }
    });

    let mut files = Vec::new();
    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        if selector.accepts_file(rel) {
            files.push(joined(root, rel));
        }
    }

    files.sort();
    Ok(files)
}

/// Non-hidden, non-excluded direct subdirectories of `root`, sorted.
pub fn subdirectories(root: &Path, options: &WalkOptions) -> Result<Vec<PathBuf>, WalkError> {
    let selector = Selector::new(root, options)?;
    let entries = std::fs::read_dir(root).map_err(|e| WalkError::from_io(root, e))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| WalkError::from_io(root, e))?;
        let is_dir = entry.file_type().is_ok_and(|ft| ft.is_dir());
        let name = entry.file_name();
        let hidden = name.to_string_lossy().starts_with('.');
        if !is_dir || (hidden && !options.include_hidden) {
            continue;
        }
        if selector.excludes_dir(Path::new(&name)) {
            debug!("skipping excluded directory {}", name.to_string_lossy());
            continue;
        }
        dirs.push(joined(root, Path::new(&name)));
    }

    dirs.sort();
    Ok(dirs)
}

fn joined(root: &Path, rel: &Path) -> PathBuf {
    if root == Path::new(".") {
        rel.to_path_buf()
    } else {
        root.join(rel)
    }
}
