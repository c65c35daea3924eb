//! Fluent builder API for codecat.
//!
//! Selects files, reads them, and extracts an outline for each file whose
//! language has an extractor.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use tracing::{debug, warn};

use crate::errors::CodecatError;
use crate::imports::ImportCache;
use crate::outline::{ExtractOptions, FunctionRecord};
use crate::output::{self, OutputError, OutputMode};
use crate::registry::{detect_language, Language};
use crate::tree::display_path;
use crate::walker::{collect_files, WalkOptions};

/// One selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub language: Option<Language>,
    pub content: String,
    /// Empty when the language is unsupported or extraction failed.
    pub outline: Vec<FunctionRecord>,
}

impl FileEntry {
    /// Read `path` and extract its outline. `None` when the file cannot be
    /// read or is not UTF-8; the reason is logged.
    pub fn load(path: &Path, options: &ExtractOptions) -> Option<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("skipping {}: {err}", path.display());
                return None;
            }
        };
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(_) => {
                warn!("skipping {}: not valid UTF-8", path.display());
                return None;
            }
        };
        Some(Self::from_source(path, content, options))
    }

    /// Build an entry from already-read text.
    pub fn from_source(path: &Path, content: String, options: &ExtractOptions) -> Self {
        let language = detect_language(path);
        let outline = language
            .map(|lang| lang.extractor().extract_functions(&content, options))
            .unwrap_or_default();
        Self {
            language,
            content,
            outline,
        }
    }

    /// Number of lines in the content.
    pub fn lines(&self) -> usize {
        let newlines = bytecount::count(self.content.as_bytes(), b'\n');
        if self.content.is_empty() || self.content.ends_with('\n') {
            newlines
        } else {
            newlines + 1
        }
    }
}

/// Builder for a codecat run.
///
/// # Examples
///
/// ```no_run
/// use codecat::builder::Codecat;
/// use codecat::output::OutputMode;
///
/// let collection = Codecat::new(["./src"]).nodocs(true).build().unwrap();
/// println!("{}", collection.render(OutputMode::Tree).unwrap());
/// ```
pub struct Codecat {
    paths: Vec<PathBuf>,
    root: PathBuf,
    walk_options: WalkOptions,
    extract_options: ExtractOptions,
    follow_imports: bool,
    progress: ProgressBar,
}

impl Codecat {
    /// Create a builder for the given paths; no paths means `.`.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            paths.push(PathBuf::from("."));
        }
        Self {
            paths,
            root: PathBuf::from("."),
            walk_options: WalkOptions::default(),
            extract_options: ExtractOptions::default(),
            follow_imports: false,
            progress: ProgressBar::hidden(),
        }
    }

    /// Replace the file selection options.
    pub fn walk_options(mut self, options: WalkOptions) -> Self {
        self.walk_options = options;
        self
    }

    /// Drop markdown files.
    pub fn nodocs(mut self, nodocs: bool) -> Self {
        self.walk_options.nodocs = nodocs;
        self
    }

    /// Keep private, underscore and special names in outlines.
    pub fn include_private(mut self, include: bool) -> Self {
        self.extract_options.include_private = include;
        self
    }

    /// Add local files imported by the selection, transitively.
    pub fn follow_imports(mut self, follow: bool) -> Self {
        self.follow_imports = follow;
        self
    }

    /// Project root bounding import resolution (default `.`).
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Report per-file progress on this bar.
    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Paths that will be processed, in order.
    pub fn select(&self) -> Result<Vec<PathBuf>, CodecatError> {
        let mut files = collect_files(&self.paths, &self.walk_options)?;

        if self.follow_imports {
            let mut cache = ImportCache::new();
            let related = cache.related_files(&files, &self.root);
            debug!("following imports added {} files", related.len());
            files.extend(related);
            files.sort();
            files.dedup();
        }

        if files.is_empty() {
            let searched: Vec<String> = self.paths.iter().map(|p| display_path(p)).collect();
            return Err(CodecatError::NoFilesFound(searched.join(", ")));
        }
        Ok(files)
    }

    /// Select, read and outline every file.
    pub fn build(self) -> Result<Collection, CodecatError> {
        let files = self.select()?;
        self.progress.set_length(files.len() as u64);

        let mut collection = Collection::default();
        for path in files {
            self.progress.set_message(display_path(&path));
            match FileEntry::load(&path, &self.extract_options) {
                Some(entry) => {
                    collection.files.insert(path, entry);
                }
                None => collection.skipped.push(path),
            }
            self.progress.inc(1);
        }
        self.progress.finish_and_clear();

        debug!(
            "processed {} files ({} skipped)",
            collection.files.len(),
            collection.skipped.len()
        );
        Ok(collection)
    }
}

/// Files read in a run, keyed and ordered by path.
#[derive(Debug, Default)]
pub struct Collection {
    pub files: BTreeMap<PathBuf, FileEntry>,
    /// Selected files that could not be read.
    pub skipped: Vec<PathBuf>,
}

impl Collection {
    pub fn render(&self, mode: OutputMode) -> Result<String, OutputError> {
        output::render(&self.files, mode)
    }

    /// Outline records per file.
    pub fn outlines(&self) -> BTreeMap<PathBuf, Vec<FunctionRecord>> {
        self.files
            .iter()
            .map(|(path, entry)| (path.clone(), entry.outline.clone()))
            .collect()
    }
}
