//! Codecat - concatenate project sources into one LLM-ready document.
//!
//! Codecat selects files from a project, extracts a lightweight outline
//! (functions, classes, methods) from the ones it understands, and renders
//! either the full content with per-file function lists or a combined
//! directory/outline tree.
//!
//! # Quick Start
//!
//! ```no_run
//! use codecat::builder::Codecat;
//! use codecat::output::OutputMode;
//!
//! let collection = Codecat::new(["./my-project"]).build().unwrap();
//! println!("{}", collection.render(OutputMode::Tree).unwrap());
//! ```
//!
//! # Modules
//!
//! - [`outline`] - Per-language outline extractors
//! - [`registry`] - Extension-based language detection
//! - [`tree`] - Outline tree rendering
//! - [`walker`] - File selection with gitignore support
//! - [`imports`] - Local import resolution
//! - [`output`] - Full-content, tree and JSON rendering
//! - [`writer`] - File, stdout and clipboard delivery
//! - [`builder`] - Fluent API tying it together
//!
//! # Supported Languages
//!
//! - Python (`.py`)
//! - JavaScript / TypeScript (`.js`, `.jsx`, `.mjs`, `.cjs`, `.ts`, `.tsx`)
//! - Solidity (`.sol`)
//! - Rust (`.rs`)

pub mod builder;
pub mod clipboard;
pub mod config;
pub mod errors;
pub mod imports;
pub mod outline;
pub mod output;
pub mod progress;
pub mod registry;
pub mod tokens;
pub mod tree;
pub mod walker;
pub mod writer;

// Re-export key types at crate root for convenience
pub use builder::{Codecat, Collection, FileEntry};
pub use config::{Config, ConfigError};
pub use errors::{exit_code, CodecatError};
pub use outline::{ExtractOptions, FunctionRecord, NodeType, OutlineError, OutlineExtractor};
pub use output::{OutputError, OutputMode};
pub use registry::{detect_language, extractor_for_file, Language};
pub use tokens::{count_tokens, ContentSize};
pub use tree::{format_functions_as_tree, format_tree, FileNode, NodeKind};
pub use walker::{WalkError, WalkOptions};
