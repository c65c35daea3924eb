//! Project configuration from `codecat.config.json`.
//!
//! Every field is optional. A missing file yields the defaults; malformed
//! JSON or a wrongly typed field logs a warning and falls back to the
//! default for that field (or the whole file). CLI flags are applied on top
//! by the binary.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::walker::{WalkOptions, DEFAULT_FILE_EXTENSIONS};

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "codecat.config.json";

/// Output file name used when file output is enabled without a name.
pub const DEFAULT_OUTPUT_FILE: &str = "output-codecat.md";

/// Characters per clipboard part.
pub const DEFAULT_CHUNK_SIZE: usize = 90_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `outputFile`: `true`/`false` or an explicit file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputFile {
    Enabled(bool),
    Named(String),
}

impl OutputFile {
    /// Destination path, or `None` when file output is off.
    pub fn path(&self) -> Option<PathBuf> {
        match self {
            OutputFile::Enabled(false) => None,
            OutputFile::Enabled(true) => Some(PathBuf::from(DEFAULT_OUTPUT_FILE)),
            OutputFile::Named(name) => Some(PathBuf::from(name)),
        }
    }
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub include: Vec<String>,
    /// User exclude patterns, applied after the built-in defaults.
    pub exclude: Vec<String>,
    pub output_file: OutputFile,
    pub use_pastebin: bool,
    pub file_extensions: Vec<String>,
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include: vec!["**/*".to_string()],
            exclude: Vec::new(),
            output_file: OutputFile::Enabled(false),
            use_pastebin: true,
            file_extensions: DEFAULT_FILE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// The file as written; each field is validated separately.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    include: Option<Value>,
    exclude: Option<Value>,
    output_file: Option<Value>,
    use_pastebin: Option<Value>,
    file_extensions: Option<Value>,
    chunk_size: Option<Value>,
}

impl Config {
    /// Load `codecat.config.json` from `dir`, never failing.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        match Self::read(&path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!("no {} found, using default configuration", CONFIG_FILE);
                Self::default()
            }
            Err(err) => {
                warn!("{err}; using default configuration");
                Self::default()
            }
        }
    }

    /// Read a config file. `Ok(None)` when it does not exist.
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&text)
            .map(Some)
            .map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Parse config JSON. Only a syntax error (or a non-object document)
    /// fails; wrongly typed fields fall back to their defaults.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let raw: RawConfig = serde_json::from_str(text)?;
        let mut config = Self::default();

        if let Some(include) = field::<Vec<String>>("include", raw.include) {
            config.include = include;
        }
        // `null` reads as absent and keeps the defaults
        if let Some(exclude) = field("exclude", raw.exclude) {
            config.exclude = exclude;
        }
        if let Some(output_file) = field("outputFile", raw.output_file) {
            config.output_file = output_file;
        }
        if let Some(use_pastebin) = field("usePastebin", raw.use_pastebin) {
            config.use_pastebin = use_pastebin;
        }
        if let Some(extensions) = field("fileExtensions", raw.file_extensions) {
            config.file_extensions = extensions;
        }
        match field::<usize>("chunkSize", raw.chunk_size) {
            Some(0) => warn!("'chunkSize' must be positive; using default"),
            Some(size) => config.chunk_size = size,
            None => {}
        }

        Ok(config)
    }

    /// File selection options for this config.
    ///
    /// `all` drops the default excludes, the extension filter and ignore
    /// files; user excludes still apply.
    pub fn walk_options(&self, all: bool, nodocs: bool, extra_excludes: &[String]) -> WalkOptions {
        let base = if all {
            WalkOptions::all()
        } else {
            WalkOptions {
                file_extensions: self.file_extensions.clone(),
                ..Default::default()
            }
        };
        WalkOptions {
            include: self.include.clone(),
            ..base
        }
        .exclude(self.exclude.iter().chain(extra_excludes).cloned())
        .nodocs(nodocs)
    }
}

fn field<T: DeserializeOwned>(name: &str, value: Option<Value>) -> Option<T> {
    let value = value?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!("invalid '{name}' in config ({err}); using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Config::load(dir.path()), Config::default());
        assert_eq!(Config::default().chunk_size, 90_000);
        assert_eq!(Config::default().output_file.path(), None);
    }

    #[test]
    fn test_parse_fields() {
        let config = Config::parse(
            r#"{
                "include": ["src/**/*"],
                "exclude": ["**/generated/**"],
                "outputFile": "context.md",
                "usePastebin": false,
                "fileExtensions": [".py"],
                "chunkSize": 1000
            }"#,
        )
        .unwrap();
        assert_eq!(config.include, vec!["src/**/*"]);
        assert_eq!(config.exclude, vec!["**/generated/**"]);
        assert_eq!(config.output_file.path(), Some(PathBuf::from("context.md")));
        assert!(!config.use_pastebin);
        assert_eq!(config.file_extensions, vec![".py"]);
        assert_eq!(config.chunk_size, 1000);
    }

    #[test]
    fn test_output_file_true_uses_default_name() {
        let config = Config::parse(r#"{"outputFile": true}"#).unwrap();
        assert_eq!(config.output_file.path(), Some(PathBuf::from(DEFAULT_OUTPUT_FILE)));
    }

    #[test]
    fn test_invalid_fields_fall_back() {
        let config = Config::parse(
            r#"{"exclude": "nope", "chunkSize": "big", "outputFile": 3, "include": null}"#,
        )
        .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_null_exclude_keeps_defaults() {
        let config = Config::parse(r#"{"exclude": null}"#).unwrap();
        assert!(config.exclude.is_empty());
    }

    #[test]
    fn test_invalid_json_falls_back() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert!(matches!(
            Config::read(&dir.path().join(CONFIG_FILE)),
            Err(ConfigError::Json { .. })
        ));
        assert_eq!(Config::load(dir.path()), Config::default());
    }

    #[test]
    fn test_walk_options() {
        let config = Config::parse(r#"{"exclude": ["docs/"], "fileExtensions": [".rs"]}"#).unwrap();

        let options = config.walk_options(false, true, &["*.tmp".to_string()]);
        assert_eq!(options.exclude, vec!["docs/", "*.tmp"]);
        assert_eq!(options.file_extensions, vec![".rs"]);
        assert!(options.default_excludes);
        assert!(options.nodocs);

        let options = config.walk_options(true, false, &[]);
        assert!(options.file_extensions.is_empty());
        assert!(!options.default_excludes);
        assert_eq!(options.exclude, vec!["docs/"]);
    }
}
