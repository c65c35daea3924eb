//! Error types for codecat.

use std::path::PathBuf;

use crate::output::OutputError;
use crate::walker::WalkError;

/// Top-level error type for codecat operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecatError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("no matching files found in {0}")]
    NoFilesFound(String),

    #[error("walk error: {0}")]
    Walk(WalkError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

impl From<WalkError> for CodecatError {
    fn from(error: WalkError) -> Self {
        match error {
            WalkError::NotFound { path } => CodecatError::PathNotFound(path),
            WalkError::PermissionDenied { path } => CodecatError::PermissionDenied(path),
            other => CodecatError::Walk(other),
        }
    }
}

/// Map an error to its exit code.
pub fn exit_code(error: &CodecatError) -> i32 {
    match error {
        CodecatError::PathNotFound(_) => 3,
        CodecatError::PermissionDenied(_) => 4,
        CodecatError::NoFilesFound(_) => 5,
        CodecatError::Walk(_) => 2,
        CodecatError::Output(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_errors_map_to_exit_codes() {
        let missing: CodecatError = WalkError::NotFound {
            path: PathBuf::from("nope"),
        }
        .into();
        assert!(matches!(missing, CodecatError::PathNotFound(_)));
        assert_eq!(exit_code(&missing), 3);

        let pattern: CodecatError = WalkError::Pattern {
            pattern: "[".to_string(),
            message: "unclosed".to_string(),
        }
        .into();
        assert_eq!(exit_code(&pattern), 2);

        assert_eq!(exit_code(&CodecatError::NoFilesFound(".".to_string())), 5);

        let output: CodecatError = OutputError::Io {
            path: PathBuf::from("out.md"),
            source: std::io::Error::from(std::io::ErrorKind::Other),
        }
        .into();
        assert_eq!(exit_code(&output), 1);
    }
}
