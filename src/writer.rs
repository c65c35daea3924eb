//! Delivery of the rendered document: file, stdout, clipboard.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::clipboard::Clipboard;
use crate::output::OutputError;
use crate::tokens::{chunk_content, ContentSize};

/// Where a run's output goes. Several destinations may be active at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub output_file: Option<PathBuf>,
    pub stdout: bool,
    pub clipboard: bool,
    /// Maximum characters per clipboard part.
    pub chunk_size: usize,
}

impl Delivery {
    /// Send `content` to every active destination and log its size.
    ///
    /// A failed clipboard copy only warns; the content then goes to stdout
    /// unless a file or stdout already received it.
    pub fn deliver(&self, content: &str, clipboard: &dyn Clipboard) -> Result<(), OutputError> {
        let mut to_stdout = self.stdout || (self.output_file.is_none() && !self.clipboard);

        if let Some(path) = &self.output_file {
            write_file(path, content)?;
            info!("output written to {}", path.display());
        }

        let size = ContentSize::of(content);
        if size.exceeds(self.chunk_size) {
            warn!(
                "output size ({} characters) exceeds the chunk size ({} characters)",
                size.chars, self.chunk_size
            );
        }

        if self.clipboard {
            if let Err(err) = copy_in_parts(clipboard, content, self.chunk_size, &mut prompt_for_next) {
                warn!("clipboard copy failed: {err}");
                to_stdout |= self.output_file.is_none();
            }
        }

        if to_stdout {
            write_stdout(content)?;
        }

        info!("{size}");
        Ok(())
    }
}

fn write_stdout(content: &str) -> Result<(), OutputError> {
    let mut out = io::stdout().lock();
    out.write_all(content.as_bytes())
        .and_then(|()| out.flush())
        .map_err(|source| OutputError::Io {
            path: PathBuf::from("<stdout>"),
            source,
        })
}

/// Write `content` to `path`, creating parent directories.
pub fn write_file(path: &Path, content: &str) -> Result<(), OutputError> {
    let io_error = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(path, content).map_err(io_error)
}

/// Copy `content` in line-aligned parts of at most `chunk_size` characters,
/// calling `next` between parts. Returns the number of parts copied.
pub fn copy_in_parts(
    clipboard: &dyn Clipboard,
    content: &str,
    chunk_size: usize,
    next: &mut dyn FnMut(usize, usize) -> io::Result<()>,
) -> Result<usize, OutputError> {
    let parts = chunk_content(content, chunk_size);
    let total = parts.len();

    for (i, part) in parts.iter().enumerate() {
        clipboard.copy(part)?;
        info!("part {} of {} copied to clipboard", i + 1, total);
        if i + 1 < total {
            next(i + 1, total).map_err(|source| OutputError::Io {
                path: PathBuf::from("<stdin>"),
                source,
            })?;
        }
    }
    Ok(total)
}

fn prompt_for_next(_copied: usize, _total: usize) -> io::Result<()> {
    eprint!("Press Enter when ready for the next part...");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}
