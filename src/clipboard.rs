//! System clipboard access through the platform's copy command.
//!
//! No clipboard library is linked; the first available tool among tmux,
//! pbcopy, clip.exe, wl-copy, xsel, xclip and termux-clipboard-set receives
//! the text on stdin.

use std::env;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("failed to run {command}: {message}")]
    CommandFailed { command: &'static str, message: String },

    #[error("no clipboard command found (tried tmux, pbcopy, clip.exe, wl-copy, xsel, xclip)")]
    NoClipboardFound,
}

/// Something text can be copied into.
pub trait Clipboard {
    fn copy(&self, text: &str) -> Result<(), ClipboardError>;
}

/// The system clipboard, through the first provider that works.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> Result<(), ClipboardError> {
        copy_to_clipboard(text)
    }
}

/// A clipboard command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardProvider {
    Tmux,
    MacOs,
    Wsl,
    Wayland,
    Xsel,
    Xclip,
    Termux,
}

impl ClipboardProvider {
    fn command(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Tmux => ("tmux", &["load-buffer", "-w", "-"]),
            Self::MacOs => ("pbcopy", &[]),
            Self::Wsl => ("clip.exe", &[]),
            Self::Wayland => ("wl-copy", &[]),
            Self::Xsel => ("xsel", &["-b", "-i"]),
            Self::Xclip => ("xclip", &["-selection", "clipboard", "-in"]),
            Self::Termux => ("termux-clipboard-set", &[]),
        }
    }
}

impl Clipboard for ClipboardProvider {
    /// Pipe `text` into the provider's command.
    fn copy(&self, text: &str) -> Result<(), ClipboardError> {
        let (command, args) = self.command();
        let failed = |message: String| ClipboardError::CommandFailed { command, message };

        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| failed(e.to_string()))?;

        {
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| failed("stdin unavailable".to_string()))?;
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| failed(e.to_string()))?;
        }
        // close stdin so the command sees EOF
        drop(child.stdin.take());

        let status = child.wait().map_err(|e| failed(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(failed(format!("exited with {status}")))
        }
    }
}

/// Copy `text` with the first provider that works.
pub fn copy_to_clipboard(text: &str) -> Result<(), ClipboardError> {
    let mut last_error = ClipboardError::NoClipboardFound;
    for provider in available_providers() {
        match provider.copy(text) {
            Ok(()) => {
                debug!("copied {} bytes with {:?}", text.len(), provider);
                return Ok(());
            }
            Err(err) => {
                debug!("{err}");
                last_error = err;
            }
        }
    }
    Err(last_error)
}

/// Providers usable on this machine, in preference order.
pub fn available_providers() -> Vec<ClipboardProvider> {
    let mut providers = Vec::with_capacity(3);

    if command_exists("tmux") && env::var_os("TMUX").is_some() {
        providers.push(ClipboardProvider::Tmux);
    }

    let candidates: &[ClipboardProvider] = match platform() {
        Platform::MacOs => &[ClipboardProvider::MacOs],
        Platform::Windows => &[ClipboardProvider::Wsl],
        Platform::Linux => &[
            ClipboardProvider::Wayland,
            ClipboardProvider::Xsel,
            ClipboardProvider::Xclip,
        ],
        Platform::Android => &[ClipboardProvider::Termux],
        Platform::Unknown => &[],
    };
    providers.extend(
        candidates
            .iter()
            .copied()
            .filter(|p| command_exists(p.command().0)),
    );
    providers
}

/// Whether `command` is an executable on `PATH`.
pub fn command_exists(command: &str) -> bool {
    let Some(paths) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&paths).any(|dir| is_executable(&dir.join(command)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Platform {
    MacOs,
    /// Native Windows or WSL.
    Windows,
    Linux,
    Android,
    Unknown,
}

fn platform() -> Platform {
    static PLATFORM: OnceLock<Platform> = OnceLock::new();
    *PLATFORM.get_or_init(|| {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") || env::var_os("WSL_DISTRO_NAME").is_some() {
            Platform::Windows
        } else if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Unknown
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_command_exists() {
        assert!(command_exists("sh"));
        assert!(!command_exists("nonexistentcommandxyz"));
    }

    #[test]
    fn test_platform_is_cached() {
        assert_eq!(platform(), platform());
    }

    #[test]
    fn test_providers_are_installed() {
        for provider in available_providers() {
            assert!(command_exists(provider.command().0));
        }
    }
}
