//! Spinner shown on stderr while files are processed.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{spinner:.green} {prefix:.bold.cyan} {wide_msg:.dim}";

/// A spinner for `files` files, or a hidden bar when `visible` is false or
/// stderr is not a terminal.
pub fn spinner(files: usize, visible: bool) -> ProgressBar {
    if !visible || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(files as u64);
    if let Ok(style) = ProgressStyle::default_spinner().template(TEMPLATE) {
        bar.set_style(style);
    }
    bar.set_prefix("Processing");
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
