//! Byte progress for downloads.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

fn is_progress_disabled() -> bool {
    std::env::var("PGET_NO_PROGRESS").is_ok() || !std::io::stderr().is_terminal()
}

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .map(|style| style.progress_chars("━╸━"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{prefix:.bold.cyan} {spinner:.cyan} {bytes}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// A progress bar for a download of `total` bytes, or a spinner when the size
/// is unknown. Hidden when stderr is not a terminal or `PGET_NO_PROGRESS` is set.
pub fn download_bar(label: &str, total: Option<u64>) -> ProgressBar {
    if is_progress_disabled() {
        return ProgressBar::hidden();
    }
    let bar = match total {
        Some(len) => {
            let bar = ProgressBar::new(len);
            bar.set_style(download_style());
            bar
        }
        None => {
            let bar = ProgressBar::new_spinner();
            bar.set_style(spinner_style());
            bar
        }
    };
    bar.set_prefix(label.to_string());
    bar
}
