//! Line-overwriting progress display
//!
//! - Notes (batch starts, storage checks, waits) scroll above
//! - The current file stays on a single line at the bottom
//! - Falls back to plain lines when stderr is not a terminal

use crossterm::style::{Color, Stylize};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Uploading,
    Downloading,
    Deleting,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileAction::Uploading => "Uploading",
            FileAction::Downloading => "Downloading",
            FileAction::Deleting => "Deleting",
        })
    }
}

/// Receives progress from the engines, strictly in processing order.
pub trait TransferProgress {
    /// A new phase over `total` files starts.
    fn begin(&self, _total: usize) {}
    /// File number `position` (1-based) of `total` is about to be processed.
    fn file(&self, _position: usize, _total: usize, _action: FileAction, _name: &str) {}
    fn note(&self, _msg: &str) {}
    fn finish(&self) {}
}

pub struct NoProgress;
impl TransferProgress for NoProgress {}

/// Text for one progress line: `[3/40] (7.5%) Uploading: IMG_1.HEIC`.
pub fn progress_line(position: usize, total: usize, action: FileAction, name: &str) -> String {
    let pct = if total == 0 {
        100.0
    } else {
        position as f64 / total as f64 * 100.0
    };
    format!("[{position}/{total}] ({pct:.1}%) {action}: {name}")
}

/// Draws on stderr so stdout stays clean for summaries and listings.
pub struct ConsoleProgress {
    bar: Mutex<Option<ProgressBar>>,
    show_files: bool,
    target: fn() -> ProgressDrawTarget,
}

impl ConsoleProgress {
    pub fn new(show_files: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            show_files,
            target: ProgressDrawTarget::stderr,
        }
    }

    /// Never draws a bar; every line goes to stderr as plain text.
    pub fn plain(show_files: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            show_files,
            target: ProgressDrawTarget::hidden,
        }
    }

    fn println(&self, line: &str) {
        match self.bar.lock().as_ref() {
            Some(bar) if !bar.is_hidden() => bar.println(line),
            _ => eprintln!("{line}"),
        }
    }
}

impl TransferProgress for ConsoleProgress {
    fn begin(&self, total: usize) {
        let bar = ProgressBar::with_draw_target(Some(total as u64), (self.target)());
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        if let Some(old) = self.bar.lock().replace(bar) {
            old.finish_and_clear();
        }
    }

    fn file(&self, position: usize, total: usize, action: FileAction, name: &str) {
        if self.show_files {
            self.println(&format!(
                "  {} {}",
                action.to_string().with(Color::Green).bold(),
                name.with(Color::Cyan)
            ));
        }
        let guard = self.bar.lock();
        match guard.as_ref() {
            Some(bar) if !bar.is_hidden() => {
                bar.set_position(position as u64);
                bar.set_message(progress_line(position, total, action, name));
            }
            _ if !self.show_files => eprintln!("{}", progress_line(position, total, action, name)),
            _ => {}
        }
    }

    fn note(&self, msg: &str) {
        self.println(msg);
    }

    fn finish(&self) {
        if let Some(bar) = self.bar.lock().take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for ConsoleProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
