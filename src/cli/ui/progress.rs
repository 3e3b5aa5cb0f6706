//! Single-line batch progress on stderr

use colored::*;
use std::io::{self, Write};
use std::sync::Mutex;

use skyman::tasks::ProgressSink;

/// Renders `\r<label> [done/total]`, redrawing the same line as items finish
///
/// Counts can arrive out of order from concurrent workers; a stale count is
/// never drawn over a newer one.
pub struct ProgressLine {
    label: String,
    shown: Mutex<usize>,
}

impl ProgressLine {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            shown: Mutex::new(0),
        }
    }

    fn render(&self, completed: usize, total: usize) -> String {
        format!("\r{} [{}/{}]", self.label.cyan(), completed, total)
    }

    #[cfg(test)]
    fn shown(&self) -> usize {
        *self.shown.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ProgressSink for ProgressLine {
    fn on_progress(&self, completed: usize, total: usize) {
        let mut shown = self.shown.lock().unwrap_or_else(|e| e.into_inner());
        if completed <= *shown {
            return;
        }
        *shown = completed;

        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "{}", self.render(completed, total));
        let _ = stderr.flush();
    }

    fn on_finish(&self, _total: usize) {
        eprintln!();
    }
}
