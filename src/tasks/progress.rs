use log::debug;

/// Receives completion counts while a batch runs.
///
/// Called from worker tasks, possibly concurrently. Every value in
/// `1..=total` is delivered exactly once, but two workers finishing at the
/// same moment may deliver theirs out of order.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, completed: usize, total: usize);

    /// Called once after every item has an outcome
    fn on_finish(&self, _total: usize) {}
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn on_progress(&self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Writes progress to the debug log
#[derive(Debug, Clone)]
pub struct LogProgress {
    label: String,
}

impl LogProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl ProgressSink for LogProgress {
    fn on_progress(&self, completed: usize, total: usize) {
        debug!("{} [{}/{}]", self.label, completed, total);
    }
}
