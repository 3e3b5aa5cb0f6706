use anyhow::Error;
use log::{error, info};

/// Terminal outcome of one batch item
#[derive(Debug)]
pub struct ItemOutcome<R> {
    /// Position of the item in the submitted collection
    pub index: usize,
    pub result: anyhow::Result<R>,
}

impl<R> ItemOutcome<R> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-item outcomes of a finished batch, ordered by item index
#[derive(Debug)]
pub struct BatchReport<R> {
    outcomes: Vec<ItemOutcome<R>>,
}

impl<R> BatchReport<R> {
    pub fn new(mut outcomes: Vec<ItemOutcome<R>>) -> Self {
        outcomes.sort_by_key(|outcome| outcome.index);
        Self { outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[ItemOutcome<R>] {
        &self.outcomes
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (usize, &R)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|value| (o.index, value)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (usize, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|err| (o.index, err)))
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(ItemOutcome::is_success)
    }

    /// Results in item order
    pub fn into_results(self) -> Vec<anyhow::Result<R>> {
        self.outcomes.into_iter().map(|o| o.result).collect()
    }

    pub fn log_summary(&self, label: &str) {
        info!(
            "{}: {} of {} succeeded, {} failed",
            label,
            self.success_count(),
            self.len(),
            self.failure_count()
        );
        for (index, err) in self.failed() {
            error!("{} item #{} failed: {:#}", label, index, err);
        }
    }
}
