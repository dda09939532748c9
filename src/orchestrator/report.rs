//! Run report types for orchestrator results.

use std::fmt;

use crate::error::PrepError;

/// A single item that failed inside a worker.
#[derive(Debug)]
pub struct ItemFailure<T> {
    /// The work item, as it was handed to the worker.
    pub item: T,
    /// What went wrong.
    pub error: PrepError,
}

/// Outcome of one worker processing one shard.
#[derive(Debug)]
pub struct ShardOutcome<T> {
    /// Index of the shard this worker processed.
    pub index: usize,
    /// Items transformed without error.
    pub succeeded: usize,
    /// Items never started because the run was cancelled.
    pub skipped: usize,
    /// Items whose transform returned an error.
    pub failures: Vec<ItemFailure<T>>,
}

impl<T> ShardOutcome<T> {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            succeeded: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }
}

/// Aggregate result of one or more orchestrator runs.
#[derive(Debug)]
pub struct RunReport<T> {
    pub shards: Vec<ShardOutcome<T>>,
}

impl<T> RunReport<T> {
    pub(crate) fn new(shards: Vec<ShardOutcome<T>>) -> Self {
        Self { shards }
    }

    /// Fold another run into this one (e.g. the validation half of a split).
    pub fn absorb(&mut self, other: RunReport<T>) {
        self.shards.extend(other.shards);
    }

    pub fn succeeded(&self) -> usize {
        self.shards.iter().map(|s| s.succeeded).sum()
    }

    pub fn failed(&self) -> usize {
        self.shards.iter().map(|s| s.failures.len()).sum()
    }

    pub fn skipped(&self) -> usize {
        self.shards.iter().map(|s| s.skipped).sum()
    }

    /// Items that were attempted, successfully or not.
    pub fn attempted(&self) -> usize {
        self.succeeded() + self.failed()
    }

    pub fn was_cancelled(&self) -> bool {
        self.skipped() > 0
    }

    /// True when every item was processed and none failed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped() == 0
    }

    /// Iterate over all failures, shard by shard.
    pub fn failures(&self) -> impl Iterator<Item = &ItemFailure<T>> {
        self.shards.iter().flat_map(|s| s.failures.iter())
    }
}

impl<T> Default for RunReport<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> fmt::Display for RunReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "processed {} item(s), failed {} item(s)",
            self.attempted(),
            self.failed()
        )?;

        if self.was_cancelled() {
            writeln!(f, "cancelled: {} item(s) not started", self.skipped())?;
        }

        for failure in self.failures() {
            writeln!(f, "  - {}", failure.error)?;
        }

        Ok(())
    }
}
