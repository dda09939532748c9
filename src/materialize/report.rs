//! Materialization report.

use std::fmt;
use std::path::PathBuf;

use crate::orchestrator::{ItemFailure, RunReport};

/// Result of materializing one or more image lists.
#[derive(Debug, Default)]
pub struct MaterializeReport {
    /// Images assigned to the training subset.
    pub train: usize,
    /// Images assigned to the validation subset.
    pub val: usize,
    /// Per-image copy results for both subsets.
    pub run: RunReport<PathBuf>,
    /// Images never handed to a worker because their destination name is
    /// taken.
    pub rejected: Vec<ItemFailure<PathBuf>>,
    /// Label files with no matching image.
    pub orphan_labels: Vec<PathBuf>,
}

impl MaterializeReport {
    /// Fold the report of another country into this one.
    pub fn absorb(&mut self, other: MaterializeReport) {
        self.train += other.train;
        self.val += other.val;
        self.run.absorb(other.run);
        self.rejected.extend(other.rejected);
        self.orphan_labels.extend(other.orphan_labels);
    }

    pub fn succeeded(&self) -> usize {
        self.run.succeeded()
    }

    /// Failed and rejected images plus orphaned labels.
    pub fn failed(&self) -> usize {
        self.run.failed() + self.rejected.len() + self.orphan_labels.len()
    }

    /// Images attempted by a worker or rejected before the run.
    pub fn attempted(&self) -> usize {
        self.run.attempted() + self.rejected.len()
    }

    pub fn is_success(&self) -> bool {
        self.run.is_success() && self.rejected.is_empty() && self.orphan_labels.is_empty()
    }
}

impl fmt::Display for MaterializeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "split: {} train / {} val", self.train, self.val)?;
        write!(f, "{}", self.run)?;
        for failure in &self.rejected {
            writeln!(f, "  - {}", failure.error)?;
        }
        for orphan in &self.orphan_labels {
            writeln!(f, "  - label {} has no paired image", orphan.display())?;
        }
        Ok(())
    }
}
