//! Parallel worker orchestration.
//!
//! [`run_parallel`] starts one worker per shard on a rayon pool sized to the
//! shard count, applies a per-item transform inside each worker and joins
//! all workers before returning. Item failures are collected per shard and
//! never abort sibling items or sibling workers.
//!
//! # Example
//!
//! ```
//! use rddprep::orchestrator::{run_parallel, RunOptions};
//! use rddprep::partition::partition;
//!
//! let shards = partition((1..=10).collect::<Vec<u32>>(), 3).unwrap();
//! let report = run_parallel(shards, &RunOptions::default(), |_item| Ok(())).unwrap();
//! assert_eq!(report.succeeded(), 10);
//! assert!(report.is_success());
//! ```

mod report;

pub use report::{ItemFailure, RunReport, ShardOutcome};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use log::{debug, warn};

use crate::error::PrepError;
use crate::partition::Shard;

/// Cooperative cancellation flag shared between the caller and workers.
///
/// Workers check the flag between items, so an in-flight item always runs
/// to completion.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that workers stop before their next item.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for a single orchestrator run.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Token observed between items.
    pub cancel: CancelToken,
    /// Trip `cancel` on the first item failure.
    pub fail_fast: bool,
}

/// Process every shard on its own worker and wait for all of them.
///
/// The pool is built for this call only and has exactly `shards.len()`
/// threads. Items inside a shard are processed in order; there is no
/// ordering between shards. The returned report lists shard outcomes
/// sorted by shard index.
///
/// # Errors
///
/// Only fails if the worker pool cannot be created. Per-item errors are
/// part of the returned [`RunReport`].
pub fn run_parallel<T, F>(
    shards: Vec<Shard<T>>,
    opts: &RunOptions,
    transform: F,
) -> Result<RunReport<T>, PrepError>
where
    T: Send,
    F: Fn(&T) -> Result<(), PrepError> + Sync,
{
    if shards.is_empty() {
        return Ok(RunReport::new(Vec::new()));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(shards.len())
        .thread_name(|index| format!("rddprep-worker-{index}"))
        .build()?;

    let (tx, rx) = mpsc::channel();
    let transform = &transform;

    pool.scope(|scope| {
        for shard in shards {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let outcome = run_shard(shard, opts, transform);
                // The receiver outlives the scope.
                let _ = tx.send(outcome);
            });
        }
    });
    drop(tx);

    let mut outcomes: Vec<ShardOutcome<T>> = rx.into_iter().collect();
    outcomes.sort_by_key(|outcome| outcome.index);
    Ok(RunReport::new(outcomes))
}

fn run_shard<T, F>(shard: Shard<T>, opts: &RunOptions, transform: &F) -> ShardOutcome<T>
where
    F: Fn(&T) -> Result<(), PrepError>,
{
    let Shard { index, items } = shard;
    let total = items.len();
    let mut outcome = ShardOutcome::new(index);

    debug!("shard {index}: starting with {total} item(s)");

    for (position, item) in items.into_iter().enumerate() {
        if opts.cancel.is_cancelled() {
            outcome.skipped = total - position;
            debug!("shard {index}: cancelled, skipping {} item(s)", outcome.skipped);
            break;
        }

        match transform(&item) {
            Ok(()) => outcome.succeeded += 1,
            Err(error) => {
                warn!("shard {index}: {error}");
                if opts.fail_fast {
                    opts.cancel.cancel();
                }
                outcome.failures.push(ItemFailure { item, error });
            }
        }
    }

    outcome
}
