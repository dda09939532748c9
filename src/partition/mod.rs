//! Work partitioning.
//!
//! Splits an ordered list of work items into a fixed number of contiguous
//! shards, one per worker. Partitioning is deterministic and lossless: every
//! item lands in exactly one shard and the relative order is preserved.

use crate::error::PrepError;

/// A contiguous run of work items assigned to exactly one worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shard<T> {
    /// Position of this shard in the partition (0-based).
    pub index: usize,
    /// Items in their original order.
    pub items: Vec<T>,
}

impl<T> Shard<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Partition `items` into exactly `workers` shards.
///
/// Each shard receives `len / workers` consecutive items and any remainder
/// is appended to the last shard. When there are fewer items than workers,
/// item `i` goes to shard `i` and the trailing shards stay empty.
///
/// # Errors
///
/// Returns [`PrepError::InvalidConfiguration`] if `workers` is zero.
pub fn partition<T>(items: Vec<T>, workers: usize) -> Result<Vec<Shard<T>>, PrepError> {
    if workers == 0 {
        return Err(PrepError::InvalidConfiguration {
            message: "worker count must be at least 1".to_string(),
        });
    }

    let total = items.len();
    let base = total / workers;
    let mut remaining = items.into_iter();
    let mut shards = Vec::with_capacity(workers);

    for index in 0..workers {
        let take = if total < workers {
            usize::from(index < total)
        } else if index + 1 == workers {
            total - base * (workers - 1)
        } else {
            base
        };

        shards.push(Shard {
            index,
            items: remaining.by_ref().take(take).collect(),
        });
    }

    debug_assert!(remaining.next().is_none());
    Ok(shards)
}
