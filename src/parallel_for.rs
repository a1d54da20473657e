//! Blocked-range parallel-for on a [`TaskPool`].
//!
//! The range is cut by a [`Partitioner`] and each piece is handed to the
//! [`Body`] exactly once. Pieces may run in any order and concurrently; the
//! call returns only after every piece has run.

use crate::{BlockedRange, Partitioner, TaskPool};

/// Work applied to one piece of a range.
///
/// Implemented for every `Fn(BlockedRange) + Sync`, so closures work directly.
pub trait Body: Sync {
    fn run(&self, range: BlockedRange);
}

impl<F> Body for F
where
    F: Fn(BlockedRange) + Sync,
{
    fn run(&self, range: BlockedRange) {
        self(range)
    }
}

impl TaskPool {
    /// Runs `body` over `range` with the default [`Partitioner`].
    pub fn parallel_for<B: Body + ?Sized>(&self, range: BlockedRange, body: &B) {
        self.parallel_for_with(range, Partitioner::default(), body)
    }

    pub fn parallel_for_with<B: Body + ?Sized>(
        &self,
        range: BlockedRange,
        partitioner: Partitioner,
        body: &B,
    ) {
        let pieces = partitioner.partition(range, self.thread_num());
        tracing::debug!(
            begin = range.begin(),
            end = range.end(),
            grainsize = range.grainsize(),
            pieces = pieces.len(),
            ?partitioner,
            "parallel_for"
        );

        // Nothing to fan out, or nested inside a body already running on a
        // worker: run in order on this thread.
        if pieces.len() <= 1 || crate::pool::on_worker_thread() {
            for piece in pieces {
                body.run(piece);
            }
            return;
        }

        self.scope(|scope| {
            for piece in pieces {
                scope.spawn(async move {
                    tracing::trace!(begin = piece.begin(), end = piece.end(), "running piece");
                    body.run(piece);
                });
            }
        });
    }
}

/// The same contract with every piece run on the calling thread, in
/// ascending order.
pub mod serial {
    use super::Body;
    use crate::{BlockedRange, Partitioner};

    pub fn parallel_for<B: Body + ?Sized>(range: BlockedRange, body: &B) {
        parallel_for_with(range, Partitioner::default(), body)
    }

    pub fn parallel_for_with<B: Body + ?Sized>(
        range: BlockedRange,
        partitioner: Partitioner,
        body: &B,
    ) {
        let pieces = partitioner.partition(range, 1);
        tracing::debug!(
            begin = range.begin(),
            end = range.end(),
            pieces = pieces.len(),
            ?partitioner,
            "serial parallel_for"
        );
        for piece in pieces {
            body.run(piece);
        }
    }
}
