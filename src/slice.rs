use crate::TaskPool;

/// Chunked maps over a slice, one pool task per chunk.
pub trait ParallelSlice<T: Sync>: AsRef<[T]> {
    /// Applies `f` to each `chunk_size` chunk and returns the results in chunk
    /// order. A `chunk_size` of 0 is treated as 1.
    fn par_chunk_map<F, R>(&self, task_pool: &TaskPool, chunk_size: usize, f: F) -> Vec<R>
    where
        F: Fn(&[T]) -> R + Send + Sync,
        R: Send + 'static,
    {
        let slice = self.as_ref();
        let f = &f;
        task_pool.scope(|scope| {
            for chunk in slice.chunks(chunk_size.max(1)) {
                scope.spawn(async move { f(chunk) });
            }
        })
    }

    /// Like [`par_chunk_map`](Self::par_chunk_map), with the chunk size picked
    /// so that at most `max_tasks` chunks are produced. `None` means one chunk
    /// per worker thread.
    fn par_splat_map<F, R>(&self, task_pool: &TaskPool, max_tasks: Option<usize>, f: F) -> Vec<R>
    where
        F: Fn(&[T]) -> R + Send + Sync,
        R: Send + 'static,
    {
        let slice = self.as_ref();
        let max_tasks = max_tasks.unwrap_or_else(|| task_pool.thread_num()).max(1);
        let chunk_size = slice.len().div_ceil(max_tasks).max(1);
        slice.par_chunk_map(task_pool, chunk_size, f)
    }
}

impl<S, T: Sync> ParallelSlice<T> for S where S: AsRef<[T]> + ?Sized {}
