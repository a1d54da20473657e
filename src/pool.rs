use std::{
    cell::Cell,
    fmt::{self, Debug},
    future::Future,
    mem,
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use multitask::{Executor, Task};
use parking::Unparker;

use crate::{Error, Result};

macro_rules! pin_mut {
    ($($x:ident),*) => { $(
        // Move the value to ensure that it is owned
        let mut $x = $x;
        // Shadow the original binding so that it can't be directly accessed
        // ever again.
        #[allow(unused_mut)]
        let mut $x = unsafe {
            Pin::new_unchecked(&mut $x)
        };
    )* }
}

const DEFAULT_THREAD_NAME: &str = "smallfor worker";

thread_local! {
    static ON_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is a worker of some [`TaskPool`].
///
/// Scopes opened on a worker run their futures inline, since blocking the
/// worker could starve the pool of the threads those futures need.
pub fn on_worker_thread() -> bool {
    ON_WORKER.with(Cell::get)
}

/// Configures and builds a [`TaskPool`].
///
/// Every knob is optional. An unconfigured builder produces one worker per
/// logical CPU.
#[derive(Debug, Default, Clone)]
#[must_use]
pub struct TaskPoolBuilder {
    num_threads: Option<usize>,
    thread_name: Option<String>,
    stack_size: Option<usize>,
}

impl TaskPoolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of worker threads. Zero is raised to one.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Base name for worker threads; each worker is named `"{name} ({index})"`.
    pub fn thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = Some(thread_name.into());
        self
    }

    /// Stack size in bytes for each worker thread.
    pub fn stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    pub fn build(self) -> Result<TaskPool> {
        TaskPool::from_builder(self)
    }
}

struct Worker {
    index: usize,
    handle: JoinHandle<()>,
    unparker: Unparker,
}

/// A fixed set of worker threads driving a shared executor.
///
/// The pool is released when dropped. Use [`TaskPool::shutdown`] to observe
/// a worker that could not be joined.
pub struct TaskPool {
    executor: Arc<Executor>,
    workers: Vec<Worker>,
    shutdown_flag: Arc<AtomicBool>,
}

impl TaskPool {
    /// One worker per logical CPU.
    pub fn new() -> Result<Self> {
        TaskPoolBuilder::new().build()
    }

    pub fn with_num_threads(num_threads: usize) -> Result<Self> {
        TaskPoolBuilder::new().num_threads(num_threads).build()
    }

    pub fn builder() -> TaskPoolBuilder {
        TaskPoolBuilder::new()
    }

    fn from_builder(builder: TaskPoolBuilder) -> Result<Self> {
        let num_threads = builder.num_threads.unwrap_or_else(num_cpus::get).max(1);
        let thread_name = builder
            .thread_name
            .unwrap_or_else(|| DEFAULT_THREAD_NAME.to_string());

        // Workers spawned before a failure are joined when `pool` drops.
        let mut pool = Self {
            executor: Arc::new(Executor::new()),
            workers: Vec::with_capacity(num_threads),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        };

        for index in 0..num_threads {
            let mut thread_builder = thread::Builder::new().name(format!("{thread_name} ({index})"));
            if let Some(stack_size) = builder.stack_size {
                thread_builder = thread_builder.stack_size(stack_size);
            }

            let ex = Arc::clone(&pool.executor);
            let flag = Arc::clone(&pool.shutdown_flag);
            let (parker, unparker) = parking::pair();
            let notify = unparker.clone();

            let handle = thread_builder
                .spawn(move || {
                    ON_WORKER.with(|on_worker| on_worker.set(true));
                    let ticker = ex.ticker(move || {
                        notify.unpark();
                    });
                    loop {
                        if flag.load(Ordering::Acquire) {
                            break;
                        }

                        match panic::catch_unwind(AssertUnwindSafe(|| ticker.tick())) {
                            Ok(true) => {}
                            Ok(false) => parker.park(),
                            Err(_) => {
                                tracing::error!(worker = index, "task panicked, aborting");
                                process::abort();
                            }
                        }
                    }
                })
                .map_err(|source| Error::Spawn { index, source })?;

            pool.workers.push(Worker {
                index,
                handle,
                unparker,
            });
        }

        tracing::debug!(threads = num_threads, name = %thread_name, "task pool started");
        Ok(pool)
    }

    pub fn thread_num(&self) -> usize {
        self.workers.len()
    }

    /// Runs `f`, then blocks until every future it spawned has completed.
    ///
    /// Spawned futures may borrow anything that outlives the call. Outputs are
    /// returned in spawn order.
    ///
    /// Called from a worker thread, the futures are polled to completion on
    /// that thread, in spawn order, instead of being handed to the pool.
    pub fn scope<'scope, F, T>(&self, f: F) -> Vec<T>
    where
        F: FnOnce(&mut Scope<'scope, T>) + 'scope + Send,
        T: Send + 'static,
    {
        if on_worker_thread() {
            let mut scope = Scope {
                executor: None,
                spawned: Vec::new(),
                inline: Vec::new(),
            };
            f(&mut scope);
            tracing::trace!(futures = scope.inline.len(), "nested scope running inline");
            return pollster::block_on(futures_util::future::join_all(scope.inline));
        }

        // SAFETY: the executor outlives this call, and this call does not
        // return until every task that holds the reference has finished.
        let executor: &'scope Executor = unsafe { mem::transmute(&*self.executor) };

        let fut = async move {
            let mut scope = Scope {
                executor: Some(executor),
                spawned: Vec::new(),
                inline: Vec::new(),
            };

            f(&mut scope);

            futures_util::future::join_all(scope.spawned).await
        };

        pin_mut!(fut);

        // SAFETY: `fut` lives on this stack frame, which is blocked below until
        // the task polling it has completed.
        let fut: Pin<&'static mut (dyn Future<Output = Vec<T>> + Send + 'static)> = unsafe {
            mem::transmute(fut as Pin<&mut (dyn Future<Output = Vec<T>> + Send)>)
        };

        let task = self.executor.spawn(fut);

        pollster::block_on(task)
    }

    pub fn shutdown(self) -> Result<()> {
        let mut this = self;
        this.shutdown_internal()
    }

    fn shutdown_internal(&mut self) -> Result<()> {
        if self.workers.is_empty() {
            return Ok(());
        }

        self.shutdown_flag.store(true, Ordering::Release);

        for worker in &self.workers {
            worker.unparker.unpark();
        }

        let mut result = Ok(());
        for worker in self.workers.drain(..) {
            if worker.handle.join().is_err() && result.is_ok() {
                result = Err(Error::ThreadPanicked {
                    index: worker.index,
                });
            }
        }

        tracing::debug!("task pool shut down");
        result
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown_internal() {
            tracing::error!(error = %err, "task pool shutdown failed");
        }
    }
}

impl Debug for TaskPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskPool")
            .field("thread_num", &self.thread_num())
            .finish()
    }
}

/// Spawns futures that [`TaskPool::scope`] waits on before returning.
pub struct Scope<'scope, T> {
    executor: Option<&'scope Executor>,
    spawned: Vec<Task<T>>,
    inline: Vec<Pin<Box<dyn Future<Output = T> + 'scope + Send>>>,
}

impl<'scope, T: Send + 'static> Scope<'scope, T> {
    pub fn spawn<Fut: Future<Output = T> + 'scope + Send>(&mut self, f: Fut) {
        let fut: Pin<Box<dyn Future<Output = T> + 'scope + Send>> = Box::pin(f);

        let Some(executor) = self.executor else {
            self.inline.push(fut);
            return;
        };

        // SAFETY: the owning `scope` call joins this task before `'scope` ends.
        let fut: Pin<Box<dyn Future<Output = T> + 'static + Send>> = unsafe { mem::transmute(fut) };

        let task = executor.spawn(fut);
        self.spawned.push(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn it_works() {
        let pool = TaskPool::new().unwrap();

        let foo = Box::new(42);
        let hits = AtomicUsize::new(0);

        pool.scope(|scope| {
            for _ in 0..1000 {
                scope.spawn(async {
                    if *foo == 42 {
                        hits.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });

        assert_eq!(hits.load(Ordering::Relaxed), 1000);
    }

    #[test]
    fn scope_returns_outputs_in_spawn_order() {
        let pool = TaskPool::with_num_threads(4).unwrap();
        let values: Vec<usize> = (0..64).collect();

        let outputs = pool.scope(|scope| {
            for value in &values {
                scope.spawn(async move { value * 2 });
            }
        });

        let expected: Vec<usize> = values.iter().map(|v| v * 2).collect();
        assert_eq!(outputs, expected);
    }

    #[test]
    fn empty_scope_returns_nothing() {
        let pool = TaskPool::with_num_threads(2).unwrap();
        let outputs: Vec<()> = pool.scope(|_| {});
        assert!(outputs.is_empty());
    }

    #[test]
    fn zero_threads_is_raised_to_one() {
        let pool = TaskPool::with_num_threads(0).unwrap();
        assert_eq!(pool.thread_num(), 1);

        let outputs = pool.scope(|scope| {
            scope.spawn(async { 1 });
            scope.spawn(async { 2 });
        });
        assert_eq!(outputs, vec![1, 2]);
    }

    #[test]
    fn default_pool_matches_cpu_count() {
        let pool = TaskPool::new().unwrap();
        assert_eq!(pool.thread_num(), num_cpus::get().max(1));
    }

    #[test]
    fn workers_carry_configured_name() {
        let pool = TaskPool::builder()
            .num_threads(2)
            .thread_name("named pool")
            .stack_size(256 * 1024)
            .build()
            .unwrap();

        let names = pool.scope(|scope| {
            for _ in 0..8 {
                scope.spawn(async { thread::current().name().map(str::to_string) });
            }
        });

        for name in names {
            let name = name.expect("worker threads are named");
            assert!(name.starts_with("named pool ("), "unexpected name {name}");
        }
    }

    #[test]
    fn scope_runs_off_the_calling_thread() {
        let pool = TaskPool::with_num_threads(2).unwrap();
        let caller = thread::current().id();

        let ids = pool.scope(|scope| {
            scope.spawn(async { thread::current().id() });
        });

        assert_ne!(ids[0], caller);
    }

    #[test]
    fn scope_can_be_reused() {
        let pool = TaskPool::with_num_threads(3).unwrap();
        for round in 0..20 {
            let outputs = pool.scope(|scope| {
                for i in 0..10 {
                    scope.spawn(async move { round * 10 + i });
                }
            });
            assert_eq!(outputs.len(), 10);
            assert_eq!(outputs[0], round * 10);
        }
    }

    #[test]
    fn nested_scope_runs_inline_on_worker() {
        let pool = TaskPool::with_num_threads(1).unwrap();
        assert!(!on_worker_thread());

        let outer = pool.scope(|scope| {
            scope.spawn(async {
                let worker = thread::current().id();
                let inner = pool.scope(|scope| {
                    for i in 0..4 {
                        scope.spawn(async move { (i, thread::current().id()) });
                    }
                });
                (on_worker_thread(), worker, inner)
            });
        });

        let (flagged, worker, inner) = &outer[0];
        assert!(*flagged);
        let expected: Vec<_> = (0..4).map(|i| (i, *worker)).collect();
        assert_eq!(inner, &expected);
    }

    #[test]
    fn shutdown_joins_workers() {
        let pool = TaskPool::with_num_threads(3).unwrap();
        assert!(pool.shutdown().is_ok());
    }

    #[test]
    fn debug_shows_thread_num() {
        let pool = TaskPool::with_num_threads(2).unwrap();
        assert_eq!(format!("{pool:?}"), "TaskPool { thread_num: 2 }");
    }
}
