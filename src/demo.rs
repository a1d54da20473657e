//! The print-loop workload the `smallfor` binary dispatches.

use std::{
    io::{self, Write},
    thread,
};

use crate::{BlockedRange, Body};

/// Prints `0..limit` when invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    limit: u32,
}

impl Task {
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Writes this task's output to stdout.
    ///
    /// Each number is a separate write, so output from tasks running on other
    /// threads may land in between.
    pub fn invoke(&self) {
        if let Err(err) = self.write_to(&mut io::stdout()) {
            tracing::warn!(limit = self.limit, error = %err, "failed to write task output");
        }
    }

    /// Writes the header line, tagged with the current thread, then the digit
    /// line.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}## : ", thread_label())?;
        for i in 0..self.limit {
            write!(out, "{i} ")?;
        }
        writeln!(out)
    }

    /// The digit line without its newline, e.g. `"0 1 2 "` for a limit of 3.
    pub fn digits(&self) -> String {
        (0..self.limit).map(|i| format!("{i} ")).collect()
    }
}

/// Builds `n` tasks with limits `0..n`.
pub fn tasks(n: u32) -> Vec<Task> {
    (0..n).map(Task::new).collect()
}

/// Name of the current thread, or its id when it has none.
pub fn thread_label() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}

/// Runs a contiguous sub-range of tasks, in order, on the calling thread.
#[derive(Debug, Clone, Copy)]
pub struct Executor<'a> {
    tasks: &'a [Task],
}

impl<'a> Executor<'a> {
    pub fn new(tasks: &'a [Task]) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &'a [Task] {
        self.tasks
    }

    /// `[0, len)` over the borrowed tasks.
    pub fn full_range(&self) -> BlockedRange {
        BlockedRange::new(0, self.tasks.len())
    }

    /// # Panics
    ///
    /// Panics if `range` reaches past the end of the tasks.
    pub fn run(&self, range: BlockedRange) {
        self.run_with(range, |_, task| task.invoke());
    }

    /// Calls `f` with each index in `range` and its task, in ascending order.
    ///
    /// # Panics
    ///
    /// Panics if `range` reaches past the end of the tasks.
    pub fn run_with<F>(&self, range: BlockedRange, mut f: F)
    where
        F: FnMut(usize, &Task),
    {
        for (index, task) in range.indices().zip(&self.tasks[range.indices()]) {
            f(index, task);
        }
    }
}

impl Body for Executor<'_> {
    fn run(&self, range: BlockedRange) {
        Executor::run(self, range);
    }
}
