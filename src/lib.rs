//! A small scoped task pool with a blocked-range parallel-for.
//!
//! ```no_run
//! use smallfor::{BlockedRange, TaskPool};
//!
//! let pool = TaskPool::new()?;
//! pool.parallel_for(BlockedRange::new(0, 10), &|range: BlockedRange| {
//!     for i in range {
//!         println!("{i} on {:?}", std::thread::current().id());
//!     }
//! });
//! # Ok::<(), smallfor::Error>(())
//! ```

pub mod demo;
pub mod error;
pub mod parallel_for;
pub mod partition;
pub mod pool;
pub mod range;
pub mod slice;

pub use error::{Error, Result};
pub use parallel_for::{serial, Body};
pub use partition::Partitioner;
pub use pool::{Scope, TaskPool, TaskPoolBuilder};
pub use range::BlockedRange;
pub use slice::ParallelSlice;
