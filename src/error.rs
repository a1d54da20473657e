use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to spawn worker thread {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: io::Error,
    },

    #[error("worker thread {index} panicked during execution")]
    ThreadPanicked { index: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
