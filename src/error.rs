use std::io;
use thiserror::Error;

use crate::sort::MAX_SHARD_EDGES;

pub type Result<T> = std::result::Result<T, SharderError>;

/// Error type for a sharding run. Every variant is fatal: nothing is
/// retried and partial outputs are left on disk for the caller to clean.
#[derive(Debug, Error)]
pub enum SharderError {
    /// I/O failure, tagged with the phase that performed the write/read.
    #[error("{phase}: {source}")]
    Io {
        phase: String,
        #[source]
        source: io::Error,
    },
    /// A shovel holds more edges than can be co-sorted in RAM.
    #[error("shard {shard} too large for in-memory sort: {len} edges (max {max})", max = MAX_SHARD_EDGES)]
    ShardTooLarge { shard: usize, len: usize },
    /// Edge-processor or codec failure, propagated unchanged.
    #[error("edge value error: {0}")]
    Value(String),
    /// A manifest file (vtranslate, intervals) did not parse.
    #[error("corrupt manifest: {0}")]
    Manifest(String),
}

impl SharderError {
    pub(crate) fn io(phase: impl Into<String>) -> impl FnOnce(io::Error) -> SharderError {
        let phase = phase.into();
        move |source| SharderError::Io { phase, source }
    }
}
