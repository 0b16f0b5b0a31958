//! Offline graph sharder for streaming out-of-core graph engines.
//!
//! Ingests an unbounded edge stream, deterministically renumbers vertex
//! ids, partitions edges by destination, sorts each partition by source,
//! and emits the binary shard set (adjacency streams, compressed edge-data
//! block directories, degree table, interval/translate manifests) the
//! engine consumes interval by interval.

pub mod adjacency;
pub mod config;
pub mod degree;
pub mod edata;
pub mod error;
pub mod filenames;
pub mod sharder;
pub mod shovel;
pub mod sort;
pub mod translate;
pub mod value;

/// Original and translated vertex ids are 32-bit; translator arithmetic is
/// 64-bit internally.
pub type VertexId = u32;

pub use crate::config::SharderConfig;
pub use crate::error::{Result, SharderError};
pub use crate::sharder::{Sharder, SharderSummary};
pub use crate::translate::IdTranslate;
pub use crate::value::{
    EdgeProcessor, EmptyCodec, EmptyProcessor, F32Codec, F32Processor, U32Codec, U32Processor,
    ValueCodec,
};
