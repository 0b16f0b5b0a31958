//! On-disk layout of a sharded graph.
//!
//! Every artifact path derives from the run's base filename, the shard
//! count, and (for edge data) the value width. Readers on the engine side
//! rebuild the same names, so nothing here may depend on ambient state.

use std::path::{Path, PathBuf};

/// Scratch file the first pass spills shard `shard`'s edges into. Must not
/// exist after a successful run.
pub fn shovel(base: &str, shard: usize) -> PathBuf {
    PathBuf::from(format!("{base}.shovel.{shard}"))
}

/// Adjacency stream of shard `shard`.
pub fn adjacency(base: &str, shard: usize, num_shards: usize) -> PathBuf {
    PathBuf::from(format!("{base}.{shard}.{num_shards}.adj"))
}

/// Intervals manifest: one line per shard with the inclusive upper bound of
/// its vertex interval.
pub fn intervals(base: &str, num_shards: usize) -> PathBuf {
    PathBuf::from(format!("{base}.{num_shards}.intervals"))
}

/// Persisted definition of the final id translate.
pub fn vertex_translate(base: &str, num_shards: usize) -> PathBuf {
    PathBuf::from(format!("{base}.{num_shards}.vtranslate"))
}

/// Degree table, dense or sparse flavor.
pub fn degrees(base: &str, sparse: bool) -> PathBuf {
    if sparse {
        PathBuf::from(format!("{base}.degreesSparse.bin"))
    } else {
        PathBuf::from(format!("{base}.degrees.bin"))
    }
}

/// Stem shared by a shard's edge-data artifacts.
pub fn edge_data(base: &str, value_size: usize, shard: usize, num_shards: usize) -> String {
    format!("{base}.edata_java.{value_size}B.{shard}.{num_shards}")
}

/// Sidecar carrying the decimal uncompressed edge-data byte length.
pub fn edge_data_size(edata: &str) -> PathBuf {
    PathBuf::from(format!("{edata}.size"))
}

/// Directory holding a shard's compressed edge-data blocks.
pub fn edge_data_block_dir(edata: &str, block_size: usize) -> PathBuf {
    PathBuf::from(format!("{edata}_blockdir_{block_size}"))
}

/// Block file `index` inside a block directory. Blocks are named by their
/// zero-based ordinal.
pub fn edge_data_block(block_dir: &Path, index: usize) -> PathBuf {
    block_dir.join(index.to_string())
}

/// Block size the engine expects for a given value width: a 4 MiB base
/// rounded down so every block holds whole values.
pub fn block_size(value_size: usize) -> usize {
    const BASE: usize = 4096 * 1024;
    if value_size == 0 || value_size >= BASE {
        BASE.max(value_size)
    } else {
        BASE - BASE % value_size
    }
}
