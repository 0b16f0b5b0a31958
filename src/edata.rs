#![forbid(unsafe_code)]
//! Compressed edge-data block directory.
//!
//! The sorted value bytes of a shard are cut into fixed-size blocks, each
//! deflate-compressed into its own file named by ordinal inside the shard's
//! block directory. A sidecar records the uncompressed total so readers can
//! truncate the concatenated blocks back to the exact payload.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{Result, SharderError};
use crate::filenames;

/// Writes the `.size` sidecar and the block directory for one shard's
/// value bytes.
pub fn write_edge_data(
    base: &str,
    shard: usize,
    num_shards: usize,
    value_size: usize,
    values: &[u8],
) -> Result<()> {
    let io = |e| SharderError::Io {
        phase: format!("writing edge data for shard {shard}"),
        source: e,
    };

    let edata = filenames::edge_data(base, value_size, shard, num_shards);
    let block_size = filenames::block_size(value_size);

    fs::write(
        filenames::edge_data_size(&edata),
        values.len().to_string(),
    )
    .map_err(io)?;

    let block_dir = filenames::edge_data_block_dir(&edata, block_size);
    fs::create_dir_all(&block_dir).map_err(io)?;

    for (index, block) in values.chunks(block_size).enumerate() {
        let path = filenames::edge_data_block(&block_dir, index);
        let file = File::create(path).map_err(io)?;
        let mut encoder = ZlibEncoder::new(BufWriter::new(file), Compression::default());
        encoder.write_all(block).map_err(io)?;
        encoder.finish().and_then(|mut w| w.flush()).map_err(io)?;
    }
    Ok(())
}

/// Reassembles a shard's value bytes from its block directory, the inverse
/// of [`write_edge_data`]. Used by verification and the engine-facing test
/// suite.
pub fn read_edge_data(
    base: &str,
    shard: usize,
    num_shards: usize,
    value_size: usize,
) -> Result<Vec<u8>> {
    let io = |e| SharderError::Io {
        phase: format!("reading edge data for shard {shard}"),
        source: e,
    };

    let edata = filenames::edge_data(base, value_size, shard, num_shards);
    let block_size = filenames::block_size(value_size);

    let size_text = fs::read_to_string(filenames::edge_data_size(&edata)).map_err(io)?;
    let total: usize = size_text
        .trim()
        .parse()
        .map_err(|_| SharderError::Manifest(format!("bad edge-data size {size_text:?}")))?;

    let block_dir = filenames::edge_data_block_dir(&edata, block_size);
    let mut out = Vec::with_capacity(total);
    let mut index = 0;
    while out.len() < total {
        let path = filenames::edge_data_block(&block_dir, index);
        let file = File::open(path).map_err(io)?;
        ZlibDecoder::new(file).read_to_end(&mut out).map_err(io)?;
        index += 1;
    }
    out.truncate(total);
    Ok(out)
}
