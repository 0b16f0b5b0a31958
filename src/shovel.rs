#![forbid(unsafe_code)]
//! Per-shard scratch files for the first pass.
//!
//! A shovel record is the 8-byte packed `(src, dst)` key followed by the
//! fixed-width edge value. The key is stored big-endian so that a shovel
//! loaded into a `u64` array sorts by `(src, dst)` when compared as
//! unsigned integers, independent of host endianness.

use std::convert::TryInto;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::PathBuf;

use crate::error::{Result, SharderError};
use crate::filenames;
use crate::sort::MAX_SHARD_EDGES;
use crate::translate::IdTranslate;
use crate::VertexId;

/// Packs a source/destination pair with the source in the high half, so
/// unsigned 64-bit order is `(src, dst)` order.
pub fn pack_edge(src: VertexId, dst: VertexId) -> u64 {
    (u64::from(src) << 32) | u64::from(dst)
}

pub fn unpack_src(key: u64) -> VertexId {
    (key >> 32) as VertexId
}

pub fn unpack_dst(key: u64) -> VertexId {
    (key & 0xffff_ffff) as VertexId
}

/// Buffered appender for one shard's shovel. Appends are unordered; the
/// second pass sorts.
pub struct ShovelWriter {
    shard: usize,
    path: PathBuf,
    out: BufWriter<File>,
}

impl ShovelWriter {
    pub fn create(base: &str, shard: usize) -> Result<Self> {
        let path = filenames::shovel(base, shard);
        let file = File::create(&path).map_err(SharderError::io(format!(
            "creating shovel for shard {shard}"
        )))?;
        Ok(Self {
            shard,
            path,
            out: BufWriter::new(file),
        })
    }

    /// Appends one record: pre-translated key, then `value` bytes.
    pub fn append(&mut self, pre_src: VertexId, pre_dst: VertexId, value: &[u8]) -> Result<()> {
        let key = pack_edge(pre_src, pre_dst);
        let io = SharderError::io(format!("appending to shovel {}", self.shard));
        self.out
            .write_all(&key.to_be_bytes())
            .and_then(|()| self.out.write_all(value))
            .map_err(io)
    }

    /// Flushes buffered records and returns the shovel path for the second
    /// pass to consume.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.out
            .flush()
            .map_err(SharderError::io(format!("flushing shovel {}", self.shard)))?;
        Ok(self.path)
    }
}

/// A shovel loaded into RAM: the key array and the value bytes at matching
/// indices, both re-translated into the final layout.
pub struct LoadedShovel {
    pub keys: Vec<u64>,
    pub values: Vec<u8>,
}

impl LoadedShovel {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Reads shard `shard`'s shovel whole, rewriting every packed key through
/// `final.forward(pre.backward(id))`. Fails fast when the shovel exceeds
/// the in-memory sort ceiling.
pub fn load(
    base: &str,
    shard: usize,
    value_size: usize,
    pre: &IdTranslate,
    fin: &IdTranslate,
) -> Result<LoadedShovel> {
    let path = filenames::shovel(base, shard);
    let io = |e| SharderError::Io {
        phase: format!("loading shovel {shard}"),
        source: e,
    };
    let file = File::open(&path).map_err(io)?;
    let file_len = file.metadata().map_err(io)?.len();

    let record = 8 + value_size as u64;
    let count = (file_len / record) as usize;
    if count > MAX_SHARD_EDGES {
        return Err(SharderError::ShardTooLarge {
            shard,
            len: count,
        });
    }

    let mut raw = Vec::with_capacity(file_len as usize);
    let mut reader = file;
    reader.read_to_end(&mut raw).map_err(io)?;

    let mut keys = Vec::with_capacity(count);
    let mut values = vec![0u8; count * value_size];
    for i in 0..count {
        let off = i * record as usize;
        let packed = u64::from_be_bytes(raw[off..off + 8].try_into().expect("slice is 8 bytes"));
        let src = fin.forward(pre.backward(unpack_src(packed)));
        let dst = fin.forward(pre.backward(unpack_dst(packed)));
        keys.push(pack_edge(src, dst));
        values[i * value_size..(i + 1) * value_size]
            .copy_from_slice(&raw[off + 8..off + 8 + value_size]);
    }

    Ok(LoadedShovel { keys, values })
}
