#![forbid(unsafe_code)]
//! Run-length adjacency stream.
//!
//! The stream encodes, per source vertex of a shard, its ordered out-edge
//! list. A run of `c` edges for one source is a count prefix (one byte `c`,
//! or `0xFF` + little-endian u32 for `c >= 255`) followed by `c`
//! little-endian u32 destination ids. Gaps of zero-out-degree vertices
//! between sources are covered by token pairs `(0, k)`: one zero-degree
//! vertex plus `k` more, chained until the gap is spent. A leading gap
//! counts every vertex below the first source.

use std::convert::TryInto;
use std::io::{self, ErrorKind, Read, Write};

use crate::shovel::{unpack_dst, unpack_src};
use crate::VertexId;

/// Extended-count marker: run lengths of 255 and above spill into a u32.
const LONG_COUNT: u8 = 0xff;

/// Writes the adjacency stream for a shard's sorted key array.
pub fn write_adjacency<W: Write>(out: &mut W, keys: &[u64]) -> io::Result<()> {
    let mut prev_src: Option<VertexId> = None;
    let mut i = 0;
    while i < keys.len() {
        let src = unpack_src(keys[i]);
        let mut end = i + 1;
        while end < keys.len() && unpack_src(keys[end]) == src {
            end += 1;
        }

        let gap = match prev_src {
            None => u64::from(src),
            Some(prev) => u64::from(src) - u64::from(prev) - 1,
        };
        write_zero_gap(out, gap)?;

        let count = end - i;
        if count < LONG_COUNT as usize {
            out.write_all(&[count as u8])?;
        } else {
            out.write_all(&[LONG_COUNT])?;
            out.write_all(&(count as u32).to_le_bytes())?;
        }
        for &key in &keys[i..end] {
            out.write_all(&unpack_dst(key).to_le_bytes())?;
        }

        prev_src = Some(src);
        i = end;
    }
    Ok(())
}

fn write_zero_gap<W: Write>(out: &mut W, mut gap: u64) -> io::Result<()> {
    while gap > 0 {
        out.write_all(&[0])?;
        gap -= 1;
        let tail = gap.min(254);
        out.write_all(&[tail as u8])?;
        gap -= tail;
    }
    Ok(())
}

/// Streaming reader over an adjacency file, yielding one source run at a
/// time. Zero-gap tokens advance the vertex cursor without producing runs.
pub struct AdjacencyReader<R> {
    input: R,
    next_vertex: VertexId,
}

impl<R: Read> AdjacencyReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            next_vertex: 0,
        }
    }

    /// Next `(source, destinations)` run, or `None` at end of stream.
    pub fn next_run(&mut self) -> io::Result<Option<(VertexId, Vec<VertexId>)>> {
        loop {
            let mut prefix = [0u8; 1];
            match self.input.read_exact(&mut prefix) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(e),
            }

            if prefix[0] == 0 {
                let mut more = [0u8; 1];
                self.input.read_exact(&mut more)?;
                self.next_vertex += 1 + u32::from(more[0]);
                continue;
            }

            let count = if prefix[0] == LONG_COUNT {
                let mut buf = [0u8; 4];
                self.input.read_exact(&mut buf)?;
                u32::from_le_bytes(buf) as usize
            } else {
                prefix[0] as usize
            };

            let mut raw = vec![0u8; count * 4];
            self.input.read_exact(&mut raw)?;
            let dests = raw
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes(c.try_into().expect("chunk is 4 bytes")))
                .collect();

            let src = self.next_vertex;
            self.next_vertex += 1;
            return Ok(Some((src, dests)));
        }
    }
}
