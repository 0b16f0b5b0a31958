#![forbid(unsafe_code)]
//! Vertex degree accumulation and the on-disk degree table.
//!
//! Two strategies produce the same file: dense in-RAM counters incremented
//! while shards are encoded, and a replay pass that re-reads the
//! just-written adjacency streams interval by interval so only a bounded
//! slice of counts is resident at a time. Output is either dense (two
//! little-endian u32 per vertex) or sparse (id/in/out triples for vertices
//! with at least one edge).

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use tracing::info;

use crate::adjacency::AdjacencyReader;
use crate::error::{Result, SharderError};
use crate::filenames;
use crate::translate::IdTranslate;
use crate::VertexId;

const DEGREE_PHASE: &str = "degree-write";

/// Process-wide operator override: `sparsedeg=1` forces the sparse format.
pub fn sparse_forced_by_env() -> bool {
    std::env::var("sparsedeg").map(|v| v == "1").unwrap_or(false)
}

/// Dense output iff the vertex space is no larger than the edge count;
/// sparse when the operator forces it.
pub fn use_sparse(max_vertex_id: VertexId, num_edges: u64, force: bool) -> bool {
    force || sparse_forced_by_env() || u64::from(max_vertex_id) > num_edges
}

/// In-RAM strategy: dense counters over the padded vertex range
/// `[0, max_vertex_id + num_shards)`.
pub struct DegreeCounts {
    in_degrees: Vec<u32>,
    out_degrees: Vec<u32>,
}

impl DegreeCounts {
    pub fn new(len: usize) -> Self {
        Self {
            in_degrees: vec![0; len],
            out_degrees: vec![0; len],
        }
    }

    /// Counts one translated edge. Both endpoints must lie inside the
    /// padded range.
    pub fn count_edge(&mut self, src: VertexId, dst: VertexId) {
        debug_assert!((src as usize) < self.out_degrees.len());
        debug_assert!((dst as usize) < self.in_degrees.len());
        self.out_degrees[src as usize] += 1;
        self.in_degrees[dst as usize] += 1;
    }

    /// Serializes the table in the chosen flavor.
    pub fn write(&self, base: &str, sparse: bool) -> Result<()> {
        let io = SharderError::io(DEGREE_PHASE);
        let file = File::create(filenames::degrees(base, sparse)).map_err(io)?;
        let mut out = BufWriter::new(file);
        for i in 0..self.in_degrees.len() {
            write_degree_record(
                &mut out,
                sparse,
                i as VertexId,
                self.in_degrees[i],
                self.out_degrees[i],
            )
            .map_err(SharderError::io(DEGREE_PHASE))?;
        }
        out.flush().map_err(SharderError::io(DEGREE_PHASE))
    }
}

fn write_degree_record<W: Write>(
    out: &mut W,
    sparse: bool,
    id: VertexId,
    in_degree: u32,
    out_degree: u32,
) -> std::io::Result<()> {
    if sparse {
        if in_degree + out_degree > 0 {
            out.write_all(&id.to_le_bytes())?;
            out.write_all(&in_degree.to_le_bytes())?;
            out.write_all(&out_degree.to_le_bytes())?;
        }
    } else {
        out.write_all(&in_degree.to_le_bytes())?;
        out.write_all(&out_degree.to_le_bytes())?;
    }
    Ok(())
}

/// Replay strategy: derive degrees from the shards themselves.
///
/// Vertices are visited interval by interval in sub-intervals of
/// `subinterval` ids. In-edges of interval `p` live solely in shard `p`;
/// out-edges are drawn from every shard's stream, which is consumed in a
/// single forward sweep since adjacency is sorted by source. Produces a
/// file identical to the in-RAM strategy on the same input.
pub fn replay_degrees(
    base: &str,
    num_shards: usize,
    translate: &IdTranslate,
    max_vertex_id: VertexId,
    sparse: bool,
    subinterval: u32,
) -> Result<()> {
    assert!(subinterval > 0, "sub-interval must be positive");
    let total = u64::from(max_vertex_id) + num_shards as u64;
    let interval_len = translate.interval_length();

    info!(
        shards = num_shards,
        vertices = total,
        subinterval,
        "sharder.degree.replay"
    );

    let io = SharderError::io(DEGREE_PHASE);
    let file = File::create(filenames::degrees(base, sparse)).map_err(io)?;
    let mut out = BufWriter::new(file);

    let mut sliding: Vec<SlidingShard> = (0..num_shards)
        .map(|shard| SlidingShard::open(base, shard, num_shards))
        .collect::<Result<_>>()?;

    for p in 0..num_shards {
        let start = p as u64 * interval_len;
        let end = ((p as u64 + 1) * interval_len).min(total);
        if start >= total {
            break;
        }

        let mut sub = start;
        while sub < end {
            let sub_end = (sub + u64::from(subinterval)).min(end);
            let width = (sub_end - sub) as usize;
            let mut in_degrees = vec![0u32; width];
            let mut out_degrees = vec![0u32; width];

            scan_in_degrees(base, p, num_shards, sub, sub_end, &mut in_degrees)?;
            for shard in sliding.iter_mut() {
                shard.accumulate_out(sub, sub_end, &mut out_degrees)?;
            }

            for i in 0..width {
                write_degree_record(
                    &mut out,
                    sparse,
                    (sub + i as u64) as VertexId,
                    in_degrees[i],
                    out_degrees[i],
                )
                .map_err(SharderError::io(DEGREE_PHASE))?;
            }
            sub = sub_end;
        }
    }

    // The interval tiling can stop just short of the padded range; the
    // uncovered tail is always zero-degree.
    let covered = (num_shards as u64 * interval_len).min(total);
    if !sparse {
        for _ in covered..total {
            out.write_all(&[0u8; 8])
                .map_err(SharderError::io(DEGREE_PHASE))?;
        }
    }
    out.flush().map_err(SharderError::io(DEGREE_PHASE))
}

/// In-degrees for `[sub, sub_end)` of interval `p`: every edge in shard `p`
/// points into interval `p`, so one scan of that stream suffices.
fn scan_in_degrees(
    base: &str,
    shard: usize,
    num_shards: usize,
    sub: u64,
    sub_end: u64,
    in_degrees: &mut [u32],
) -> Result<()> {
    let file = File::open(filenames::adjacency(base, shard, num_shards))
        .map_err(SharderError::io(DEGREE_PHASE))?;
    let mut reader = AdjacencyReader::new(BufReader::new(file));
    while let Some((_, dests)) = reader.next_run().map_err(SharderError::io(DEGREE_PHASE))? {
        for dst in dests {
            let dst = u64::from(dst);
            if dst >= sub && dst < sub_end {
                in_degrees[(dst - sub) as usize] += 1;
            }
        }
    }
    Ok(())
}

/// Forward-only cursor over one shard's adjacency stream, surrendering
/// out-degree counts for ascending sub-intervals.
struct SlidingShard {
    reader: AdjacencyReader<BufReader<File>>,
    pending: Option<(VertexId, u32)>,
}

impl SlidingShard {
    fn open(base: &str, shard: usize, num_shards: usize) -> Result<Self> {
        let file = File::open(filenames::adjacency(base, shard, num_shards))
            .map_err(SharderError::io(DEGREE_PHASE))?;
        Ok(Self {
            reader: AdjacencyReader::new(BufReader::new(file)),
            pending: None,
        })
    }

    fn accumulate_out(&mut self, sub: u64, sub_end: u64, out_degrees: &mut [u32]) -> Result<()> {
        loop {
            if self.pending.is_none() {
                self.pending = self
                    .reader
                    .next_run()
                    .map_err(SharderError::io(DEGREE_PHASE))?
                    .map(|(src, dests)| (src, dests.len() as u32));
            }
            let Some((src, count)) = self.pending else {
                return Ok(());
            };
            let src = u64::from(src);
            if src >= sub_end {
                return Ok(());
            }
            debug_assert!(src >= sub, "adjacency sources must ascend");
            out_degrees[(src - sub) as usize] += count;
            self.pending = None;
        }
    }
}
