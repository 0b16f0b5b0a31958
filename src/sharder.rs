//! Two-pass sharding driver.
//!
//! Pass 1 ingests edges, pre-translating ids and spilling fixed-width
//! records into per-shard shovels. Pass 2 loads each shovel, rewrites keys
//! into the final layout, co-sorts, encodes the adjacency stream and the
//! compressed edge-data blocks, and accumulates vertex degrees. The run
//! finishes by writing the degree table and the interval/translate
//! manifests the engine boots from.

use std::fs::{self, File};
use std::io::{BufRead, BufWriter, Write};

use tracing::{debug, info, warn};

use crate::adjacency::write_adjacency;
use crate::config::SharderConfig;
use crate::degree::{self, DegreeCounts};
use crate::edata::write_edge_data;
use crate::error::{Result, SharderError};
use crate::filenames;
use crate::shovel::{self, unpack_dst, unpack_src, ShovelWriter};
use crate::sort::sort_with_values;
use crate::translate::IdTranslate;
use crate::value::{EdgeProcessor, ValueCodec};
use crate::VertexId;

/// Outcome of a completed run. Owns the processor so callers can collect
/// whatever it accumulated (vertex values from self-loops, counters).
pub struct SharderSummary<P> {
    pub processor: P,
    pub num_edges: u64,
    pub max_vertex_id: VertexId,
    pub translate: IdTranslate,
    pub sparse_degrees: bool,
    pub memory_efficient_degrees: bool,
}

/// The sharder. Construct, feed edges, then call [`process`](Self::process)
/// exactly once; consuming `self` makes a second pass impossible.
pub struct Sharder<P, C>
where
    C: ValueCodec,
    P: EdgeProcessor<Value = C::Value>,
{
    base_filename: String,
    num_shards: usize,
    pre_translate: IdTranslate,
    shovels: Vec<ShovelWriter>,
    max_vertex_id: VertexId,
    processor: P,
    codec: C,
    value_buf: Vec<u8>,
    config: SharderConfig,
}

impl<P, C> Sharder<P, C>
where
    C: ValueCodec,
    P: EdgeProcessor<Value = C::Value>,
{
    pub fn new(
        base_filename: impl Into<String>,
        num_shards: usize,
        processor: P,
        codec: C,
    ) -> Result<Self> {
        Self::with_config(
            base_filename,
            num_shards,
            processor,
            codec,
            SharderConfig::default(),
        )
    }

    pub fn with_config(
        base_filename: impl Into<String>,
        num_shards: usize,
        processor: P,
        codec: C,
        config: SharderConfig,
    ) -> Result<Self> {
        assert!(num_shards > 0, "shard count must be positive");
        let base_filename = base_filename.into();
        let initial_interval = u64::from(i32::MAX as u32) / num_shards as u64;
        let pre_translate = IdTranslate::new(initial_interval, num_shards);

        let shovels = (0..num_shards)
            .map(|shard| ShovelWriter::create(&base_filename, shard))
            .collect::<Result<_>>()?;

        let value_buf = vec![0u8; codec.size_of()];
        Ok(Self {
            base_filename,
            num_shards,
            pre_translate,
            shovels,
            max_vertex_id: 0,
            processor,
            codec,
            value_buf,
            config,
        })
    }

    pub fn num_shards(&self) -> usize {
        self.num_shards
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Ingests one edge. Self-loops are diverted to the processor's
    /// vertex-value channel and never reach a shovel; everything else is
    /// pre-translated and spilled to the shovel of `dst % num_shards`.
    pub fn add_edge(&mut self, src: VertexId, dst: VertexId, token: Option<&str>) -> Result<()> {
        if src == dst {
            self.processor.receive_vertex_value(src, token);
            return Ok(());
        }

        self.max_vertex_id = self.max_vertex_id.max(src).max(dst);
        let pre_src = self.pre_translate.forward(src);
        let pre_dst = self.pre_translate.forward(dst);

        let value = self.processor.receive_edge(src, dst, token)?;
        self.codec.write_to(&value, &mut self.value_buf);

        let shard = dst as usize % self.num_shards;
        self.shovels[shard].append(pre_src, pre_dst, &self.value_buf)
    }

    /// Second pass: sorts and encodes every shard, then writes degrees and
    /// manifests. Shovels are deleted as they are consumed.
    pub fn process(mut self) -> Result<SharderSummary<P>> {
        let memory_efficient = self.config.memory_efficient_degree_count.unwrap_or(
            self.config.memory_budget / 5 < u64::from(self.max_vertex_id) * 8,
        );
        if memory_efficient {
            info!("sharder.degree.memory_efficient_fallback");
        }

        let degree_len = self.max_vertex_id as usize + self.num_shards;
        let mut degrees = (!memory_efficient).then(|| DegreeCounts::new(degree_len));

        let final_translate = IdTranslate::new(
            (1 + u64::from(self.max_vertex_id)) / self.num_shards as u64 + 1,
            self.num_shards,
        );
        self.save_vertex_translate(&final_translate)?;
        self.write_intervals(&final_translate)?;

        for writer in std::mem::take(&mut self.shovels) {
            writer.finish()?;
        }

        let value_size = self.codec.size_of();
        let mut num_edges = 0u64;
        for shard in 0..self.num_shards {
            num_edges += self.process_shovel(
                shard,
                value_size,
                &final_translate,
                degrees.as_mut(),
            )?;
        }

        let sparse = degree::use_sparse(
            self.max_vertex_id,
            num_edges,
            self.config.force_sparse_degrees,
        );
        info!(sparse, num_edges, "sharder.degree.write");
        match &degrees {
            Some(counts) => counts.write(&self.base_filename, sparse)?,
            None => degree::replay_degrees(
                &self.base_filename,
                self.num_shards,
                &final_translate,
                self.max_vertex_id,
                sparse,
                self.config.degree_subinterval,
            )?,
        }

        Ok(SharderSummary {
            processor: self.processor,
            num_edges,
            max_vertex_id: self.max_vertex_id,
            translate: final_translate,
            sparse_degrees: sparse,
            memory_efficient_degrees: memory_efficient,
        })
    }

    /// Convenience driver over the line-oriented text format: `src⇥dst` or
    /// `src⇥dst⇥token`, `#`-prefixed and short lines skipped. Runs ingest
    /// and then the full second pass.
    pub fn shard_from_reader<R: BufRead>(mut self, input: R) -> Result<SharderSummary<P>> {
        let mut line_num = 0u64;
        for line in input.lines() {
            let line = line.map_err(SharderError::io("ingest"))?;
            if line.len() <= 2 || line.starts_with('#') {
                continue;
            }
            line_num += 1;
            if line_num % 2_000_000 == 0 {
                info!(lines = line_num, "sharder.ingest.progress");
            }

            let tokens: Vec<&str> = line.split('\t').collect();
            let (src, dst, token) = match tokens.as_slice() {
                [src, dst] => (src, dst, None),
                [src, dst, token] => (src, dst, Some(*token)),
                _ => continue,
            };
            let (Ok(src), Ok(dst)) = (src.parse::<VertexId>(), dst.parse::<VertexId>()) else {
                warn!(line = line_num, "sharder.ingest.skipping_malformed_line");
                continue;
            };
            self.add_edge(src, dst, token)?;
        }
        self.process()
    }

    fn save_vertex_translate(&self, translate: &IdTranslate) -> Result<()> {
        let path = filenames::vertex_translate(&self.base_filename, self.num_shards);
        fs::write(path, translate.string_representation())
            .map_err(SharderError::io("writing vertex translate"))
    }

    fn write_intervals(&self, translate: &IdTranslate) -> Result<()> {
        let io = || SharderError::io("writing intervals");
        let path = filenames::intervals(&self.base_filename, self.num_shards);
        let mut out = BufWriter::new(File::create(path).map_err(io())?);
        for shard in 1..=self.num_shards as u64 {
            writeln!(out, "{}", shard * translate.interval_length() - 1).map_err(io())?;
        }
        out.flush().map_err(io())
    }

    /// Loads, sorts, and encodes one shard, deleting its shovel afterwards.
    /// Returns the shard's edge count.
    fn process_shovel(
        &self,
        shard: usize,
        value_size: usize,
        final_translate: &IdTranslate,
        degrees: Option<&mut DegreeCounts>,
    ) -> Result<u64> {
        info!(shard, "sharder.shovel.process");
        let mut loaded = shovel::load(
            &self.base_filename,
            shard,
            value_size,
            &self.pre_translate,
            final_translate,
        )?;

        if let Some(counts) = degrees {
            for &key in &loaded.keys {
                counts.count_edge(unpack_src(key), unpack_dst(key));
            }
        }

        debug!(shard, edges = loaded.len(), "sharder.shovel.sort");
        sort_with_values(&mut loaded.keys, &mut loaded.values, value_size);

        debug!(shard, "sharder.shovel.write_shard");
        let encode_io = |e| SharderError::Io {
            phase: format!("shard-{shard}-encode"),
            source: e,
        };
        let adj_path = filenames::adjacency(&self.base_filename, shard, self.num_shards);
        let mut adj_out = BufWriter::new(File::create(adj_path).map_err(encode_io)?);
        write_adjacency(&mut adj_out, &loaded.keys).map_err(encode_io)?;
        adj_out.flush().map_err(encode_io)?;

        write_edge_data(
            &self.base_filename,
            shard,
            self.num_shards,
            value_size,
            &loaded.values,
        )?;

        fs::remove_file(filenames::shovel(&self.base_filename, shard)).map_err(encode_io)?;
        Ok(loaded.len() as u64)
    }
}
