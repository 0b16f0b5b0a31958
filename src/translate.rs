//! Vertex-id translation over a fixed interval layout.
//!
//! Given `P` shards and an interval length `L`, the id space `[0, P*L)` is
//! cut into `P` contiguous intervals and `forward` interleaves original ids
//! so that consecutive ids spread across shards while all ids congruent to
//! `k` modulo `P` land inside interval `k`. `backward` is the exact inverse.

use crate::error::{Result, SharderError};
use crate::VertexId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdTranslate {
    interval_len: u64,
    num_shards: u64,
}

impl IdTranslate {
    pub fn new(interval_len: u64, num_shards: usize) -> Self {
        assert!(interval_len > 0, "interval length must be positive");
        assert!(num_shards > 0, "shard count must be positive");
        Self {
            interval_len,
            num_shards: num_shards as u64,
        }
    }

    /// Maps an original id into the interleaved layout. All arithmetic is
    /// 64-bit; the result fits `u32` for every id inside the layout domain.
    pub fn forward(&self, v: VertexId) -> VertexId {
        let v = u64::from(v);
        let w = (v % self.num_shards) * self.interval_len + v / self.num_shards;
        debug_assert!(w < self.num_shards * self.interval_len);
        w as VertexId
    }

    /// Inverse of [`forward`](Self::forward) on `[0, P*L)`.
    pub fn backward(&self, w: VertexId) -> VertexId {
        let w = u64::from(w);
        let v = (w % self.interval_len) * self.num_shards + w / self.interval_len;
        v as VertexId
    }

    pub fn interval_length(&self) -> u64 {
        self.interval_len
    }

    pub fn num_shards(&self) -> usize {
        self.num_shards as usize
    }

    /// Canonical text form persisted in the `vtranslate` manifest.
    pub fn string_representation(&self) -> String {
        format!("{} {}", self.interval_len, self.num_shards)
    }

    /// Parses the output of [`string_representation`](Self::string_representation).
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let (Some(len), Some(shards), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(SharderError::Manifest(format!(
                "expected two fields in translate definition, got {s:?}"
            )));
        };
        let interval_len: u64 = len
            .parse()
            .map_err(|_| SharderError::Manifest(format!("bad interval length {len:?}")))?;
        let num_shards: u64 = shards
            .parse()
            .map_err(|_| SharderError::Manifest(format!("bad shard count {shards:?}")))?;
        if interval_len == 0 || num_shards == 0 {
            return Err(SharderError::Manifest(
                "translate definition fields must be positive".into(),
            ));
        }
        Ok(Self {
            interval_len,
            num_shards,
        })
    }
}
