//! Edge-value capability seams.
//!
//! The sharder treats edge values as opaque fixed-width byte slices. Two
//! traits cut the seam: [`ValueCodec`] serializes a value into a
//! caller-owned buffer, and [`EdgeProcessor`] converts the raw text token of
//! an ingested edge into a value. Self-loops bypass the shards entirely and
//! are handed to the processor's vertex-value side channel.

use crate::error::{Result, SharderError};
use crate::VertexId;

/// Fixed-size byte serialization for edge values.
pub trait ValueCodec {
    type Value;

    /// Bytes per serialized value. Zero is legal: the edge-data files still
    /// exist but carry no payload.
    fn size_of(&self) -> usize;

    /// Serializes `value` into `buf`, which is exactly `size_of()` bytes.
    fn write_to(&self, value: &Self::Value, buf: &mut [u8]);
}

/// User hook turning raw edge tokens into values.
pub trait EdgeProcessor {
    type Value;

    /// Called once per ingested non-self-loop edge; the returned value is
    /// serialized into the shovel record. Errors abort the run unchanged.
    fn receive_edge(
        &mut self,
        src: VertexId,
        dst: VertexId,
        token: Option<&str>,
    ) -> Result<Self::Value>;

    /// Called when a self-loop `(v, v)` is observed. The edge is not
    /// represented in any shard; whatever the processor records here is a
    /// side channel consumed by the user, not by the sharder.
    fn receive_vertex_value(&mut self, vertex: VertexId, token: Option<&str>);
}

/// Codec for graphs without edge values (`V = 0`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCodec;

impl ValueCodec for EmptyCodec {
    type Value = ();

    fn size_of(&self) -> usize {
        0
    }

    fn write_to(&self, _value: &(), _buf: &mut [u8]) {}
}

/// Processor for graphs without edge values. Self-loop notifications are
/// retained so callers can observe which vertices carried them.
#[derive(Debug, Clone, Default)]
pub struct EmptyProcessor {
    vertex_values: Vec<VertexId>,
}

impl EmptyProcessor {
    pub fn vertex_values(&self) -> &[VertexId] {
        &self.vertex_values
    }
}

impl EdgeProcessor for EmptyProcessor {
    type Value = ();

    fn receive_edge(&mut self, _src: VertexId, _dst: VertexId, _token: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn receive_vertex_value(&mut self, vertex: VertexId, _token: Option<&str>) {
        self.vertex_values.push(vertex);
    }
}

/// Little-endian `f32` codec, the conventional weight payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct F32Codec;

impl ValueCodec for F32Codec {
    type Value = f32;

    fn size_of(&self) -> usize {
        4
    }

    fn write_to(&self, value: &f32, buf: &mut [u8]) {
        buf.copy_from_slice(&value.to_le_bytes());
    }
}

/// Parses edge tokens as `f32` weights; a missing token yields the default
/// weight. Self-loop values are parsed the same way and retained.
#[derive(Debug, Clone)]
pub struct F32Processor {
    default_value: f32,
    vertex_values: Vec<(VertexId, f32)>,
}

impl F32Processor {
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            vertex_values: Vec::new(),
        }
    }

    pub fn vertex_values(&self) -> &[(VertexId, f32)] {
        &self.vertex_values
    }

    fn parse(&self, token: Option<&str>) -> Result<f32> {
        match token {
            None => Ok(self.default_value),
            Some(t) => t
                .parse()
                .map_err(|_| SharderError::Value(format!("not a float edge value: {t:?}"))),
        }
    }
}

impl Default for F32Processor {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl EdgeProcessor for F32Processor {
    type Value = f32;

    fn receive_edge(&mut self, _src: VertexId, _dst: VertexId, token: Option<&str>) -> Result<f32> {
        self.parse(token)
    }

    fn receive_vertex_value(&mut self, vertex: VertexId, token: Option<&str>) {
        let value = self.parse(token).unwrap_or(self.default_value);
        self.vertex_values.push((vertex, value));
    }
}

/// Little-endian `u32` codec for count-like payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct U32Codec;

impl ValueCodec for U32Codec {
    type Value = u32;

    fn size_of(&self) -> usize {
        4
    }

    fn write_to(&self, value: &u32, buf: &mut [u8]) {
        buf.copy_from_slice(&value.to_le_bytes());
    }
}

/// Parses edge tokens as `u32`; a missing token yields zero.
#[derive(Debug, Clone, Default)]
pub struct U32Processor {
    vertex_values: Vec<(VertexId, u32)>,
}

impl U32Processor {
    pub fn vertex_values(&self) -> &[(VertexId, u32)] {
        &self.vertex_values
    }
}

impl EdgeProcessor for U32Processor {
    type Value = u32;

    fn receive_edge(&mut self, _src: VertexId, _dst: VertexId, token: Option<&str>) -> Result<u32> {
        match token {
            None => Ok(0),
            Some(t) => t
                .parse()
                .map_err(|_| SharderError::Value(format!("not an integer edge value: {t:?}"))),
        }
    }

    fn receive_vertex_value(&mut self, vertex: VertexId, token: Option<&str>) {
        let value = token.and_then(|t| t.parse().ok()).unwrap_or(0);
        self.vertex_values.push((vertex, value));
    }
}
