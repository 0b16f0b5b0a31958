/// Tunables for a sharding run. The defaults match a single-host batch
/// preprocessing job; tests and constrained operators override fields.
#[derive(Debug, Clone)]
pub struct SharderConfig {
    /// RAM the degree accumulator may assume is available. When a fifth of
    /// this is smaller than the dense degree arrays, the sharder falls back
    /// to the slower shard-replay strategy.
    pub memory_budget: u64,
    /// Force the sparse degree-file format regardless of the
    /// `max_vertex_id <= num_edges` heuristic.
    pub force_sparse_degrees: bool,
    /// Force the degree strategy: `Some(true)` replays shards, `Some(false)`
    /// keeps dense in-RAM counters, `None` applies the memory heuristic.
    pub memory_efficient_degree_count: Option<bool>,
    /// Vertices per sub-interval during shard replay. Must fit in RAM after
    /// expansion; only the replay path reads it.
    pub degree_subinterval: u32,
}

impl Default for SharderConfig {
    fn default() -> Self {
        Self {
            memory_budget: 1 << 30,
            force_sparse_degrees: false,
            memory_efficient_degree_count: None,
            degree_subinterval: 2_000_000,
        }
    }
}

impl SharderConfig {
    /// Preset for memory-constrained hosts: always replay shards for
    /// degrees instead of holding dense counters.
    pub fn low_memory() -> Self {
        Self {
            memory_efficient_degree_count: Some(true),
            ..Self::default()
        }
    }
}
