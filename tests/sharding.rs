//! End-to-end sharding scenarios: ingest an edge list, run both passes,
//! and verify the on-disk artifacts the engine would read.

use std::fs::{self, File};
use std::io::BufReader;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::{tempdir, TempDir};

use gravel::adjacency::AdjacencyReader;
use gravel::edata::read_edge_data;
use gravel::filenames;
use gravel::{
    EmptyCodec, EmptyProcessor, F32Codec, F32Processor, IdTranslate, Sharder, SharderConfig,
    VertexId,
};

fn base_in(dir: &TempDir) -> String {
    dir.path().join("g").to_str().expect("utf-8 path").to_owned()
}

fn read_runs(base: &str, shard: usize, num_shards: usize) -> Vec<(VertexId, Vec<VertexId>)> {
    let file = File::open(filenames::adjacency(base, shard, num_shards)).expect("open adjacency");
    let mut reader = AdjacencyReader::new(BufReader::new(file));
    let mut runs = Vec::new();
    while let Some(run) = reader.next_run().expect("decode adjacency") {
        runs.push(run);
    }
    runs
}

fn read_edges(base: &str, shard: usize, num_shards: usize) -> Vec<(VertexId, VertexId)> {
    read_runs(base, shard, num_shards)
        .into_iter()
        .flat_map(|(src, dests)| dests.into_iter().map(move |d| (src, d)))
        .collect()
}

fn read_sparse_degrees(base: &str) -> Vec<(u32, u32, u32)> {
    let bytes = fs::read(filenames::degrees(base, true)).expect("read sparse degrees");
    assert_eq!(bytes.len() % 12, 0, "sparse records are 12 bytes");
    bytes
        .chunks_exact(12)
        .map(|c| {
            (
                u32::from_le_bytes(c[0..4].try_into().expect("4 bytes")),
                u32::from_le_bytes(c[4..8].try_into().expect("4 bytes")),
                u32::from_le_bytes(c[8..12].try_into().expect("4 bytes")),
            )
        })
        .collect()
}

fn read_dense_degrees(base: &str) -> Vec<(u32, u32)> {
    let bytes = fs::read(filenames::degrees(base, false)).expect("read dense degrees");
    assert_eq!(bytes.len() % 8, 0, "dense records are 8 bytes");
    bytes
        .chunks_exact(8)
        .map(|c| {
            (
                u32::from_le_bytes(c[0..4].try_into().expect("4 bytes")),
                u32::from_le_bytes(c[4..8].try_into().expect("4 bytes")),
            )
        })
        .collect()
}

#[test]
fn triangle_partitions_by_destination_with_sparse_degrees() {
    let dir = tempdir().expect("tempdir");
    let base = base_in(&dir);

    let config = SharderConfig {
        force_sparse_degrees: true,
        ..SharderConfig::default()
    };
    let mut sharder =
        Sharder::with_config(&base, 2, EmptyProcessor::default(), EmptyCodec, config)
            .expect("construct");
    sharder.add_edge(1, 2, None).expect("edge");
    sharder.add_edge(2, 3, None).expect("edge");
    sharder.add_edge(3, 1, None).expect("edge");
    let summary = sharder.process().expect("process");

    assert_eq!(summary.num_edges, 3);
    assert_eq!(summary.max_vertex_id, 3);
    assert!(summary.sparse_degrees);

    // interval length (1 + 3) / 2 + 1 = 3; forward: 1 -> 3, 2 -> 1, 3 -> 4.
    let t = summary.translate;
    assert_eq!(t.interval_length(), 3);

    // Destination picks the shard: dst 2 is even, dsts 3 and 1 are odd.
    assert_eq!(read_edges(&base, 0, 2), vec![(t.forward(1), t.forward(2))]);
    assert_eq!(
        read_edges(&base, 1, 2),
        vec![(t.forward(2), t.forward(3)), (t.forward(3), t.forward(1))]
    );

    // Each shard owns the destinations of its own interval.
    for shard in 0..2u64 {
        for (_, dst) in read_edges(&base, shard as usize, 2) {
            assert_eq!(u64::from(dst) / t.interval_length(), shard);
        }
    }

    // Every triangle vertex has one in-edge and one out-edge.
    assert_eq!(
        read_sparse_degrees(&base),
        vec![(t.forward(2), 1, 1), (t.forward(1), 1, 1), (t.forward(3), 1, 1)]
    );
}

#[test]
fn self_loop_is_diverted_to_vertex_values() {
    let dir = tempdir().expect("tempdir");
    let base = base_in(&dir);

    let mut sharder =
        Sharder::new(&base, 4, EmptyProcessor::default(), EmptyCodec).expect("construct");
    sharder.add_edge(1, 2, None).expect("edge");
    sharder.add_edge(7, 7, None).expect("self-loop");
    sharder.add_edge(3, 4, None).expect("edge");
    let summary = sharder.process().expect("process");

    assert_eq!(summary.num_edges, 2);
    assert_eq!(summary.processor.vertex_values(), &[7]);
    for shard in 0..4 {
        for (src, dst) in read_edges(&base, shard, 4) {
            assert_ne!(src, dst, "no self-loop may reach a shard");
        }
    }
}

#[test]
fn duplicate_edges_stay_in_the_run() {
    let dir = tempdir().expect("tempdir");
    let base = base_in(&dir);

    let mut sharder =
        Sharder::new(&base, 1, EmptyProcessor::default(), EmptyCodec).expect("construct");
    sharder.add_edge(0, 5, None).expect("edge");
    sharder.add_edge(0, 2, None).expect("edge");
    sharder.add_edge(0, 5, None).expect("edge");
    let summary = sharder.process().expect("process");

    // With one shard the translate is the identity; the co-sort orders the
    // packed keys, so destinations come out ascending with the duplicate
    // preserved twice.
    assert_eq!(summary.translate.forward(0), 0);
    assert_eq!(read_runs(&base, 0, 1), vec![(0, vec![2, 5, 5])]);
}

#[test]
fn gap_between_sources_is_zero_token_encoded() {
    let dir = tempdir().expect("tempdir");
    let base = base_in(&dir);

    let mut sharder =
        Sharder::new(&base, 1, EmptyProcessor::default(), EmptyCodec).expect("construct");
    sharder.add_edge(0, 1, None).expect("edge");
    sharder.add_edge(5, 2, None).expect("edge");
    sharder.process().expect("process");

    let bytes = fs::read(filenames::adjacency(&base, 0, 1)).expect("read adjacency");
    // Run of source 0, then four zero-out-degree vertices as (0, 3), then
    // the run of source 5.
    assert_eq!(bytes, vec![1, 1, 0, 0, 0, 0, 3, 1, 2, 0, 0, 0]);
}

#[test]
fn large_out_degree_uses_extended_count_prefix() {
    let dir = tempdir().expect("tempdir");
    let base = base_in(&dir);

    let mut sharder =
        Sharder::new(&base, 1, EmptyProcessor::default(), EmptyCodec).expect("construct");
    for dst in 1..=300 {
        sharder.add_edge(0, dst, None).expect("edge");
    }
    sharder.process().expect("process");

    let bytes = fs::read(filenames::adjacency(&base, 0, 1)).expect("read adjacency");
    assert_eq!(bytes[0], 0xff);
    assert_eq!(bytes[1..5], 300u32.to_le_bytes());
}

#[test]
fn replay_degrees_match_in_ram_degrees() {
    let edges = random_edges(0xBEEF, 80, 40);

    let dense_in_ram = degree_file_for(&edges, Some(false), false);
    let dense_replay = degree_file_for(&edges, Some(true), false);
    assert_eq!(dense_in_ram, dense_replay, "dense files must be identical");

    let sparse_in_ram = degree_file_for(&edges, Some(false), true);
    let sparse_replay = degree_file_for(&edges, Some(true), true);
    assert_eq!(sparse_in_ram, sparse_replay, "sparse files must be identical");
}

#[test]
fn low_memory_preset_forces_replay() {
    let dir = tempdir().expect("tempdir");
    let base = base_in(&dir);

    let mut sharder = Sharder::with_config(
        &base,
        2,
        EmptyProcessor::default(),
        EmptyCodec,
        SharderConfig::low_memory(),
    )
    .expect("construct");
    for &(src, dst) in &random_edges(0xFACE, 40, 20) {
        sharder.add_edge(src, dst, None).expect("edge");
    }
    let summary = sharder.process().expect("process");
    assert!(summary.memory_efficient_degrees, "preset must pick replay");

    // The replay path still has to agree with the dense counters.
    let len = summary.max_vertex_id as usize + 2;
    let mut in_degrees = vec![0u32; len];
    let mut out_degrees = vec![0u32; len];
    for shard in 0..2 {
        for (src, dst) in read_edges(&base, shard, 2) {
            out_degrees[src as usize] += 1;
            in_degrees[dst as usize] += 1;
        }
    }
    let table = read_dense_degrees(&base);
    assert_eq!(table.len(), len);
    for (v, &(din, dout)) in table.iter().enumerate() {
        assert_eq!((din, dout), (in_degrees[v], out_degrees[v]), "vertex {v}");
    }
}

fn random_edges(seed: u64, count: usize, id_space: u32) -> Vec<(VertexId, VertexId)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut edges = Vec::with_capacity(count);
    while edges.len() < count {
        let src = rng.gen_range(0..id_space);
        let dst = rng.gen_range(0..id_space);
        if src != dst {
            edges.push((src, dst));
        }
    }
    edges
}

fn degree_file_for(
    edges: &[(VertexId, VertexId)],
    memory_efficient: Option<bool>,
    sparse: bool,
) -> Vec<u8> {
    let dir = tempdir().expect("tempdir");
    let base = base_in(&dir);

    let config = SharderConfig {
        memory_efficient_degree_count: memory_efficient,
        force_sparse_degrees: sparse,
        // Small sub-intervals push the replay path through several rounds
        // per interval.
        degree_subinterval: 4,
        ..SharderConfig::default()
    };
    let mut sharder =
        Sharder::with_config(&base, 3, EmptyProcessor::default(), EmptyCodec, config)
            .expect("construct");
    for &(src, dst) in edges {
        sharder.add_edge(src, dst, None).expect("edge");
    }
    let summary = sharder.process().expect("process");
    assert_eq!(summary.memory_efficient_degrees, memory_efficient == Some(true));

    fs::read(filenames::degrees(&base, sparse)).expect("read degree file")
}

#[test]
fn dense_degrees_count_every_shard_edge() {
    let dir = tempdir().expect("tempdir");
    let base = base_in(&dir);

    let edges = random_edges(0xC0FFEE, 120, 30);
    let mut sharder =
        Sharder::new(&base, 3, EmptyProcessor::default(), EmptyCodec).expect("construct");
    for &(src, dst) in &edges {
        sharder.add_edge(src, dst, None).expect("edge");
    }
    let summary = sharder.process().expect("process");
    assert!(!summary.sparse_degrees, "120 edges over 30 ids stay dense");

    let len = summary.max_vertex_id as usize + 3;
    let mut in_degrees = vec![0u32; len];
    let mut out_degrees = vec![0u32; len];
    for shard in 0..3 {
        for (src, dst) in read_edges(&base, shard, 3) {
            out_degrees[src as usize] += 1;
            in_degrees[dst as usize] += 1;
        }
    }

    let table = read_dense_degrees(&base);
    assert_eq!(table.len(), len);
    for (v, &(din, dout)) in table.iter().enumerate() {
        assert_eq!(din, in_degrees[v], "in-degree of vertex {v}");
        assert_eq!(dout, out_degrees[v], "out-degree of vertex {v}");
    }
}

#[test]
fn edge_values_ride_along_in_adjacency_order() {
    let dir = tempdir().expect("tempdir");
    let base = base_in(&dir);

    let input = "0\t1\t0.5\n2\t1\t1.5\n";
    let sharder =
        Sharder::new(&base, 1, F32Processor::default(), F32Codec).expect("construct");
    let summary = sharder
        .shard_from_reader(input.as_bytes())
        .expect("shard text input");
    assert_eq!(summary.num_edges, 2);

    let size_file = filenames::edge_data_size(&filenames::edge_data(&base, 4, 0, 1));
    assert_eq!(fs::read_to_string(size_file).expect("size sidecar"), "8");

    // One shard, identity translate: keys sort as (0,1) then (2,1), so the
    // payload is the two weights in that order.
    let values = read_edge_data(&base, 0, 1, 4).expect("read edge data");
    let mut expected = Vec::new();
    expected.extend_from_slice(&0.5f32.to_le_bytes());
    expected.extend_from_slice(&1.5f32.to_le_bytes());
    assert_eq!(values, expected);
}

#[test]
fn empty_value_graphs_write_empty_edge_data() {
    let dir = tempdir().expect("tempdir");
    let base = base_in(&dir);

    let mut sharder =
        Sharder::new(&base, 2, EmptyProcessor::default(), EmptyCodec).expect("construct");
    sharder.add_edge(0, 1, None).expect("edge");
    sharder.add_edge(1, 0, None).expect("edge");
    sharder.process().expect("process");

    for shard in 0..2 {
        let edata = filenames::edge_data(&base, 0, shard, 2);
        let size = fs::read_to_string(filenames::edge_data_size(&edata)).expect("size sidecar");
        assert_eq!(size, "0");
        assert!(read_edge_data(&base, shard, 2, 0).expect("read").is_empty());
    }
}

#[test]
fn manifests_describe_the_final_layout() {
    let dir = tempdir().expect("tempdir");
    let base = base_in(&dir);

    let mut sharder =
        Sharder::new(&base, 2, EmptyProcessor::default(), EmptyCodec).expect("construct");
    sharder.add_edge(1, 2, None).expect("edge");
    sharder.add_edge(2, 3, None).expect("edge");
    sharder.add_edge(3, 1, None).expect("edge");
    let summary = sharder.process().expect("process");

    let translate_text =
        fs::read_to_string(filenames::vertex_translate(&base, 2)).expect("vtranslate");
    let parsed = IdTranslate::parse(&translate_text).expect("parse vtranslate");
    assert_eq!(parsed, summary.translate);
    assert_eq!(parsed.num_shards(), 2);

    let intervals = fs::read_to_string(filenames::intervals(&base, 2)).expect("intervals");
    let bounds: Vec<u64> = intervals
        .lines()
        .map(|l| l.parse().expect("interval bound"))
        .collect();
    let expected: Vec<u64> = (1..=summary.translate.num_shards() as u64)
        .map(|k| k * summary.translate.interval_length() - 1)
        .collect();
    assert_eq!(bounds, expected);

    // Scratch files are consumed by the second pass.
    for shard in 0..2 {
        assert!(!filenames::shovel(&base, shard).exists());
    }
}
