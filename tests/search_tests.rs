//! Integration tests: search behavior across index variants.
//!
//! Covers the concrete seed scenarios: trivial identity, MAXSIM ties,
//! SDTW free ends, singleton datasets, and the structural invariants the
//! variants must uphold (bounded results, no same-sequence edges).

use vseq::{
    HnswParams, IndexVariant, SeqGraphConfig, SeqGraphIndex, SequenceDataset, SequenceMap, SimMetric, VssIndex,
};

fn params() -> HnswParams {
    HnswParams::with_m(8).with_ef_construction(100).with_seed(42)
}

#[test]
fn test_trivial_identity() {
    // One sequence of two vectors; the query is the same sequence
    let ds = SequenceDataset::from_sequences(2, &[vec![0.0, 0.0, 1.0, 0.0]]).unwrap();
    let mut index = VssIndex::build(&ds, SimMetric::Dtw, IndexVariant::BruteForce, params()).unwrap();

    let result = index.search(&[0.0, 0.0, 1.0, 0.0], 1, 0).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].sid, 0);
    assert_eq!(result[0].dist, 0.0);
}

#[test]
fn test_maxsim_tie_break() {
    // Both sequences contain (0,0); a (0,0) query ties them at -0
    let ds = SequenceDataset::from_sequences(
        2,
        &[vec![0.0, 0.0, 1.0, 0.0], vec![0.0, 0.0, 0.0, 1.0]],
    )
    .unwrap();
    let mut index = VssIndex::build(&ds, SimMetric::MaxSim, IndexVariant::BruteForce, params()).unwrap();

    let result = index.search(&[0.0, 0.0], 2, 0).unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].dist, result[1].dist);
    let mut sids: Vec<u32> = result.iter().map(|n| n.sid).collect();
    sids.sort();
    assert_eq!(sids, vec![0, 1]);
}

#[test]
fn test_sdtw_free_ends_ranking() {
    // The base has an expensive prefix that only sdtw may skip
    let ds = SequenceDataset::from_sequences(2, &[vec![5.0, 0.0, 0.0, 0.0, 1.0, 0.0]]).unwrap();
    let q = [0.0, 0.0, 1.0, 0.0];

    let mut dtw_index = VssIndex::build(&ds, SimMetric::Dtw, IndexVariant::BruteForce, params()).unwrap();
    let mut sdtw_index = VssIndex::build(&ds, SimMetric::Sdtw, IndexVariant::BruteForce, params()).unwrap();

    assert_eq!(dtw_index.search(&q, 1, 0).unwrap()[0].dist, 25.0);
    assert_eq!(sdtw_index.search(&q, 1, 0).unwrap()[0].dist, 0.0);
}

#[test]
fn test_singleton_dataset_all_variants() {
    // S = 1, len = 1: every variant returns that sid with the exact metric
    let ds = SequenceDataset::from_sequences(2, &[vec![3.0, 4.0]]).unwrap();
    let q = [0.0, 0.0];

    for variant in [
        IndexVariant::BruteForce,
        IndexVariant::SetGraph,
        IndexVariant::SeqGraph(SeqGraphConfig::default()),
    ] {
        let mut index = VssIndex::build(&ds, SimMetric::Dtw, variant, params()).unwrap();
        let result = index.search(&q, 1, 10).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].sid, 0);
        assert_eq!(result[0].dist, 25.0);
    }
}

#[test]
fn test_results_sorted_and_bounded() {
    let sequences: Vec<Vec<f32>> = (0..12)
        .map(|s| (0..4).flat_map(|i| [(s * 4 + i) as f32, (s + i) as f32]).collect())
        .collect();
    let ds = SequenceDataset::from_sequences(2, &sequences).unwrap();
    let q: Vec<f32> = (0..4).flat_map(|i| [(8 + i) as f32, (2 + i) as f32]).collect();

    for variant in [
        IndexVariant::BruteForce,
        IndexVariant::SetGraph,
        IndexVariant::SeqGraph(SeqGraphConfig::default()),
    ] {
        let mut index = VssIndex::build(&ds, SimMetric::Dtw, variant, params()).unwrap();
        for k in [1, 5, 20] {
            let result = index.search(&q, k, 100).unwrap();
            assert!(result.len() <= k);
            for w in result.windows(2) {
                assert!(w[0].dist <= w[1].dist, "results not sorted ascending");
            }
        }
    }
}

#[test]
fn test_unlink_same_seq_no_intra_sequence_edges() {
    let sequences: Vec<Vec<f32>> = (0..15)
        .map(|s| {
            (0..8)
                .flat_map(|i| {
                    let x = ((s * 31 + i * 7) % 97) as f32 / 10.0;
                    let y = ((s * 11 + i * 13) % 97) as f32 / 10.0;
                    [x, y]
                })
                .collect()
        })
        .collect();
    let ds = SequenceDataset::from_sequences(2, &sequences).unwrap();

    let config = SeqGraphConfig::default().with_unlink_same_seq(true);
    let index = SeqGraphIndex::build(&ds, SimMetric::Dtw, params(), config).unwrap();

    let map = SequenceMap::new(ds.seq_lens());
    let graph = index.graph();
    for layer in 0..graph.num_layers() {
        for vid in 0..ds.vec_count() as u32 {
            for &n in graph.neighbors(layer, vid) {
                assert_ne!(map.sid_of(vid), map.sid_of(n), "intra-sequence edge at layer {}", layer);
            }
        }
    }
}

#[test]
fn test_seq_graph_requires_warping_metric() {
    let ds = SequenceDataset::from_sequences(2, &[vec![0.0, 0.0]]).unwrap();
    let result = VssIndex::build(
        &ds,
        SimMetric::MaxSim,
        IndexVariant::SeqGraph(SeqGraphConfig::default()),
        params(),
    );
    assert!(result.is_err());
}

#[test]
fn test_graph_variants_match_brute_force_on_easy_data() {
    // Well-separated clusters: approximate search must find the exact winner
    let sequences: Vec<Vec<f32>> = (0..10)
        .map(|s| {
            let cx = (s * 100) as f32;
            (0..5).flat_map(|i| [cx + i as f32, cx]).collect()
        })
        .collect();
    let ds = SequenceDataset::from_sequences(2, &sequences).unwrap();

    let q: Vec<f32> = (0..5).flat_map(|i| [300.0 + i as f32, 300.0]).collect();

    let mut exact = VssIndex::build(&ds, SimMetric::Dtw, IndexVariant::BruteForce, params()).unwrap();
    let expected = exact.search(&q, 3, 0).unwrap();

    for variant in [
        IndexVariant::SetGraph,
        IndexVariant::SeqGraph(SeqGraphConfig::default()),
    ] {
        let mut index = VssIndex::build(&ds, SimMetric::Dtw, variant, params()).unwrap();
        let got = index.search(&q, 3, 100).unwrap();
        assert_eq!(got.len(), expected.len());
        assert_eq!(got[0].sid, expected[0].sid);
        assert_eq!(got[0].dist, expected[0].dist);
    }
}
