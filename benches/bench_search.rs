use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vseq::{HnswParams, IndexVariant, SeqGraphConfig, SequenceDataset, SimMetric, VssIndex};

fn generate_dataset(seq_count: usize, seq_len: usize, dim: usize) -> SequenceDataset {
    let mut rng = fastrand::Rng::with_seed(7);
    let sequences: Vec<Vec<f32>> = (0..seq_count)
        .map(|_| (0..seq_len * dim).map(|_| rng.f32()).collect())
        .collect();
    SequenceDataset::from_sequences(dim, &sequences).unwrap()
}

fn generate_query(q_len: usize, dim: usize) -> Vec<f32> {
    let mut rng = fastrand::Rng::with_seed(99);
    (0..q_len * dim).map(|_| rng.f32()).collect()
}

fn bench_search(c: &mut Criterion) {
    let dim = 32;
    let ds = generate_dataset(500, 10, dim);
    let query = generate_query(10, dim);
    let params = HnswParams::with_m(16).with_ef_construction(200).with_seed(1);

    let mut group = c.benchmark_group("search");
    group.sample_size(50);

    let mut brute = VssIndex::build(&ds, SimMetric::Dtw, IndexVariant::BruteForce, params).unwrap();
    group.bench_function("brute_force", |b| {
        b.iter(|| black_box(brute.search(&query, 10, 0).unwrap()))
    });

    let mut set = VssIndex::build(&ds, SimMetric::Dtw, IndexVariant::SetGraph, params).unwrap();
    for ef in [50, 200] {
        group.bench_with_input(BenchmarkId::new("set_graph", ef), &ef, |b, &ef| {
            b.iter(|| black_box(set.search(&query, 10, ef).unwrap()))
        });
    }

    for (label, buffered) in [("seq_graph", false), ("seq_graph_buffered", true)] {
        let config = SeqGraphConfig::default()
            .with_unlink_same_seq(true)
            .with_enable_buffer(buffered);
        let mut seq = VssIndex::build(&ds, SimMetric::Dtw, IndexVariant::SeqGraph(config), params).unwrap();
        for ef in [50, 200] {
            group.bench_with_input(BenchmarkId::new(label, ef), &ef, |b, &ef| {
                b.iter(|| black_box(seq.search(&query, 10, ef).unwrap()))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
