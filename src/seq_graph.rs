//! Sequence-graph index: joint DP candidate generation under warping
//! semantics.
//!
//! A DTW computation between a query and one base sequence is a shortest
//! path in a (q x b) lattice. Since the matching base sequence is unknown,
//! the search generalizes the lattice to all base vectors at once: a state
//! is a (vector, query-position) pair whose cost accumulates along
//! within-sequence successor edges (the lattice transitions) while graph
//! edges restart the alignment at a nearby base region for free. The
//! frontier is ordered by query progress first, accumulated cost second,
//! which keeps the search completing alignments instead of dwelling on
//! shallow states.
//!
//! With `enable_buffer`, every local distance the DP pays for is cached in
//! the visited table and reused by the rerank layer's from-matrix scoring.

use crate::dataset::SequenceDataset;
use crate::distance::DistFn;
use crate::error::{Error, Result};
use crate::hnsw::{GraphMetrics, HnswBuilder, HnswGraph, HnswParams};
use crate::mapping::{Lid, SequenceMap, Sid, Vid};
use crate::metric::SimMetric;
use crate::rerank::{Neighbor, TopK};
use crate::visited::VisitedStatus;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::time::Instant;

/// Behavior switches for the sequence-graph index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqGraphConfig {
    /// Cache pairwise distances from candidate generation and reuse them
    /// during rerank.
    pub enable_buffer: bool,
    /// Forbid graph edges between vectors of the same sequence, keeping
    /// graph jumps and within-sequence transitions disjoint.
    pub unlink_same_seq: bool,
    /// Shuffle the vector insertion order during construction.
    pub shuffle_insertion: bool,
}

impl Default for SeqGraphConfig {
    fn default() -> Self {
        Self {
            enable_buffer: true,
            unlink_same_seq: false,
            shuffle_insertion: false,
        }
    }
}

impl SeqGraphConfig {
    /// Toggle the rerank distance cache.
    pub fn with_enable_buffer(mut self, on: bool) -> Self {
        self.enable_buffer = on;
        self
    }

    /// Toggle same-sequence unlinking. Also enables the insertion-order
    /// shuffle, which counteracts the locality runs that sequential
    /// insertion produces; use `with_shuffle_insertion` afterwards to
    /// override.
    pub fn with_unlink_same_seq(mut self, on: bool) -> Self {
        self.unlink_same_seq = on;
        self.shuffle_insertion = on;
        self
    }

    /// Toggle the insertion-order shuffle independently.
    pub fn with_shuffle_insertion(mut self, on: bool) -> Self {
        self.shuffle_insertion = on;
        self
    }
}

/// One DP state: base vector `vid` at query position `q_lid`, with
/// `b_lid = v2l[vid]` and the cost accumulated so far.
#[derive(Debug, Clone, Copy)]
struct Status {
    vid: Vid,
    q_lid: u32,
    b_lid: Lid,
    dist: f32,
}

impl PartialEq for Status {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Status {}

impl PartialOrd for Status {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Status {
    fn cmp(&self, other: &Self) -> Ordering {
        // "Less" means more promising: further along the query first,
        // cheaper second. Plain cost ordering starves deep states and
        // collapses recall.
        other
            .q_lid
            .cmp(&self.q_lid)
            .then_with(|| self.dist.partial_cmp(&other.dist).unwrap_or(Ordering::Equal))
            .then_with(|| self.vid.cmp(&other.vid))
    }
}

/// The two bounded heaps of the DP search plus its admission rule.
struct DpQueues {
    ef: usize,
    q_len: usize,
    /// Completed alignments; max-heap, worst on top.
    results: BinaryHeap<Status>,
    /// Frontier; min-heap, most promising on top.
    frontier: BinaryHeap<Reverse<Status>>,
    lower_bound: Status,
}

impl DpQueues {
    fn new(seed: Status, ef: usize, q_len: usize) -> Self {
        let mut results = BinaryHeap::with_capacity(ef + 1);
        let mut frontier = BinaryHeap::new();
        results.push(seed);
        frontier.push(Reverse(seed));
        Self {
            ef,
            q_len,
            results,
            frontier,
            lower_bound: seed,
        }
    }

    /// Offer a successor whose local distance has just been paid.
    /// Completed states (last query row) go to the bounded result heap;
    /// everything else competitive goes back on the frontier.
    fn admit(&mut self, st: Status) {
        if self.results.len() < self.ef || st < self.lower_bound {
            if st.q_lid as usize == self.q_len - 1 {
                self.results.push(st);
                if self.results.len() > self.ef {
                    self.results.pop();
                }
                self.lower_bound = *self.results.peek().expect("results heap is non-empty");
            } else {
                self.frontier.push(Reverse(st));
            }
        }
    }
}

/// Graph index with DP candidate generation for DTW/SDTW workloads.
pub struct SeqGraphIndex<'a> {
    dataset: &'a SequenceDataset,
    metric: SimMetric,
    config: SeqGraphConfig,
    dist: DistFn,
    map: SequenceMap,
    graph: HnswGraph,
    visited_status: VisitedStatus,
    graph_metrics: GraphMetrics,
    metric_buffer_hit: u64,
    metric_buffer_tot: u64,
    metric_cand_gen_time: u64,
    metric_rerank_time: u64,
}

impl<'a> SeqGraphIndex<'a> {
    /// Build the vector graph, the id tables, and the DP scratch.
    ///
    /// Only warping metrics make sense here; MAXSIM requests are rejected.
    pub fn build(
        dataset: &'a SequenceDataset,
        metric: SimMetric,
        params: HnswParams,
        config: SeqGraphConfig,
    ) -> Result<Self> {
        if metric == SimMetric::MaxSim {
            return Err(Error::UnsupportedMetric {
                metric: metric.name().to_string(),
                variant: "seq".to_string(),
            });
        }

        let map = SequenceMap::new(dataset.seq_lens());

        let mut builder = HnswBuilder::new(dataset.dim(), metric.vector_distance(), dataset.data(), params)?;
        if config.unlink_same_seq {
            let v2s = map.v2s().to_vec();
            builder = builder.with_link_filter(move |a, b| v2s[a as usize] != v2s[b as usize]);
        }

        let mut order: Vec<Vid> = (0..dataset.vec_count() as Vid).collect();
        if config.shuffle_insertion {
            builder.rng().shuffle(&mut order);
        }
        for vid in order {
            builder.insert(vid);
        }
        let graph = builder.build()?;

        Ok(Self {
            dataset,
            metric,
            config,
            dist: metric.vector_distance().dist_fn(),
            map,
            graph,
            visited_status: VisitedStatus::new(dataset.vec_count()),
            graph_metrics: GraphMetrics::default(),
            metric_buffer_hit: 0,
            metric_buffer_tot: 0,
            metric_cand_gen_time: 0,
            metric_rerank_time: 0,
        })
    }

    /// Run the joint DP over the layer-0 graph, starting from `ep`.
    fn search_level_dp(&mut self, ep: Vid, q: &[f32], q_len: usize, ef: usize) -> BinaryHeap<Status> {
        let Self {
            dataset,
            dist,
            map,
            graph,
            visited_status,
            graph_metrics,
            ..
        } = self;
        let dim = dataset.dim();
        let data = dataset.data();
        let dist = *dist;
        let q_row = |lid: u32| &q[lid as usize * dim..(lid as usize + 1) * dim];
        let vec = |vid: Vid| &data[vid as usize * dim..(vid as usize + 1) * dim];

        visited_status.reset(q_len);

        let seed = Status {
            vid: ep,
            q_lid: 0,
            b_lid: map.lid_of(ep),
            dist: dist(q_row(0), vec(ep)),
        };
        visited_status.visit(0, ep, seed.dist);

        let mut queues = DpQueues::new(seed, ef, q_len);

        while let Some(&Reverse(st)) = queues.frontier.peek() {
            if queues.results.len() >= ef && st > queues.lower_bound {
                break;
            }
            queues.frontier.pop();
            graph_metrics.hops += 1;

            let mut relax = |mut succ: Status, queues: &mut DpQueues| {
                if visited_status.is_visited(succ.q_lid, succ.vid) {
                    return;
                }
                let delta = dist(q_row(succ.q_lid), vec(succ.vid));
                visited_status.visit(succ.q_lid, succ.vid, delta);
                graph_metrics.dist_comps += 1;
                succ.dist += delta;
                queues.admit(succ);
            };

            // Vertical: consume the next query row at the same base vector
            if st.q_lid + 1 < q_len as u32 {
                relax(
                    Status {
                        vid: st.vid,
                        q_lid: st.q_lid + 1,
                        b_lid: st.b_lid,
                        dist: st.dist,
                    },
                    &mut queues,
                );
            }

            // Horizontal and diagonal along the owning base sequence
            if st.b_lid + 1 < map.len_of(map.sid_of(st.vid)) {
                relax(
                    Status {
                        vid: st.vid + 1,
                        q_lid: st.q_lid,
                        b_lid: st.b_lid + 1,
                        dist: st.dist,
                    },
                    &mut queues,
                );
                if st.q_lid + 1 < q_len as u32 {
                    relax(
                        Status {
                            vid: st.vid + 1,
                            q_lid: st.q_lid + 1,
                            b_lid: st.b_lid + 1,
                            dist: st.dist,
                        },
                        &mut queues,
                    );
                }
            }

            // Graph jumps: zero-cost restart of the alignment at each
            // layer-0 neighbor
            for &n in graph.neighbors(0, st.vid) {
                relax(
                    Status {
                        vid: n,
                        q_lid: 0,
                        b_lid: map.lid_of(n),
                        dist: 0.0,
                    },
                    &mut queues,
                );
            }
        }

        queues.results
    }

    /// DP search projected onto owning sequences.
    fn generate_candidates(&mut self, q: &[f32], q_len: usize, ef: usize) -> HashSet<Sid> {
        let dim = self.dataset.dim();
        let data = self.dataset.data();

        let (ep, _) = self.graph.descend(&q[0..dim], data, &mut self.graph_metrics);
        let results = self.search_level_dp(ep, q, q_len, ef);

        results.into_iter().map(|st| self.map.sid_of(st.vid)).collect()
    }

    /// Exact rerank, reusing DP-paid distances when the buffer is on.
    fn rerank(&mut self, candidates: HashSet<Sid>, q: &[f32], q_len: usize, k: usize) -> TopK {
        let dim = self.dataset.dim();
        let data = self.dataset.data();
        let dist = self.dist;

        let mut top = TopK::new(k);
        for sid in candidates {
            let b_off = self.dataset.seq_off(sid as usize);
            let b_len = self.dataset.seq_len(sid as usize);

            let d = if self.config.enable_buffer {
                let hits = self.visited_status.fill_matrix(q_len, b_off, b_len, |i, j| {
                    dist(
                        &q[i * dim..(i + 1) * dim],
                        &data[(b_off + j) * dim..(b_off + j + 1) * dim],
                    )
                });
                self.metric_buffer_hit += hits;
                self.metric_buffer_tot += (q_len * b_len) as u64;

                let stride = self.visited_status.vec_count();
                self.metric
                    .compute_from_matrix(&self.visited_status.buffer()[b_off..], stride, q_len, b_len)
            } else {
                self.metric
                    .compute(q, q_len, self.dataset.sequence(sid as usize), b_len, dim)
            };

            top.push(Neighbor { dist: d, sid });
        }
        top
    }

    /// Candidate generation followed by (optionally buffered) rerank.
    pub fn search(&mut self, q: &[f32], q_len: usize, k: usize, ef: usize) -> Vec<Neighbor> {
        let begin = Instant::now();
        let candidates = self.generate_candidates(q, q_len, ef);
        let mid = Instant::now();
        let top = self.rerank(candidates, q, q_len, k);
        let result = top.into_sorted_vec();

        self.metric_cand_gen_time += mid.duration_since(begin).as_micros() as u64;
        self.metric_rerank_time += mid.elapsed().as_micros() as u64;
        result
    }

    /// Accumulated counters.
    pub fn metrics(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("hops", self.graph_metrics.hops),
            ("dist_comps", self.graph_metrics.dist_comps),
            ("buffer_hit", self.metric_buffer_hit),
            ("buffer_tot", self.metric_buffer_tot),
            ("cand_gen_time", self.metric_cand_gen_time),
            ("rerank_time", self.metric_rerank_time),
        ]
    }

    /// Zero all counters.
    pub fn reset_metrics(&mut self) {
        self.graph_metrics.reset();
        self.metric_buffer_hit = 0;
        self.metric_buffer_tot = 0;
        self.metric_cand_gen_time = 0;
        self.metric_rerank_time = 0;
    }

    /// The underlying vector graph.
    pub fn graph(&self) -> &HnswGraph {
        &self.graph
    }
}
