//! Exact baseline: score every base sequence with the full metric.

use crate::dataset::SequenceDataset;
use crate::metric::SimMetric;
use crate::rerank::{Neighbor, TopK};

/// Brute-force index. The candidate set is every sequence; useful as the
/// groundtruth generator and recall baseline for the graph variants.
pub struct BruteForceIndex<'a> {
    dataset: &'a SequenceDataset,
    metric: SimMetric,
    metric_dist_comps: u64,
}

impl<'a> BruteForceIndex<'a> {
    /// Build over a dataset. Nothing is precomputed.
    pub fn build(dataset: &'a SequenceDataset, metric: SimMetric) -> Self {
        Self {
            dataset,
            metric,
            metric_dist_comps: 0,
        }
    }

    /// Exact top-k search; `ef` is ignored.
    pub fn search(&mut self, q: &[f32], q_len: usize, k: usize) -> Vec<Neighbor> {
        let dim = self.dataset.dim();
        let mut top = TopK::new(k);
        for sid in 0..self.dataset.seq_count() {
            let b_len = self.dataset.seq_len(sid);
            self.metric_dist_comps += (q_len * b_len) as u64;

            let dist = self.metric.compute(q, q_len, self.dataset.sequence(sid), b_len, dim);
            top.push(Neighbor {
                dist,
                sid: sid as u32,
            });
        }
        top.into_sorted_vec()
    }

    /// Accumulated counters.
    pub fn metrics(&self) -> Vec<(&'static str, u64)> {
        vec![("dist_comps", self.metric_dist_comps)]
    }

    /// Zero all counters.
    pub fn reset_metrics(&mut self) {
        self.metric_dist_comps = 0;
    }
}
