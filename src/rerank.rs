//! Exact rerank of candidate sequences and the bounded top-k heap.
//!
//! Candidate generation produces a set of sequence ids; this layer scores
//! each with the exact sequence metric and keeps the best k in a bounded
//! max-heap (the worst survivor sits on top and is evicted first).

use crate::dataset::SequenceDataset;
use crate::mapping::Sid;
use crate::metric::SimMetric;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A scored sequence.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    /// Exact sequence distance (lower is more similar).
    pub dist: f32,
    /// Sequence id.
    pub sid: Sid,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist && self.sid == other.sid
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap by distance, so the worst candidate surfaces first.
        // Ties break toward the higher sid so the lower sid survives.
        self.dist
            .partial_cmp(&other.dist)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.sid.cmp(&other.sid))
    }
}

/// Bounded max-heap keeping the k best (lowest-distance) sequences.
#[derive(Debug)]
pub struct TopK {
    heap: BinaryHeap<Neighbor>,
    k: usize,
}

impl TopK {
    /// Create a heap bounded at `k` entries.
    pub fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k + 1),
            k,
        }
    }

    /// Offer a scored sequence, evicting the current worst if full.
    pub fn push(&mut self, neighbor: Neighbor) {
        if self.k == 0 {
            return;
        }
        self.heap.push(neighbor);
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the heap is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drain into a vector sorted by ascending distance (best first).
    pub fn into_sorted_vec(self) -> Vec<Neighbor> {
        let mut out = self.heap.into_vec();
        out.sort_by(|a, b| {
            a.dist
                .partial_cmp(&b.dist)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.sid.cmp(&b.sid))
        });
        out
    }
}

/// Score every candidate with the exact metric and keep the best k.
pub fn rerank_exact(
    candidates: impl IntoIterator<Item = Sid>,
    dataset: &SequenceDataset,
    metric: SimMetric,
    q: &[f32],
    q_len: usize,
    k: usize,
) -> TopK {
    let dim = dataset.dim();
    let mut top = TopK::new(k);
    for sid in candidates {
        let b = dataset.sequence(sid as usize);
        let b_len = dataset.seq_len(sid as usize);
        let dist = metric.compute(q, q_len, b, b_len, dim);
        top.push(Neighbor { dist, sid });
    }
    top
}
