//! Uniform build/search surface over the index variants.
//!
//! The façade owns one variant and routes calls; every variant shares the
//! same contract: `build` once over a borrowed dataset, then read-only
//! `search` calls returning a bounded top-k, with best-effort metric
//! counters on the side.

use crate::brute_force::BruteForceIndex;
use crate::dataset::SequenceDataset;
use crate::error::{Error, Result};
use crate::hnsw::HnswParams;
use crate::metric::SimMetric;
use crate::rerank::Neighbor;
use crate::seq_graph::{SeqGraphConfig, SeqGraphIndex};
use crate::set_graph::SetGraphIndex;
use std::str::FromStr;

/// Index variant selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexVariant {
    /// Exact scan over every sequence.
    BruteForce,
    /// Per-query-vector kNN candidate generation.
    SetGraph,
    /// Joint DP candidate generation for warping metrics.
    SeqGraph(SeqGraphConfig),
}

impl FromStr for IndexVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "brute_force" => Ok(IndexVariant::BruteForce),
            "set" => Ok(IndexVariant::SetGraph),
            "seq" => Ok(IndexVariant::SeqGraph(
                SeqGraphConfig::default().with_unlink_same_seq(true),
            )),
            other => Err(Error::UnknownVariant(other.to_string())),
        }
    }
}

enum Variant<'a> {
    BruteForce(BruteForceIndex<'a>),
    Set(SetGraphIndex<'a>),
    Seq(SeqGraphIndex<'a>),
}

/// A built vector-sequence search index.
///
/// Borrows the dataset for its whole lifetime; the graph and mapping
/// tables are immutable after `build`, and all per-query scratch lives
/// inside the index, so `search` takes `&mut self`.
pub struct VssIndex<'a> {
    dim: usize,
    variant: Variant<'a>,
}

impl<'a> VssIndex<'a> {
    /// Build an index of the chosen variant over a dataset.
    pub fn build(
        dataset: &'a SequenceDataset,
        metric: SimMetric,
        variant: IndexVariant,
        params: HnswParams,
    ) -> Result<Self> {
        let variant = match variant {
            IndexVariant::BruteForce => Variant::BruteForce(BruteForceIndex::build(dataset, metric)),
            IndexVariant::SetGraph => Variant::Set(SetGraphIndex::build(dataset, metric, params)?),
            IndexVariant::SeqGraph(config) => Variant::Seq(SeqGraphIndex::build(dataset, metric, params, config)?),
        };
        Ok(Self {
            dim: dataset.dim(),
            variant,
        })
    }

    /// Top-k search with a flat query of `q.len() / dim` vectors.
    ///
    /// Returns at most `min(k, seq_count)` neighbors sorted by ascending
    /// distance. `ef` bounds the candidate-generation beam; the brute
    /// force variant ignores it.
    pub fn search(&mut self, q: &[f32], k: usize, ef: usize) -> Result<Vec<Neighbor>> {
        if q.is_empty() || q.len() % self.dim != 0 {
            return Err(Error::WrongDimension {
                expected: self.dim,
                got: q.len(),
            });
        }
        let q_len = q.len() / self.dim;

        Ok(match &mut self.variant {
            Variant::BruteForce(index) => index.search(q, q_len, k),
            Variant::Set(index) => index.search(q, q_len, k, ef),
            Variant::Seq(index) => index.search(q, q_len, k, ef),
        })
    }

    /// Accumulated metric counters as (name, value) pairs.
    pub fn metrics(&self) -> Vec<(&'static str, u64)> {
        match &self.variant {
            Variant::BruteForce(index) => index.metrics(),
            Variant::Set(index) => index.metrics(),
            Variant::Seq(index) => index.metrics(),
        }
    }

    /// Zero all metric counters.
    pub fn reset_metrics(&mut self) {
        match &mut self.variant {
            Variant::BruteForce(index) => index.reset_metrics(),
            Variant::Set(index) => index.reset_metrics(),
            Variant::Seq(index) => index.reset_metrics(),
        }
    }
}
