//! Sequence-level similarity metrics.
//!
//! A sequence is a flat `&[f32]` strip of `len * dim` values. All metrics
//! return f32 with "smaller is more similar":
//!
//! - **MaxSim**: sum over query rows of the minimum negated inner product
//!   against any base row.
//! - **Dtw**: dynamic time warping with squared-L2 local cost.
//! - **Sdtw**: subsequence DTW; the alignment may start and end anywhere
//!   in the base sequence.
//!
//! Each metric has a `*_from_matrix` twin that reads the local cost from a
//! precomputed pairwise-distance block instead of touching the vectors.
//! The rerank layer uses these to reuse distances already paid for during
//! candidate generation.

use crate::distance::{l2_sq_simd, neg_dot_simd, VectorDistance};
use crate::error::Error;
use std::str::FromStr;

/// Sequence similarity metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SimMetric {
    /// Sum of per-query-row best inner products (negated).
    MaxSim,
    /// Dynamic time warping with squared-L2 local cost.
    Dtw,
    /// Subsequence DTW: free start and free end in the base sequence.
    Sdtw,
}

impl SimMetric {
    /// The pointwise distance the proximity graph should be built with.
    pub fn vector_distance(self) -> VectorDistance {
        match self {
            SimMetric::MaxSim => VectorDistance::InnerProduct,
            SimMetric::Dtw | SimMetric::Sdtw => VectorDistance::L2Sq,
        }
    }

    /// Metric name as used in CLI arguments and groundtruth file names.
    pub fn name(self) -> &'static str {
        match self {
            SimMetric::MaxSim => "maxsim",
            SimMetric::Dtw => "dtw",
            SimMetric::Sdtw => "sdtw",
        }
    }

    /// Compute the exact sequence distance.
    pub fn compute(self, q: &[f32], q_len: usize, b: &[f32], b_len: usize, dim: usize) -> f32 {
        match self {
            SimMetric::MaxSim => maxsim(q, q_len, b, b_len, dim),
            SimMetric::Dtw => dtw(q, q_len, b, b_len, dim),
            SimMetric::Sdtw => sdtw(q, q_len, b, b_len, dim),
        }
    }

    /// Compute the sequence distance from a precomputed cost block.
    ///
    /// `matrix[i * stride + j]` must hold the local cost between query row
    /// `i` and base row `j`.
    pub fn compute_from_matrix(self, matrix: &[f32], stride: usize, q_len: usize, b_len: usize) -> f32 {
        match self {
            SimMetric::MaxSim => maxsim_from_matrix(matrix, stride, q_len, b_len),
            SimMetric::Dtw => dtw_from_matrix(matrix, stride, q_len, b_len),
            SimMetric::Sdtw => sdtw_from_matrix(matrix, stride, q_len, b_len),
        }
    }
}

impl FromStr for SimMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "maxsim" => Ok(SimMetric::MaxSim),
            "dtw" => Ok(SimMetric::Dtw),
            "sdtw" => Ok(SimMetric::Sdtw),
            other => Err(Error::UnknownMetric(other.to_string())),
        }
    }
}

#[inline]
fn row(seq: &[f32], i: usize, dim: usize) -> &[f32] {
    &seq[i * dim..(i + 1) * dim]
}

/// MAXSIM: for each query row, the best (lowest) negated inner product over
/// all base rows; summed. Invariant under reordering of the base rows.
pub fn maxsim(q: &[f32], q_len: usize, b: &[f32], b_len: usize, dim: usize) -> f32 {
    let mut sum = 0.0f32;
    for i in 0..q_len {
        let qi = row(q, i, dim);
        let mut sim = f32::INFINITY;
        for j in 0..b_len {
            sim = sim.min(neg_dot_simd(qi, row(b, j, dim)));
        }
        sum += sim;
    }
    sum
}

/// DTW with squared-L2 local cost, rolling two-row DP.
///
/// `D[i][j] = cost(i,j) + min(D[i-1][j], D[i][j-1], D[i-1][j-1])` with
/// `D[0][0] = 0` and infinite borders; returns `D[q_len][b_len]`.
pub fn dtw(q: &[f32], q_len: usize, b: &[f32], b_len: usize, dim: usize) -> f32 {
    let mut pre = vec![f32::INFINITY; b_len + 1];
    let mut cur = vec![f32::INFINITY; b_len + 1];
    pre[0] = 0.0;

    for i in 0..q_len {
        let qi = row(q, i, dim);
        cur[0] = f32::INFINITY;
        for j in 1..=b_len {
            let cost = l2_sq_simd(qi, row(b, j - 1, dim));
            cur[j] = cost + pre[j].min(cur[j - 1]).min(pre[j - 1]);
        }
        std::mem::swap(&mut pre, &mut cur);
    }
    pre[b_len]
}

/// Subsequence DTW: the first DP row is all zero (free start in the base)
/// and the result is the minimum over the last row (free end).
pub fn sdtw(q: &[f32], q_len: usize, b: &[f32], b_len: usize, dim: usize) -> f32 {
    let mut pre = vec![0.0f32; b_len + 1];
    let mut cur = vec![0.0f32; b_len + 1];

    for i in 0..q_len {
        let qi = row(q, i, dim);
        cur[0] = f32::INFINITY;
        for j in 1..=b_len {
            let cost = l2_sq_simd(qi, row(b, j - 1, dim));
            cur[j] = cost + pre[j].min(cur[j - 1]).min(pre[j - 1]);
        }
        std::mem::swap(&mut pre, &mut cur);
    }
    pre[1..]
        .iter()
        .fold(f32::INFINITY, |acc, &v| acc.min(v))
}

/// MAXSIM over a precomputed cost block.
pub fn maxsim_from_matrix(matrix: &[f32], stride: usize, q_len: usize, b_len: usize) -> f32 {
    let mut sum = 0.0f32;
    for i in 0..q_len {
        let costs = &matrix[i * stride..i * stride + b_len];
        let mut sim = f32::INFINITY;
        for &c in costs {
            sim = sim.min(c);
        }
        sum += sim;
    }
    sum
}

/// DTW over a precomputed cost block.
pub fn dtw_from_matrix(matrix: &[f32], stride: usize, q_len: usize, b_len: usize) -> f32 {
    let mut pre = vec![f32::INFINITY; b_len + 1];
    let mut cur = vec![f32::INFINITY; b_len + 1];
    pre[0] = 0.0;

    for i in 0..q_len {
        let costs = &matrix[i * stride..i * stride + b_len];
        cur[0] = f32::INFINITY;
        for j in 1..=b_len {
            cur[j] = costs[j - 1] + pre[j].min(cur[j - 1]).min(pre[j - 1]);
        }
        std::mem::swap(&mut pre, &mut cur);
    }
    pre[b_len]
}

/// Subsequence DTW over a precomputed cost block.
pub fn sdtw_from_matrix(matrix: &[f32], stride: usize, q_len: usize, b_len: usize) -> f32 {
    let mut pre = vec![0.0f32; b_len + 1];
    let mut cur = vec![0.0f32; b_len + 1];

    for i in 0..q_len {
        let costs = &matrix[i * stride..i * stride + b_len];
        cur[0] = f32::INFINITY;
        for j in 1..=b_len {
            cur[j] = costs[j - 1] + pre[j].min(cur[j - 1]).min(pre[j - 1]);
        }
        std::mem::swap(&mut pre, &mut cur);
    }
    pre[1..]
        .iter()
        .fold(f32::INFINITY, |acc, &v| acc.min(v))
}
