//! SIMD-accelerated pointwise distance kernels.
//!
//! This module provides the two local costs used throughout the engine,
//! optimized with the `wide` crate for portable SIMD (AVX2, AVX-512, NEON):
//!
//! - **L2Sq**: squared Euclidean distance, sum((a[i] - b[i])^2). The square
//!   root is never taken; every consumer only compares or accumulates.
//! - **InnerProduct**: negated dot product, -sum(a[i] * b[i]). Negation
//!   casts similarity as distance so "smaller is better" holds uniformly.
//!
//! Both kernels return f32 and assume equal-length inputs; length checks
//! live at the API boundary, not in the hot loop.

use wide::f32x8;

/// Pointwise distance function signature shared by the graph and the
/// sequence metrics.
pub type DistFn = fn(&[f32], &[f32]) -> f32;

/// Pointwise distance metric over single vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VectorDistance {
    /// Squared L2 distance: sum((a[i] - b[i])^2). Lower is closer.
    L2Sq,
    /// Negated inner product: -sum(a[i] * b[i]). Lower is closer.
    InnerProduct,
}

impl VectorDistance {
    /// Resolve the SIMD kernel for this metric.
    pub fn dist_fn(self) -> DistFn {
        match self {
            VectorDistance::L2Sq => l2_sq_simd,
            VectorDistance::InnerProduct => neg_dot_simd,
        }
    }

    /// Compute the distance between two vectors.
    pub fn compute(self, a: &[f32], b: &[f32]) -> f32 {
        (self.dist_fn())(a, b)
    }
}

/// Compute dot product using SIMD.
///
/// Eight lanes per step via `f32x8`; the sub-lane tail is folded in
/// scalar.
pub fn dot_product_simd(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let mut lanes_a = a.chunks_exact(8);
    let mut lanes_b = b.chunks_exact(8);

    let mut acc = f32x8::ZERO;
    for (la, lb) in lanes_a.by_ref().zip(lanes_b.by_ref()) {
        acc += f32x8::from(la) * f32x8::from(lb);
    }

    let tail: f32 = lanes_a
        .remainder()
        .iter()
        .zip(lanes_b.remainder())
        .map(|(x, y)| x * y)
        .sum();

    acc.reduce_add() + tail
}

/// Negated dot product: -sum(a[i] * b[i]), so lower means more similar.
pub fn neg_dot_simd(a: &[f32], b: &[f32]) -> f32 {
    -dot_product_simd(a, b)
}

/// Compute squared L2 distance using SIMD.
///
/// Returns the squared distance; callers only ever rank or accumulate, so
/// the square root is omitted.
pub fn l2_sq_simd(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let mut lanes_a = a.chunks_exact(8);
    let mut lanes_b = b.chunks_exact(8);

    let mut acc = f32x8::ZERO;
    for (la, lb) in lanes_a.by_ref().zip(lanes_b.by_ref()) {
        let delta = f32x8::from(la) - f32x8::from(lb);
        acc += delta * delta;
    }

    let tail: f32 = lanes_a
        .remainder()
        .iter()
        .zip(lanes_b.remainder())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();

    acc.reduce_add() + tail
}

/// Scalar fallback implementations for comparison and testing.
pub mod scalar {
    /// Scalar dot product.
    pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    }

    /// Scalar negated dot product.
    pub fn neg_dot(a: &[f32], b: &[f32]) -> f32 {
        -dot_product(a, b)
    }

    /// Scalar squared L2 distance.
    pub fn l2_sq(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_near(actual: f32, expected: f32) {
        let tolerance = 1e-5 * expected.abs().max(1.0);
        assert!(
            (actual - expected).abs() <= tolerance,
            "got {}, want {} (tolerance {})",
            actual,
            expected,
            tolerance
        );
    }

    #[test]
    fn test_dot_product_mixed_signs() {
        let a = [2.0, -1.0, 0.5];
        let b = [4.0, 3.0, -2.0];

        // 8 - 3 - 1 = 4
        assert_eq!(scalar::dot_product(&a, &b), 4.0);
        expect_near(dot_product_simd(&a, &b), 4.0);
    }

    #[test]
    fn test_dot_product_exactly_one_lane() {
        // Length 8 exercises the SIMD path with an empty tail
        let a: Vec<f32> = (1..=8).map(|i| i as f32).collect();
        let b: Vec<f32> = (1..=8).map(|i| (9 - i) as f32).collect();

        // sum of i * (9 - i) for i in 1..=8
        expect_near(dot_product_simd(&a, &b), 120.0);
    }

    #[test]
    fn test_dot_product_lane_plus_tail() {
        // Length 13: one full lane and a 5-element tail
        let a: Vec<f32> = (0..13).map(|i| i as f32).collect();
        let b = vec![1.0f32; 13];

        // sum of 0..=12
        expect_near(dot_product_simd(&a, &b), 78.0);
    }

    #[test]
    fn test_dot_product_shorter_than_lane() {
        let a = [0.25, 0.75];
        let b = [8.0, 4.0];

        expect_near(dot_product_simd(&a, &b), 5.0);
    }

    #[test]
    fn test_neg_dot_sign() {
        let a = [1.0, 2.0];
        let b = [3.0, 4.0];

        // -(3 + 8) = -11; more aligned vectors score lower
        assert_eq!(neg_dot_simd(&a, &b), -11.0);
    }

    #[test]
    fn test_l2_sq_small() {
        let a = [2.0, 2.0];
        let b = [5.0, 6.0];

        // 9 + 16 = 25 (squared, no sqrt)
        assert_eq!(scalar::l2_sq(&a, &b), 25.0);
        expect_near(l2_sq_simd(&a, &b), 25.0);
    }

    #[test]
    fn test_l2_sq_self_is_zero() {
        let a: Vec<f32> = (0..9).map(|i| (i as f32).mul_add(0.75, -2.5)).collect();

        expect_near(l2_sq_simd(&a, &a), 0.0);
    }

    #[test]
    fn test_l2_sq_constant_offset() {
        // Two full lanes, every component differing by 2
        let a = vec![1.5f32; 16];
        let b = vec![3.5f32; 16];

        expect_near(l2_sq_simd(&a, &b), 64.0);
    }

    #[test]
    fn test_vector_distance_enum() {
        let a = [1.0, 0.0, 0.0];
        let b = [0.0, 1.0, 0.0];

        expect_near(VectorDistance::InnerProduct.compute(&a, &b), 0.0);
        expect_near(VectorDistance::L2Sq.compute(&a, &b), 2.0);
    }

    #[test]
    fn test_embedding_sized_inputs() {
        // Typical embedding widths; SIMD must agree with the scalar oracle
        for dim in [96, 256, 1000] {
            let a: Vec<f32> = (0..dim).map(|i| ((i * 29 + 5) % 23) as f32 * 0.1 - 1.0).collect();
            let b: Vec<f32> = (0..dim).map(|i| ((i * 13 + 7) % 19) as f32 * 0.2 - 1.8).collect();

            let dot = scalar::dot_product(&a, &b);
            assert!(
                (dot_product_simd(&a, &b) - dot).abs() < 1e-2,
                "dot diverged at dim {}",
                dim
            );

            let l2 = scalar::l2_sq(&a, &b);
            assert!((l2_sq_simd(&a, &b) - l2).abs() < 1e-2, "l2 diverged at dim {}", dim);
        }
    }

    // Property-based tests for kernel correctness
    use proptest::prelude::*;

    proptest! {

        // Property: SIMD and scalar implementations produce identical results
        #[test]
        fn prop_dot_product_simd_scalar_match(
            pairs in prop::collection::vec((-10.0f32..10.0, -10.0f32..10.0), 1..100)
        ) {
            let a: Vec<f32> = pairs.iter().map(|p| p.0).collect();
            let b: Vec<f32> = pairs.iter().map(|p| p.1).collect();

            let simd_result = dot_product_simd(&a, &b);
            let scalar_result = scalar::dot_product(&a, &b);

            prop_assert!(
                (simd_result - scalar_result).abs() < 1e-3,
                "SIMD: {}, Scalar: {}", simd_result, scalar_result
            );
        }

        #[test]
        fn prop_l2_sq_simd_scalar_match(
            pairs in prop::collection::vec((-10.0f32..10.0, -10.0f32..10.0), 1..100)
        ) {
            let a: Vec<f32> = pairs.iter().map(|p| p.0).collect();
            let b: Vec<f32> = pairs.iter().map(|p| p.1).collect();

            let simd_result = l2_sq_simd(&a, &b);
            let scalar_result = scalar::l2_sq(&a, &b);

            prop_assert!(
                (simd_result - scalar_result).abs() < 1e-2,
                "SIMD: {}, Scalar: {}", simd_result, scalar_result
            );
        }

        // Property: L2Sq is symmetric
        #[test]
        fn prop_l2_sq_symmetric(
            pairs in prop::collection::vec((-10.0f32..10.0, -10.0f32..10.0), 1..100)
        ) {
            let a: Vec<f32> = pairs.iter().map(|p| p.0).collect();
            let b: Vec<f32> = pairs.iter().map(|p| p.1).collect();

            let ab = l2_sq_simd(&a, &b);
            let ba = l2_sq_simd(&b, &a);

            prop_assert!((ab - ba).abs() < 1e-4, "l2(a,b) = {}, l2(b,a) = {}", ab, ba);
        }

        // Property: L2Sq is non-negative
        #[test]
        fn prop_l2_sq_non_negative(
            pairs in prop::collection::vec((-10.0f32..10.0, -10.0f32..10.0), 1..100)
        ) {
            let a: Vec<f32> = pairs.iter().map(|p| p.0).collect();
            let b: Vec<f32> = pairs.iter().map(|p| p.1).collect();

            let dist = l2_sq_simd(&a, &b);

            prop_assert!(dist >= 0.0, "squared L2 is negative: {}", dist);
        }
    }
}
